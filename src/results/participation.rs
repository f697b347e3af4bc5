//! Turnout and coverage percentages. All results are clamped to [0, 100]
//! and a zero denominator gives 0.
use crate::model::election::{BureauSummary, Election, Totals};
use crate::util::percentage;
use serde::Serialize;

/// Which registered-voter figure the participation rate was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegisteredSource {
    /// Count stored on the election itself.
    Election,
    /// Sum of bureau registered voters.
    Bureaux,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Participation {
    pub registered: u64,
    pub voters: u64,
    pub pct: f64,
    pub source: RegisteredSource,
}

/// Election turnout, preferring the election's own registered count when it
/// is known and positive.
pub fn election_participation(election: &Election, totals: &Totals) -> Participation {
    let (registered, source) = match election.registered_voters {
        Some(registered) if registered > 0 => (registered, RegisteredSource::Election),
        _ => (totals.registered, RegisteredSource::Bureaux),
    };

    Participation {
        registered,
        voters: totals.voters,
        pct: percentage(totals.voters, registered),
        source,
    }
}

pub fn candidate_pct(votes: u64, totals: &Totals) -> f64 {
    percentage(votes, totals.expressed)
}

pub fn candidate_participation_pct(votes: u64, totals: &Totals) -> f64 {
    percentage(votes, totals.registered)
}

/// Bureaux showing any sign of entered data.
pub fn reporting_bureaux<'a, I>(bureaux: I) -> u64
where
    I: IntoIterator<Item = &'a BureauSummary>,
{
    bureaux.into_iter().filter(|b| b.has_reported()).count() as u64
}

pub fn coverage_pct(reporting: u64, expected: u64) -> f64 {
    percentage(reporting, expected)
}
