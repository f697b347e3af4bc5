use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

pub type ElectionId = i64;
pub type CenterId = i64;
pub type BureauId = i64;
pub type CandidateId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStatus {
    Upcoming,
    Ongoing,
    Finished,
    Cancelled,
}

impl ElectionStatus {
    /// Ranks are only published once voting has started.
    pub fn publishes_ranking(&self) -> bool {
        matches!(self, ElectionStatus::Ongoing | ElectionStatus::Finished)
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionStatus::Upcoming => write!(f, "upcoming"),
            ElectionStatus::Ongoing => write!(f, "ongoing"),
            ElectionStatus::Finished => write!(f, "finished"),
            ElectionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: ElectionStatus,
    pub registered_voters: Option<u64>,
    pub expected_bureaux: Option<u64>,
    /// Free-form attributes carried over from older election records.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingCenter {
    pub id: CenterId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingBureau {
    pub id: BureauId,
    pub name: String,
    pub center_id: Option<CenterId>,
    pub registered_voters: u64,
    pub voters_who_voted: u64,
    pub expressed_votes: u64,
}

impl VotingBureau {
    /// Any non-zero count means results were entered for this bureau.
    pub fn has_reported(&self) -> bool {
        self.registered_voters > 0 || self.voters_who_voted > 0 || self.expressed_votes > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: Option<String>,
}

impl Candidate {
    pub fn is_independent(&self) -> bool {
        self.party.as_deref().map_or(true, |p| p.trim().is_empty())
    }
}

/// Votes obtained by one candidate in one bureau.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauCandidateResult {
    pub bureau_id: BureauId,
    pub bureau_name: String,
    pub center_id: Option<CenterId>,
    pub center_name: Option<String>,
    pub candidate_id: CandidateId,
    pub votes: u64,
}

/// Counts summed over a set of bureaux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(rename = "totalRegistered")]
    pub registered: u64,
    #[serde(rename = "totalVoters")]
    pub voters: u64,
    #[serde(rename = "totalExpressed")]
    pub expressed: u64,
}

impl Totals {
    pub fn add_bureau(&mut self, bureau: &VotingBureau) {
        self.registered += bureau.registered_voters;
        self.voters += bureau.voters_who_voted;
        self.expressed += bureau.expressed_votes;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauSummary {
    #[serde(rename = "bureauId")]
    pub bureau_id: BureauId,
    #[serde(rename = "bureauName")]
    pub bureau_name: String,
    #[serde(rename = "centerId")]
    pub center_id: Option<CenterId>,
    #[serde(rename = "centerName")]
    pub center_name: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(rename = "participationPct")]
    pub participation_pct: f64,
    /// Votes per candidate, in election candidate order.
    #[serde(rename = "votesByCandidate")]
    pub candidate_votes: Vec<(CandidateId, u64)>,
}

impl BureauSummary {
    /// Any entered figure, including votes for a bureau only known from
    /// result rows.
    pub fn has_reported(&self) -> bool {
        self.totals.registered > 0
            || self.totals.voters > 0
            || self.totals.expressed > 0
            || self.candidate_votes.iter().any(|(_, votes)| *votes > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterSummary {
    #[serde(rename = "centerId")]
    pub center_id: CenterId,
    #[serde(rename = "centerName")]
    pub center_name: String,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(rename = "participationPct")]
    pub participation_pct: f64,
    #[serde(rename = "bureauCount")]
    pub bureau_count: usize,
    #[serde(rename = "reportingBureaux")]
    pub reporting_bureaux: usize,
    #[serde(rename = "votesByCandidate")]
    pub candidate_votes: Vec<(CandidateId, u64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub votes: u64,
    pub percentage: f64,
    /// 0 means unranked.
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionSummary {
    #[serde(rename = "electionId")]
    pub election_id: ElectionId,
    pub status: ElectionStatus,
    #[serde(flatten)]
    pub totals: Totals,
    /// Denominator actually used for participation.
    #[serde(rename = "participationRegistered")]
    pub participation_registered: u64,
    #[serde(rename = "participationPct")]
    pub participation_pct: f64,
    pub candidates: Vec<CandidateResult>,
}

/// Per-center figures scoped to a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCenterSummary {
    #[serde(flatten)]
    pub center: CenterSummary,
    #[serde(rename = "candidateVotes")]
    pub votes: u64,
    #[serde(rename = "candidatePct")]
    pub candidate_pct: f64,
    #[serde(rename = "candidateParticipationPct")]
    pub candidate_participation_pct: f64,
}

/// Per-bureau figures scoped to a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateBureauSummary {
    #[serde(flatten)]
    pub bureau: BureauSummary,
    #[serde(rename = "candidateVotes")]
    pub votes: u64,
    #[serde(rename = "candidatePct")]
    pub candidate_pct: f64,
    #[serde(rename = "candidateParticipationPct")]
    pub candidate_participation_pct: f64,
}

/// Where the expected bureau count came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum CoverageSource {
    /// Explicit count stored on the election under the given field name.
    ElectionField(String),
    /// Bureaux carrying the election id directly.
    DirectForeignKey,
    /// Bureaux reached through the election's linked centers.
    CenterLinks,
    /// Typical count for elections whose title matched the keyword.
    TitleKeyword(String),
    /// Scaled from the highest bureau number seen in reported data.
    BureauNumberScan,
}

impl CoverageSource {
    pub fn is_authoritative(&self) -> bool {
        matches!(
            self,
            CoverageSource::ElectionField(_)
                | CoverageSource::DirectForeignKey
                | CoverageSource::CenterLinks
        )
    }
}

impl Display for CoverageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverageSource::ElectionField(field) => write!(f, "election field `{}`", field),
            CoverageSource::DirectForeignKey => write!(f, "bureaux linked to election"),
            CoverageSource::CenterLinks => write!(f, "bureaux linked through centers"),
            CoverageSource::TitleKeyword(keyword) => write!(f, "title keyword `{}`", keyword),
            CoverageSource::BureauNumberScan => write!(f, "highest bureau number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageEstimate {
    #[serde(rename = "electionId")]
    pub election_id: ElectionId,
    #[serde(rename = "expectedBureaux")]
    pub expected_bureaux: u64,
    #[serde(rename = "reportingBureaux")]
    pub reporting_bureaux: u64,
    #[serde(rename = "coveragePct")]
    pub coverage_pct: f64,
    #[serde(rename = "isEstimated")]
    pub is_estimated: bool,
    pub source: CoverageSource,
}
