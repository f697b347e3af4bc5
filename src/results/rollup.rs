//! Bureau → center → election rollup.
//!
//! Every total is summed once from bureau-level facts; center and election
//! figures are never derived from one another.
use crate::model::election::{
    BureauCandidateResult, BureauId, BureauSummary, Candidate, CandidateBureauSummary,
    CandidateCenterSummary, CandidateId, CenterId, CenterSummary, ElectionId, Totals,
    VotingBureau, VotingCenter,
};
use crate::results::participation::{candidate_participation_pct, candidate_pct};
use crate::util::percentage;
use log::{debug, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Rollup {
    pub election_id: ElectionId,
    /// Ballot order; every per-candidate vector below follows it.
    pub candidates: Vec<Candidate>,
    /// Every bureau, including those whose center is missing or unknown.
    pub bureaux: Vec<BureauSummary>,
    /// Known centers only.
    pub centers: Vec<CenterSummary>,
    /// Across all bureaux.
    pub totals: Totals,
    pub candidate_totals: Vec<(CandidateId, u64)>,
}

impl Rollup {
    pub fn candidate_total(&self, candidate_id: CandidateId) -> u64 {
        votes_for(&self.candidate_totals, candidate_id)
    }

    pub fn is_empty(&self) -> bool {
        self.bureaux.is_empty()
    }

    pub fn bureaux_of(&self, center_id: CenterId) -> impl Iterator<Item = &BureauSummary> {
        self.bureaux
            .iter()
            .filter(move |b| b.center_id == Some(center_id))
    }
}

pub fn votes_for(votes: &[(CandidateId, u64)], candidate_id: CandidateId) -> u64 {
    votes
        .iter()
        .find(|(id, _)| *id == candidate_id)
        .map(|(_, v)| *v)
        .unwrap_or(0)
}

fn add_votes(into: &mut [u64], from: &[u64]) {
    for (total, votes) in into.iter_mut().zip(from) {
        *total += votes;
    }
}

fn labelled(candidates: &[Candidate], votes: &[u64]) -> Vec<(CandidateId, u64)> {
    candidates
        .iter()
        .zip(votes)
        .map(|(c, v)| (c.id, *v))
        .collect()
}

pub fn rollup(
    election_id: ElectionId,
    centers: &[VotingCenter],
    bureaux: &[VotingBureau],
    candidates: &[Candidate],
    results: &[BureauCandidateResult],
) -> Rollup {
    let candidate_index: HashMap<CandidateId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.id, idx))
        .collect();
    let center_names: HashMap<CenterId, &str> =
        centers.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut units: Vec<VotingBureau> = bureaux.to_vec();
    let mut unit_index: HashMap<BureauId, usize> = units
        .iter()
        .enumerate()
        .map(|(idx, b)| (b.id, idx))
        .collect();
    let mut unit_votes: Vec<Vec<u64>> = vec![vec![0; candidates.len()]; units.len()];

    for result in results {
        let Some(&candidate_idx) = candidate_index.get(&result.candidate_id) else {
            warn!(
                "Ignoring {} votes for unknown candidate {} in bureau {}",
                result.votes, result.candidate_id, result.bureau_id
            );
            continue;
        };

        // Results for a bureau missing from the bureau list still count.
        let unit_idx = *unit_index.entry(result.bureau_id).or_insert_with(|| {
            units.push(VotingBureau {
                id: result.bureau_id,
                name: result.bureau_name.clone(),
                center_id: result.center_id,
                registered_voters: 0,
                voters_who_voted: 0,
                expressed_votes: 0,
            });
            unit_votes.push(vec![0; candidates.len()]);
            units.len() - 1
        });
        unit_votes[unit_idx][candidate_idx] += result.votes;
    }

    let bureau_summaries: Vec<BureauSummary> = units
        .iter()
        .zip(&unit_votes)
        .map(|(bureau, votes)| {
            let mut totals = Totals::default();
            totals.add_bureau(bureau);
            BureauSummary {
                bureau_id: bureau.id,
                bureau_name: bureau.name.clone(),
                center_id: bureau.center_id,
                center_name: bureau
                    .center_id
                    .and_then(|id| center_names.get(&id))
                    .map(|name| name.to_string()),
                totals,
                participation_pct: percentage(totals.voters, totals.registered),
                candidate_votes: labelled(candidates, votes),
            }
        })
        .collect();

    let center_summaries: Vec<CenterSummary> = centers
        .iter()
        .map(|center| {
            let mut totals = Totals::default();
            let mut votes = vec![0; candidates.len()];
            let mut bureau_count = 0;
            let mut reporting_bureaux = 0;

            for (bureau, bureau_votes) in units.iter().zip(&unit_votes) {
                if bureau.center_id != Some(center.id) {
                    continue;
                }
                totals.add_bureau(bureau);
                add_votes(&mut votes, bureau_votes);
                bureau_count += 1;
                if bureau.has_reported() {
                    reporting_bureaux += 1;
                }
            }

            CenterSummary {
                center_id: center.id,
                center_name: center.name.clone(),
                totals,
                participation_pct: percentage(totals.voters, totals.registered),
                bureau_count,
                reporting_bureaux,
                candidate_votes: labelled(candidates, &votes),
            }
        })
        .collect();

    let mut totals = Totals::default();
    let mut votes = vec![0; candidates.len()];
    for (bureau, bureau_votes) in units.iter().zip(&unit_votes) {
        totals.add_bureau(bureau);
        add_votes(&mut votes, bureau_votes);
    }

    let orphans = units
        .iter()
        .filter(|b| b.center_id.map_or(true, |id| !center_names.contains_key(&id)))
        .count();
    if orphans > 0 {
        debug!(
            "election {}: {} bureaux without a known center kept out of center rollup",
            election_id, orphans
        );
    }

    Rollup {
        election_id,
        candidates: candidates.to_vec(),
        bureaux: bureau_summaries,
        centers: center_summaries,
        totals,
        candidate_totals: labelled(candidates, &votes),
    }
}

/// Center figures scoped to one candidate.
pub fn candidate_center_summaries(
    rollup: &Rollup,
    candidate_id: CandidateId,
) -> Vec<CandidateCenterSummary> {
    rollup
        .centers
        .iter()
        .map(|center| {
            let votes = votes_for(&center.candidate_votes, candidate_id);
            CandidateCenterSummary {
                center: center.clone(),
                votes,
                candidate_pct: candidate_pct(votes, &center.totals),
                candidate_participation_pct: candidate_participation_pct(votes, &center.totals),
            }
        })
        .collect()
}

/// Bureau figures scoped to one candidate.
pub fn candidate_bureau_summaries(
    rollup: &Rollup,
    candidate_id: CandidateId,
) -> Vec<CandidateBureauSummary> {
    rollup
        .bureaux
        .iter()
        .map(|bureau| {
            let votes = votes_for(&bureau.candidate_votes, candidate_id);
            CandidateBureauSummary {
                bureau: bureau.clone(),
                votes,
                candidate_pct: candidate_pct(votes, &bureau.totals),
                candidate_participation_pct: candidate_participation_pct(votes, &bureau.totals),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn center(id: CenterId, name: &str) -> VotingCenter {
        VotingCenter {
            id,
            name: name.to_string(),
        }
    }

    pub fn bureau(
        id: BureauId,
        name: &str,
        center_id: Option<CenterId>,
        registered: u64,
        voters: u64,
        expressed: u64,
    ) -> VotingBureau {
        VotingBureau {
            id,
            name: name.to_string(),
            center_id,
            registered_voters: registered,
            voters_who_voted: voters,
            expressed_votes: expressed,
        }
    }

    pub fn candidate(id: CandidateId, name: &str) -> Candidate {
        Candidate {
            id,
            name: name.to_string(),
            party: None,
        }
    }

    pub fn result(bureau_id: BureauId, candidate_id: CandidateId, votes: u64) -> BureauCandidateResult {
        BureauCandidateResult {
            bureau_id,
            bureau_name: format!("Bureau {}", bureau_id),
            center_id: None,
            center_name: None,
            candidate_id,
            votes,
        }
    }

    /// Two centers: A with bureaux registered [100, 150], B with [200].
    pub fn two_center_rollup() -> Rollup {
        let centers = vec![center(1, "Center A"), center(2, "Center B")];
        let bureaux = vec![
            bureau(11, "Bureau 1", Some(1), 100, 85, 80),
            bureau(12, "Bureau 2", Some(1), 150, 95, 90),
            bureau(21, "Bureau 1", Some(2), 200, 160, 150),
        ];
        let candidates = vec![candidate(1, "Alice"), candidate(2, "Bob")];
        let results = vec![
            result(11, 1, 50),
            result(11, 2, 30),
            result(12, 1, 40),
            result(12, 2, 50),
            result(21, 1, 100),
            result(21, 2, 50),
        ];
        rollup(7, &centers, &bureaux, &candidates, &results)
    }

    #[test]
    fn two_center_scenario_totals() {
        let rollup = two_center_rollup();

        assert_eq!(rollup.totals.registered, 450);
        assert_eq!(rollup.totals.expressed, 320);
        assert_eq!(rollup.totals.voters, 340);

        let a = &rollup.centers[0];
        assert_eq!(a.totals.registered, 250);
        assert_eq!(a.totals.expressed, 170);
        assert_eq!(a.bureau_count, 2);
        assert_eq!(rollup.centers[1].totals.registered, 200);
    }

    #[test]
    fn rollup_conserves_sums_across_levels() {
        let rollup = two_center_rollup();

        for center in &rollup.centers {
            let registered: u64 = rollup
                .bureaux_of(center.center_id)
                .map(|b| b.totals.registered)
                .sum();
            assert_eq!(registered, center.totals.registered);
        }
        let across_centers: u64 = rollup.centers.iter().map(|c| c.totals.registered).sum();
        assert_eq!(across_centers, rollup.totals.registered);

        for candidate in &rollup.candidates {
            let by_bureau: u64 = rollup
                .bureaux
                .iter()
                .map(|b| votes_for(&b.candidate_votes, candidate.id))
                .sum();
            let by_center: u64 = rollup
                .centers
                .iter()
                .map(|c| votes_for(&c.candidate_votes, candidate.id))
                .sum();
            assert_eq!(by_bureau, rollup.candidate_total(candidate.id));
            assert_eq!(by_center, rollup.candidate_total(candidate.id));
        }
        assert_eq!(rollup.candidate_total(1), 190);
        assert_eq!(rollup.candidate_total(2), 130);
    }

    #[test]
    fn orphan_bureau_kept_in_flat_list_only() {
        let centers = vec![center(1, "Center A")];
        let bureaux = vec![
            bureau(11, "Bureau 1", Some(1), 100, 50, 50),
            bureau(12, "Bureau 2", Some(99), 80, 40, 40),
            bureau(13, "Bureau 3", None, 60, 30, 30),
        ];
        let candidates = vec![candidate(1, "Alice")];
        let results = vec![result(11, 1, 50), result(12, 1, 40), result(13, 1, 30)];
        let rollup = rollup(1, &centers, &bureaux, &candidates, &results);

        assert_eq!(rollup.bureaux.len(), 3);
        assert_eq!(rollup.centers.len(), 1);
        assert_eq!(rollup.centers[0].totals.registered, 100);
        assert_eq!(rollup.bureaux[1].center_name, None);
        // Election-level candidate votes do not depend on center membership.
        assert_eq!(rollup.candidate_total(1), 120);
    }

    #[test]
    fn results_for_unlisted_bureau_are_not_dropped() {
        let candidates = vec![candidate(1, "Alice")];
        let rollup = rollup(1, &[], &[], &candidates, &[result(5, 1, 12)]);

        assert_eq!(rollup.bureaux.len(), 1);
        assert_eq!(rollup.bureaux[0].bureau_name, "Bureau 5");
        assert_eq!(rollup.candidate_total(1), 12);
    }

    #[test]
    fn empty_input_gives_zero_totals() {
        let rollup = rollup(1, &[], &[], &[], &[]);
        assert!(rollup.is_empty());
        assert_eq!(rollup.totals, Totals::default());
        assert!(rollup.candidate_totals.is_empty());
    }

    #[test]
    fn unknown_candidate_votes_ignored() {
        let candidates = vec![candidate(1, "Alice")];
        let bureaux = vec![bureau(11, "Bureau 1", None, 10, 10, 10)];
        let rollup = rollup(1, &[], &bureaux, &candidates, &[result(11, 42, 10)]);
        assert_eq!(rollup.candidate_total(1), 0);
        assert_eq!(rollup.candidate_totals.len(), 1);
    }

    #[test]
    fn candidate_scoped_center_figures() {
        let rollup = two_center_rollup();
        let centers = candidate_center_summaries(&rollup, 1);

        assert_eq!(centers[0].votes, 90);
        assert!((centers[0].candidate_pct - 90.0 * 100.0 / 170.0).abs() < 1e-9);
        assert!((centers[0].candidate_participation_pct - 36.0).abs() < 1e-9);

        let bureaux = candidate_bureau_summaries(&rollup, 2);
        assert_eq!(bureaux.iter().map(|b| b.votes).sum::<u64>(), 130);
        assert!(bureaux
            .iter()
            .all(|b| (0.0..=100.0).contains(&b.candidate_pct)));
    }
}
