use crate::model::election::{Candidate, CandidateId, CandidateResult, ElectionStatus};
use crate::util::percentage;

/// Orders candidates by votes (descending) and assigns positions 1..N.
///
/// Equal vote counts keep the input order: the sort is stable and no other
/// tie-break is applied. Rank is then reset to 0 for candidates without
/// votes, and for everyone when the election status does not publish
/// rankings. Percentages are taken over `expressed`, the expressed votes at
/// the level being ranked.
pub fn rank_candidates(
    status: ElectionStatus,
    candidates: &[Candidate],
    votes: &[(CandidateId, u64)],
    expressed: u64,
) -> Vec<CandidateResult> {
    let mut results: Vec<CandidateResult> = candidates
        .iter()
        .map(|candidate| {
            let candidate_votes = votes
                .iter()
                .find(|(id, _)| *id == candidate.id)
                .map(|(_, v)| *v)
                .unwrap_or(0);
            CandidateResult {
                candidate: candidate.clone(),
                votes: candidate_votes,
                percentage: percentage(candidate_votes, expressed),
                rank: 0,
            }
        })
        .collect();

    results.sort_by(|a, b| b.votes.cmp(&a.votes));

    let publish = status.publishes_ranking();
    for (position, result) in results.iter_mut().enumerate() {
        result.rank = if publish && result.votes > 0 {
            position as u32 + 1
        } else {
            0
        };
    }

    results
}

/// The leading candidate, if the ranking was published.
pub fn winner(results: &[CandidateResult]) -> Option<&CandidateResult> {
    results.iter().find(|r| r.rank == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::rollup::tests::{candidate, two_center_rollup};

    fn field() -> Vec<Candidate> {
        vec![
            candidate(1, "A"),
            candidate(2, "B"),
            candidate(3, "C"),
            candidate(4, "D"),
        ]
    }

    fn ranks(results: &[CandidateResult]) -> Vec<(CandidateId, u32)> {
        results.iter().map(|r| (r.candidate.id, r.rank)).collect()
    }

    #[test]
    fn finished_election_ranks_with_stable_ties() {
        let votes = vec![(1, 500), (2, 300), (3, 300), (4, 0)];
        let results = rank_candidates(ElectionStatus::Finished, &field(), &votes, 1100);

        assert_eq!(ranks(&results), vec![(1, 1), (2, 2), (3, 3), (4, 0)]);
        assert_eq!(winner(&results).map(|r| r.candidate.id), Some(1));
    }

    #[test]
    fn ties_keep_original_candidate_order() {
        let votes = vec![(1, 10), (2, 300), (3, 300), (4, 300)];
        let results = rank_candidates(ElectionStatus::Ongoing, &field(), &votes, 910);
        assert_eq!(ranks(&results), vec![(2, 1), (3, 2), (4, 3), (1, 4)]);
    }

    #[test]
    fn ranks_within_each_center() {
        let rollup = two_center_rollup();
        let center_a = &rollup.centers[0];
        let center_b = &rollup.centers[1];

        // Bob wins nowhere, but is only 10 votes short in center A
        let a = rank_candidates(
            ElectionStatus::Finished,
            &rollup.candidates,
            &center_a.candidate_votes,
            center_a.totals.expressed,
        );
        assert_eq!(ranks(&a), vec![(1, 1), (2, 2)]);
        assert!((a[0].percentage - 90.0 * 100.0 / 170.0).abs() < 1e-9);
        assert!((a[1].percentage - 80.0 * 100.0 / 170.0).abs() < 1e-9);

        let b = rank_candidates(
            ElectionStatus::Finished,
            &rollup.candidates,
            &center_b.candidate_votes,
            center_b.totals.expressed,
        );
        assert_eq!(ranks(&b), vec![(1, 1), (2, 2)]);
        assert_eq!(b.iter().map(|r| r.votes).collect::<Vec<_>>(), vec![100, 50]);
        assert!((b[1].percentage - 50.0 * 100.0 / 150.0).abs() < 1e-9);
    }

    #[test]
    fn upcoming_and_cancelled_elections_are_unranked() {
        let votes = vec![(1, 500), (2, 300), (3, 300), (4, 0)];
        for status in [ElectionStatus::Upcoming, ElectionStatus::Cancelled] {
            let results = rank_candidates(status, &field(), &votes, 1100);
            assert!(results.iter().all(|r| r.rank == 0));
            assert!(winner(&results).is_none());
            // still ordered by votes
            assert_eq!(results[0].candidate.id, 1);
        }
    }

    #[test]
    fn zero_vote_candidate_gets_no_rank_and_no_share() {
        let votes = vec![(1, 600), (2, 400)];
        let results = rank_candidates(ElectionStatus::Finished, &field(), &votes, 1000);

        let zero: Vec<_> = results.iter().filter(|r| r.votes == 0).collect();
        assert_eq!(zero.len(), 2);
        assert!(zero.iter().all(|r| r.rank == 0 && r.percentage == 0.0));
        assert_eq!(results[0].percentage, 60.0);
        assert_eq!(results[1].percentage, 40.0);
    }

    #[test]
    fn percentages_clamped_and_safe_without_expressed_votes() {
        let votes = vec![(1, 50), (2, 30)];
        let results = rank_candidates(ElectionStatus::Finished, &field(), &votes, 0);
        assert!(results.iter().all(|r| r.percentage == 0.0));

        let results = rank_candidates(ElectionStatus::Finished, &field(), &votes, 40);
        assert_eq!(results[0].percentage, 100.0);
        assert_eq!(results[1].percentage, 75.0);
    }
}
