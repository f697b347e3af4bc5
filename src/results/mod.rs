use crate::config::EngineConfig;
use crate::database::{DatabaseError, ResultsDatabase};
use crate::model::election::{
    BureauCandidateResult, BureauSummary, Candidate, CandidateBureauSummary,
    CandidateCenterSummary, CandidateId, CandidateResult, CenterSummary, CoverageEstimate,
    Election, ElectionId, ElectionSummary, VotingBureau, VotingCenter,
};
use crate::normalizers::{
    complete_candidates, normalize_bureaux, normalize_candidates, normalize_centers,
    normalize_election, normalize_results, NameLookup,
};
use log::debug;
use serde::Serialize;

pub mod coverage;
pub mod participation;
pub mod ranking;
pub mod rollup;
pub mod tracker;
pub mod views;

use participation::{election_participation, Participation};
use rollup::{candidate_bureau_summaries, candidate_center_summaries, Rollup};
use views::{build_table, ResultsTable, ViewRequest, ViewScope};

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type ResultsResult<T> = std::result::Result<T, ResultsError>;

/// Either computed results, or nothing to show (unknown election or
/// candidate). Store failures are errors, not `NoResults`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsOutcome<T> {
    Ready(T),
    NoResults,
}

impl<T> ResultsOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            ResultsOutcome::Ready(value) => Some(value),
            ResultsOutcome::NoResults => None,
        }
    }
}

/// Normalized inputs for one election, as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectionSnapshot {
    pub election: Election,
    pub centers: Vec<VotingCenter>,
    pub bureaux: Vec<VotingBureau>,
    pub candidates: Vec<Candidate>,
    pub results: Vec<BureauCandidateResult>,
}

impl ElectionSnapshot {
    pub fn rollup(&self) -> Rollup {
        rollup::rollup(
            self.election.id,
            &self.centers,
            &self.bureaux,
            &self.candidates,
            &self.results,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionReport {
    pub election: Election,
    pub summary: ElectionSummary,
    pub participation: Participation,
    pub centers: Vec<CenterSummary>,
    pub bureaux: Vec<BureauSummary>,
    pub coverage: CoverageEstimate,
    pub table: ResultsTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    pub election: Election,
    pub result: CandidateResult,
    pub centers: Vec<CandidateCenterSummary>,
    pub bureaux: Vec<CandidateBureauSummary>,
    pub table: ResultsTable,
}

/// Election-level summary from a rollup. Pure: the same rollup always gives
/// the same summary.
pub fn summarize(election: &Election, rollup: &Rollup) -> (ElectionSummary, Participation) {
    let participation = election_participation(election, &rollup.totals);
    let candidates = ranking::rank_candidates(
        election.status,
        &rollup.candidates,
        &rollup.candidate_totals,
        rollup.totals.expressed,
    );

    let summary = ElectionSummary {
        election_id: election.id,
        status: election.status,
        totals: rollup.totals,
        participation_registered: participation.registered,
        participation_pct: participation.pct,
        candidates,
    };
    (summary, participation)
}

/// Reads and normalizes everything the engine needs for one election.
pub async fn load_snapshot(
    db: &ResultsDatabase,
    election_id: ElectionId,
) -> Result<Option<ElectionSnapshot>, DatabaseError> {
    let Some(raw_election) = db.fetch_election_row(election_id).await? else {
        debug!("election {} not found", election_id);
        return Ok(None);
    };
    let election = normalize_election(&raw_election);

    let centers = normalize_centers(&db.fetch_center_rows(election_id).await?);
    let bureaux = normalize_bureaux(&db.fetch_bureau_rows(election_id).await?);
    let lookup = NameLookup::new(&centers, &bureaux);
    let results = normalize_results(&db.fetch_result_rows(election_id).await?, &lookup);
    let candidates = complete_candidates(
        normalize_candidates(&db.fetch_candidate_rows(election_id).await?),
        &results,
    );

    debug!(
        "election {}: {} centers, {} bureaux, {} candidates, {} result rows",
        election_id,
        centers.len(),
        bureaux.len(),
        candidates.len(),
        results.len()
    );

    Ok(Some(ElectionSnapshot {
        election,
        centers,
        bureaux,
        candidates,
        results,
    }))
}

pub struct ResultsService {
    db: ResultsDatabase,
    config: EngineConfig,
}

impl ResultsService {
    pub fn new(db: ResultsDatabase, config: EngineConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn fetch_election_by_id(&self, election_id: ElectionId) -> ResultsResult<Option<Election>> {
        let row = self.db.fetch_election_row(election_id).await?;
        Ok(row.as_ref().map(normalize_election))
    }

    pub async fn load(&self, election_id: ElectionId) -> ResultsResult<Option<ElectionSnapshot>> {
        Ok(load_snapshot(&self.db, election_id).await?)
    }

    async fn load_rollup(&self, election_id: ElectionId) -> ResultsResult<Option<(ElectionSnapshot, Rollup)>> {
        Ok(self.load(election_id).await?.map(|snapshot| {
            let rollup = snapshot.rollup();
            (snapshot, rollup)
        }))
    }

    pub async fn fetch_center_summary(&self, election_id: ElectionId) -> ResultsResult<Vec<CenterSummary>> {
        Ok(self
            .load_rollup(election_id)
            .await?
            .map(|(_, rollup)| rollup.centers)
            .unwrap_or_default())
    }

    pub async fn fetch_bureau_summary(&self, election_id: ElectionId) -> ResultsResult<Vec<BureauSummary>> {
        Ok(self
            .load_rollup(election_id)
            .await?
            .map(|(_, rollup)| rollup.bureaux)
            .unwrap_or_default())
    }

    /// Ranked election-wide candidate totals.
    pub async fn fetch_election_summary(&self, election_id: ElectionId) -> ResultsResult<Vec<CandidateResult>> {
        Ok(self
            .load_rollup(election_id)
            .await?
            .map(|(snapshot, rollup)| summarize(&snapshot.election, &rollup).0.candidates)
            .unwrap_or_default())
    }

    pub async fn fetch_center_summary_by_candidate(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> ResultsResult<Vec<CandidateCenterSummary>> {
        Ok(self
            .load_rollup(election_id)
            .await?
            .map(|(_, rollup)| candidate_center_summaries(&rollup, candidate_id))
            .unwrap_or_default())
    }

    pub async fn fetch_bureau_summary_by_candidate(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> ResultsResult<Vec<CandidateBureauSummary>> {
        Ok(self
            .load_rollup(election_id)
            .await?
            .map(|(_, rollup)| candidate_bureau_summaries(&rollup, candidate_id))
            .unwrap_or_default())
    }

    pub async fn coverage(&self, election: &Election, rollup: &Rollup) -> CoverageEstimate {
        coverage::estimate_coverage(&self.db, election, &rollup.bureaux, &self.config.coverage).await
    }

    /// Whole-election results view.
    pub async fn election_report(
        &self,
        election_id: ElectionId,
        request: ViewRequest,
    ) -> ResultsResult<ResultsOutcome<ElectionReport>> {
        let Some((snapshot, rollup)) = self.load_rollup(election_id).await? else {
            return Ok(ResultsOutcome::NoResults);
        };

        let (summary, participation) = summarize(&snapshot.election, &rollup);
        let coverage = self.coverage(&snapshot.election, &rollup).await;
        let table = build_table(&rollup, ViewScope::Election, request);

        Ok(ResultsOutcome::Ready(ElectionReport {
            election: snapshot.election,
            summary,
            participation,
            centers: rollup.centers,
            bureaux: rollup.bureaux,
            coverage,
            table,
        }))
    }

    /// Single-candidate drill-down view.
    pub async fn candidate_report(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
        request: ViewRequest,
    ) -> ResultsResult<ResultsOutcome<CandidateReport>> {
        let Some((snapshot, rollup)) = self.load_rollup(election_id).await? else {
            return Ok(ResultsOutcome::NoResults);
        };

        let (summary, _) = summarize(&snapshot.election, &rollup);
        let Some(result) = summary
            .candidates
            .into_iter()
            .find(|r| r.candidate.id == candidate_id)
        else {
            debug!("candidate {} not in election {}", candidate_id, election_id);
            return Ok(ResultsOutcome::NoResults);
        };

        Ok(ResultsOutcome::Ready(CandidateReport {
            election: snapshot.election,
            result,
            centers: candidate_center_summaries(&rollup, candidate_id),
            bureaux: candidate_bureau_summaries(&rollup, candidate_id),
            table: build_table(&rollup, ViewScope::Candidate(candidate_id), request),
        }))
    }
}
