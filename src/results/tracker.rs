//! Background upgrade of heuristic coverage estimates.
//!
//! A tracker follows one election at a time. When the expected bureau count
//! had to be estimated, a task retries the whole computation on a fixed,
//! finite schedule and publishes the result, stopping at the first
//! authoritative answer. Switching elections aborts the task, and a result
//! is only published while the tracker still points at its election.
use crate::config::CoverageConfig;
use crate::database::{DatabaseError, ResultsDatabase};
use crate::model::election::{CoverageEstimate, ElectionId};
use crate::results::coverage::estimate_coverage;
use crate::results::load_snapshot;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Latest estimate for the election being followed.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageState {
    pub election_id: ElectionId,
    /// `None` when the election does not exist.
    pub estimate: Option<CoverageEstimate>,
    /// Completed retry attempts.
    pub attempts: usize,
}

/// Recomputes a coverage estimate from the store. Pure apart from the reads,
/// so repeated calls simply replace one another.
pub async fn compute_coverage(
    db: &ResultsDatabase,
    election_id: ElectionId,
    config: &CoverageConfig,
) -> Result<Option<CoverageEstimate>, DatabaseError> {
    let Some(snapshot) = load_snapshot(db, election_id).await? else {
        return Ok(None);
    };
    let rollup = snapshot.rollup();

    Ok(Some(
        estimate_coverage(db, &snapshot.election, &rollup.bureaux, config).await,
    ))
}

/// Replaces the state only if it still belongs to `election_id`.
fn publish_for(
    state: &watch::Sender<Option<CoverageState>>,
    election_id: ElectionId,
    update: impl FnOnce(&mut CoverageState),
) -> bool {
    state.send_if_modified(|current| match current {
        Some(current) if current.election_id == election_id => {
            update(current);
            true
        }
        _ => false,
    })
}

pub struct CoverageTracker {
    db: ResultsDatabase,
    config: CoverageConfig,
    state: Arc<watch::Sender<Option<CoverageState>>>,
    retry: Option<JoinHandle<()>>,
}

impl CoverageTracker {
    pub fn new(db: ResultsDatabase, config: CoverageConfig) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            db,
            config,
            state: Arc::new(state),
            retry: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CoverageState>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<CoverageState> {
        self.state.borrow().clone()
    }

    pub fn election_id(&self) -> Option<ElectionId> {
        self.state.borrow().as_ref().map(|s| s.election_id)
    }

    /// Starts following `election_id`, dropping whatever was followed before.
    /// Returns the initial estimate (`None` if the election is unknown).
    pub async fn track(
        &mut self,
        election_id: ElectionId,
    ) -> Result<Option<CoverageEstimate>, DatabaseError> {
        self.stop();
        self.state.send_replace(Some(CoverageState {
            election_id,
            estimate: None,
            attempts: 0,
        }));

        let estimate = compute_coverage(&self.db, election_id, &self.config).await?;
        publish_for(&self.state, election_id, |current| {
            current.estimate = estimate.clone();
        });

        match &estimate {
            Some(e) if e.is_estimated && !self.config.retry_delays_ms.is_empty() => {
                debug!(
                    "election {}: coverage estimated from {}, scheduling {} retries",
                    election_id,
                    e.source,
                    self.config.retry_delays_ms.len()
                );
                self.retry = Some(tokio::spawn(retry_authoritative(
                    self.db.clone(),
                    self.config.clone(),
                    self.state.clone(),
                    election_id,
                )));
            }
            _ => {}
        }

        Ok(estimate)
    }

    /// Aborts any in-flight retry.
    pub fn stop(&mut self) {
        if let Some(handle) = self.retry.take() {
            handle.abort();
        }
    }

    /// Waits until the retry schedule has finished or was cut short.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.retry.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Coverage retry task failed: {}", e);
                }
            }
        }
    }
}

impl Drop for CoverageTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn retry_authoritative(
    db: ResultsDatabase,
    config: CoverageConfig,
    state: Arc<watch::Sender<Option<CoverageState>>>,
    election_id: ElectionId,
) {
    for delay in config.retry_delays() {
        tokio::time::sleep(delay).await;

        let attempt = compute_coverage(&db, election_id, &config).await;
        let estimate = match attempt {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!("Coverage retry for election {} failed: {}", election_id, e);
                if !publish_for(&state, election_id, |current| current.attempts += 1) {
                    return;
                }
                continue;
            }
        };

        let upgraded = estimate.as_ref().map_or(false, |e| !e.is_estimated);
        let applied = publish_for(&state, election_id, |current| {
            current.estimate = estimate.clone();
            current.attempts += 1;
        });
        if !applied {
            debug!("election {}: no longer tracked, dropping retry", election_id);
            return;
        }
        if upgraded {
            if let Some(e) = &estimate {
                info!(
                    "election {}: coverage now {:.1}% of {} bureaux from {}",
                    election_id, e.coverage_pct, e.expected_bureaux, e.source
                );
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::create_schema;
    use crate::model::election::CoverageSource;

    async fn store_with_heuristic_elections() -> ResultsDatabase {
        let db = ResultsDatabase::create_in_memory().await.unwrap();
        create_schema(db.pool()).await.unwrap();
        for (id, title) in [(1, "Scrutin A"), (2, "Scrutin B")] {
            sqlx::query("INSERT INTO elections (id, title, status) VALUES (?, ?, 'ongoing')")
                .bind(id)
                .bind(title)
                .execute(db.pool())
                .await
                .unwrap();
        }
        db
    }

    async fn set_expected(db: &ResultsDatabase, election_id: ElectionId, count: i64) {
        sqlx::query("UPDATE elections SET expected_bureaux = ? WHERE id = ?")
            .bind(count)
            .bind(election_id)
            .execute(db.pool())
            .await
            .unwrap();
    }

    fn fast_config(delays: Vec<u64>) -> CoverageConfig {
        CoverageConfig {
            retry_delays_ms: delays,
            ..CoverageConfig::default()
        }
    }

    #[tokio::test]
    async fn heuristic_estimate_upgraded_once_authoritative_data_appears() {
        let db = store_with_heuristic_elections().await;
        let mut tracker = CoverageTracker::new(db.clone(), fast_config(vec![20, 50, 100]));

        let initial = tracker.track(1).await.unwrap().unwrap();
        assert!(initial.is_estimated);
        assert_eq!(initial.source, CoverageSource::BureauNumberScan);

        set_expected(&db, 1, 29).await;
        tracker.settle().await;

        let state = tracker.current().unwrap();
        let estimate = state.estimate.unwrap();
        assert_eq!(state.election_id, 1);
        assert!(!estimate.is_estimated);
        assert_eq!(estimate.expected_bureaux, 29);
        assert!(state.attempts >= 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let db = store_with_heuristic_elections().await;
        let mut tracker = CoverageTracker::new(db, fast_config(vec![1, 1, 1]));

        tracker.track(1).await.unwrap();
        tracker.settle().await;

        let state = tracker.current().unwrap();
        assert_eq!(state.attempts, 3);
        assert!(state.estimate.unwrap().is_estimated);
    }

    #[tokio::test]
    async fn authoritative_estimate_needs_no_retry() {
        let db = store_with_heuristic_elections().await;
        set_expected(&db, 2, 10).await;
        let mut tracker = CoverageTracker::new(db, fast_config(vec![1]));

        let estimate = tracker.track(2).await.unwrap().unwrap();
        assert!(!estimate.is_estimated);
        tracker.settle().await;
        assert_eq!(tracker.current().unwrap().attempts, 0);
    }

    #[tokio::test]
    async fn switching_elections_discards_stale_retry() {
        let db = store_with_heuristic_elections().await;
        let mut tracker = CoverageTracker::new(db.clone(), fast_config(vec![30, 30]));
        let mut updates = tracker.subscribe();

        tracker.track(1).await.unwrap();
        set_expected(&db, 1, 50).await;
        tracker.track(2).await.unwrap();
        tracker.settle().await;

        let state = updates.borrow_and_update().clone().unwrap();
        assert_eq!(state.election_id, 2);
        let estimate = state.estimate.unwrap();
        assert_eq!(estimate.election_id, 2);
        assert!(estimate.is_estimated);
        assert_eq!(tracker.election_id(), Some(2));
    }

    #[test]
    fn stale_publication_is_rejected() {
        let (state, _) = watch::channel(Some(CoverageState {
            election_id: 2,
            estimate: None,
            attempts: 0,
        }));
        assert!(!publish_for(&state, 1, |s| s.attempts = 99));
        assert!(publish_for(&state, 2, |s| s.attempts = 1));
        assert_eq!(state.borrow().as_ref().unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn unknown_election_tracks_as_empty() {
        let db = store_with_heuristic_elections().await;
        let mut tracker = CoverageTracker::new(db, fast_config(vec![1]));

        assert!(tracker.track(404).await.unwrap().is_none());
        let state = tracker.current().unwrap();
        assert_eq!(state.election_id, 404);
        assert!(state.estimate.is_none());
    }
}
