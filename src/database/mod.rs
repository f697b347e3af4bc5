pub mod ingestion;
pub mod schema;

use crate::model::election::ElectionId;
use crate::normalizers::{
    RawBureauRow, RawCandidateRow, RawCenterRow, RawElectionRow, RawResultRow,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Data integrity error: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Bureaux belonging to an election, either directly or through one of the
/// election's centers.
const ELECTION_BUREAUX: &str = r#"
    b.election_id = ?
    OR (b.election_id IS NULL AND b.center_id IN (
        SELECT center_id FROM election_centers WHERE election_id = ?
    ))
"#;

/// Read-only access to the election store.
#[derive(Clone)]
pub struct ResultsDatabase {
    pool: SqlitePool,
}

impl ResultsDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(false);
        let pool = SqlitePool::connect_with(options).await?;

        Ok(Self { pool })
    }

    /// Single connection, otherwise every pooled connection would see its
    /// own empty database.
    pub async fn create_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get election by ID
    pub async fn fetch_election_row(&self, election_id: ElectionId) -> Result<Option<RawElectionRow>> {
        let election = sqlx::query_as::<_, RawElectionRow>(
            r#"
            SELECT id, title, description, date, status,
                   CAST(registered_voters AS TEXT) AS registered_voters,
                   CAST(expected_bureaux AS TEXT) AS expected_bureaux,
                   CAST(metadata AS TEXT) AS metadata
            FROM elections
            WHERE id = ?
            "#,
        )
        .bind(election_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(election)
    }

    /// Get the centers linked to an election
    pub async fn fetch_center_rows(&self, election_id: ElectionId) -> Result<Vec<RawCenterRow>> {
        let centers = sqlx::query_as::<_, RawCenterRow>(
            r#"
            SELECT c.id, c.name, ec.election_id
            FROM centers c
            JOIN election_centers ec ON ec.center_id = c.id
            WHERE ec.election_id = ?
            ORDER BY c.name, c.id
            "#,
        )
        .bind(election_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(centers)
    }

    /// Get all bureaux of an election, including those without a known center
    pub async fn fetch_bureau_rows(&self, election_id: ElectionId) -> Result<Vec<RawBureauRow>> {
        let sql = format!(
            r#"
            SELECT b.id, b.name,
                   CAST(b.center_id AS TEXT) AS center_id,
                   CAST(b.election_id AS TEXT) AS election_id,
                   CAST(b.registered_voters AS TEXT) AS registered_voters,
                   CAST(b.voters_who_voted AS TEXT) AS voters_who_voted,
                   CAST(b.expressed_votes AS TEXT) AS expressed_votes
            FROM bureaux b
            WHERE {}
            ORDER BY b.id
            "#,
            ELECTION_BUREAUX
        );
        let bureaux = sqlx::query_as::<_, RawBureauRow>(&sql)
            .bind(election_id)
            .bind(election_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bureaux)
    }

    /// Get candidates standing in an election, in ballot order
    pub async fn fetch_candidate_rows(&self, election_id: ElectionId) -> Result<Vec<RawCandidateRow>> {
        let candidates = sqlx::query_as::<_, RawCandidateRow>(
            r#"
            SELECT c.id, c.name, c.party, CAST(ec.position AS TEXT) AS position
            FROM candidates c
            JOIN election_candidates ec ON ec.candidate_id = c.id
            WHERE ec.election_id = ?
            ORDER BY ec.position, c.id
            "#,
        )
        .bind(election_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    /// Get per-bureau, per-candidate vote rows for an election. Rows tagged
    /// with the election are kept even when their bureau is not in the store.
    pub async fn fetch_result_rows(&self, election_id: ElectionId) -> Result<Vec<RawResultRow>> {
        let sql = format!(
            r#"
            SELECT r.bureau_id, r.candidate_id,
                   CAST(r.votes AS TEXT) AS votes,
                   CAST(r.election_id AS TEXT) AS election_id,
                   CAST(r.center_id AS TEXT) AS center_id,
                   r.bureau_name
            FROM results r
            LEFT JOIN bureaux b ON b.id = r.bureau_id
            WHERE r.election_id = ?
               OR (r.election_id IS NULL AND b.id IS NOT NULL AND ({}))
            ORDER BY r.bureau_id, r.candidate_id
            "#,
            ELECTION_BUREAUX
        );
        let results = sqlx::query_as::<_, RawResultRow>(&sql)
            .bind(election_id)
            .bind(election_id)
            .bind(election_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(results)
    }

    /// Count bureaux whose `election_id` points at the election
    pub async fn count_bureaux_direct(&self, election_id: ElectionId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bureaux WHERE election_id = ?")
            .bind(election_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    /// Count bureaux reachable through the election's linked centers
    pub async fn count_bureaux_via_centers(&self, election_id: ElectionId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT b.id)
            FROM bureaux b
            JOIN election_centers ec ON ec.center_id = b.center_id
            WHERE ec.election_id = ?
            "#,
        )
        .bind(election_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
