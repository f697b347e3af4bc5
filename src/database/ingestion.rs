//! Loads JSON snapshots (either field-naming convention) into the store
use crate::database::{schema, DatabaseError, ResultsDatabase};
use crate::normalizers::{
    RawBureauRow, RawCandidateRow, RawCenterRow, RawElectionRow, RawResultRow,
};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Cannot read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotCandidate {
    #[serde(flatten)]
    pub candidate: RawCandidateRow,
    #[serde(default, alias = "id_election")]
    pub election_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub elections: Vec<RawElectionRow>,
    #[serde(default, alias = "centres")]
    pub centers: Vec<RawCenterRow>,
    #[serde(default, alias = "bureaus")]
    pub bureaux: Vec<RawBureauRow>,
    #[serde(default, alias = "candidats")]
    pub candidates: Vec<SnapshotCandidate>,
    #[serde(default, alias = "resultats")]
    pub results: Vec<RawResultRow>,
}

impl Snapshot {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub elections: usize,
    pub centers: usize,
    pub bureaux: usize,
    pub candidates: usize,
    pub results: usize,
    pub total_duration_ms: u64,
}

pub struct SnapshotIngester {
    db: ResultsDatabase,
}

impl SnapshotIngester {
    pub fn new(db: ResultsDatabase) -> Self {
        Self { db }
    }

    /// Writes the whole snapshot in one transaction, replacing rows that
    /// share an id.
    pub async fn ingest(&self, snapshot: &Snapshot) -> Result<IngestionSummary> {
        let start = Instant::now();
        schema::create_schema(self.db.pool()).await?;

        let mut tx = self.db.pool().begin().await?;

        for election in &snapshot.elections {
            let metadata = election.metadata.as_ref().map(|m| m.0.to_string());
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO elections
                (id, title, description, date, status, registered_voters, expected_bureaux, metadata)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(election.id)
            .bind(&election.title)
            .bind(&election.description)
            .bind(&election.date)
            .bind(&election.status)
            .bind(election.registered_voters)
            .bind(election.expected_bureaux)
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }

        for center in &snapshot.centers {
            sqlx::query("INSERT OR REPLACE INTO centers (id, name) VALUES (?, ?)")
                .bind(center.id)
                .bind(&center.name)
                .execute(&mut *tx)
                .await?;

            if let Some(election_id) = center.election_id {
                sqlx::query(
                    "INSERT OR IGNORE INTO election_centers (election_id, center_id) VALUES (?, ?)",
                )
                .bind(election_id)
                .bind(center.id)
                .execute(&mut *tx)
                .await?;
            }
        }

        for bureau in &snapshot.bureaux {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO bureaux
                (id, name, center_id, election_id, registered_voters, voters_who_voted, expressed_votes)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(bureau.id)
            .bind(&bureau.name)
            .bind(bureau.center_id)
            .bind(bureau.election_id)
            .bind(bureau.registered_voters)
            .bind(bureau.voters_who_voted)
            .bind(bureau.expressed_votes)
            .execute(&mut *tx)
            .await?;
        }

        for entry in &snapshot.candidates {
            let candidate = &entry.candidate;
            sqlx::query("INSERT OR REPLACE INTO candidates (id, name, party) VALUES (?, ?, ?)")
                .bind(candidate.id)
                .bind(&candidate.name)
                .bind(&candidate.party)
                .execute(&mut *tx)
                .await?;

            if let Some(election_id) = entry.election_id {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO election_candidates (election_id, candidate_id, position)
                    VALUES (?, ?, ?)
                    "#,
                )
                .bind(election_id)
                .bind(candidate.id)
                .bind(candidate.position)
                .execute(&mut *tx)
                .await?;
            }
        }

        for result in &snapshot.results {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO results
                (bureau_id, candidate_id, votes, election_id, center_id, bureau_name)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(result.bureau_id)
            .bind(result.candidate_id)
            .bind(result.votes)
            .bind(result.election_id)
            .bind(result.center_id)
            .bind(&result.bureau_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let summary = IngestionSummary {
            elections: snapshot.elections.len(),
            centers: snapshot.centers.len(),
            bureaux: snapshot.bureaux.len(),
            candidates: snapshot.candidates.len(),
            results: snapshot.results.len(),
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!("snapshot ingestion summary: {:?}", summary);
        info!(
            "Ingested {} bureaux and {} result rows",
            summary.bureaux, summary.results
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn legacy_snapshot_round_trips_through_store() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "elections": [{"id_election": 1, "titre": "Législatives", "statut": "terminée",
                               "metadata": {"total_bureaux": "3"}}],
                "centres": [{"id_centre": 10, "nom": "Mairie", "id_election": 1}],
                "bureaus": [{"id_bureau": 100, "nom": "Bureau 1", "centre_id": 10,
                             "inscrits": 50, "votants": 40, "exprimes": 38}],
                "candidats": [{"id_candidat": 7, "nom": "Durand", "ordre": 1, "id_election": 1}],
                "resultats": [{"id_bureau": 100, "id_candidat": 7, "voix": "38"}]
            }"#,
        )
        .unwrap();

        let db = ResultsDatabase::create_in_memory().await.unwrap();
        let summary = SnapshotIngester::new(db.clone())
            .ingest(&snapshot)
            .await
            .unwrap();
        assert_eq!(summary.bureaux, 1);
        assert_eq!(summary.results, 1);

        let election = db.fetch_election_row(1).await.unwrap().unwrap();
        assert_eq!(election.title.as_deref(), Some("Législatives"));
        assert_eq!(
            election.metadata.map(|m| m.0),
            Some(serde_json::json!({"total_bureaux": "3"}))
        );

        let bureaux = db.fetch_bureau_rows(1).await.unwrap();
        assert_eq!(bureaux.len(), 1);
        assert_eq!(bureaux[0].expressed_votes, Some(38));

        let candidates = db.fetch_candidate_rows(1).await.unwrap();
        assert_eq!(candidates[0].name.as_deref(), Some("Durand"));

        let results = db.fetch_result_rows(1).await.unwrap();
        assert_eq!(results[0].votes, Some(38));
        assert_eq!(db.count_bureaux_direct(1).await.unwrap(), 0);
        assert_eq!(db.count_bureaux_via_centers(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn results_for_unexported_bureaux_are_stored_and_read_back() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "elections": [{"id": 1, "title": "Scrutin"}],
                "bureaux": [{"id": 1, "name": "Bureau 1", "election_id": 1, "registered_voters": 10}],
                "results": [
                    {"bureau_id": 1, "candidate_id": 7, "votes": 4},
                    {"bureau_id": 2, "candidate_id": 7, "votes": 6, "election_id": 1,
                     "nom_bureau": "Bureau 2"},
                    {"bureau_id": 3, "candidate_id": 7, "votes": 9}
                ]
            }"#,
        )
        .unwrap();

        let db = ResultsDatabase::create_in_memory().await.unwrap();
        let summary = SnapshotIngester::new(db.clone())
            .ingest(&snapshot)
            .await
            .unwrap();
        assert_eq!(summary.results, 3);

        let results = db.fetch_result_rows(1).await.unwrap();
        let read: Vec<_> = results
            .iter()
            .map(|r| (r.bureau_id, r.votes, r.bureau_name.as_deref()))
            .collect();
        // bureau 3 has no bureau row and no election tag, so it belongs nowhere
        assert_eq!(read, vec![(1, Some(4), None), (2, Some(6), Some("Bureau 2"))]);
    }
}
