//! Election store schema and integrity checks
use crate::database::{DatabaseError, Result};
use sqlx::SqlitePool;

// Links between tables are plain ids, not foreign keys: legacy exports
// reference bureaux and centers that were never exported.
const TABLES: [(&str, &str); 7] = [
    (
        "elections",
        r#"
        CREATE TABLE IF NOT EXISTS elections (
            id INTEGER PRIMARY KEY,
            title TEXT,
            description TEXT,
            date TEXT,
            status TEXT,
            registered_voters INTEGER,
            expected_bureaux INTEGER,
            metadata TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "centers",
        r#"
        CREATE TABLE IF NOT EXISTS centers (
            id INTEGER PRIMARY KEY,
            name TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "election_centers",
        r#"
        CREATE TABLE IF NOT EXISTS election_centers (
            election_id INTEGER NOT NULL,
            center_id INTEGER NOT NULL,
            UNIQUE(election_id, center_id)
        )
        "#,
    ),
    // center_id and election_id are both optional: older data only links
    // bureaux to centers, some imports only to elections.
    (
        "bureaux",
        r#"
        CREATE TABLE IF NOT EXISTS bureaux (
            id INTEGER PRIMARY KEY,
            name TEXT,
            center_id INTEGER,
            election_id INTEGER,
            registered_voters INTEGER,
            voters_who_voted INTEGER,
            expressed_votes INTEGER,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "candidates",
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id INTEGER PRIMARY KEY,
            name TEXT,
            party TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "election_candidates",
        r#"
        CREATE TABLE IF NOT EXISTS election_candidates (
            election_id INTEGER NOT NULL,
            candidate_id INTEGER NOT NULL,
            position INTEGER,
            UNIQUE(election_id, candidate_id)
        )
        "#,
    ),
    (
        "results",
        r#"
        CREATE TABLE IF NOT EXISTS results (
            id INTEGER PRIMARY KEY,
            bureau_id INTEGER NOT NULL,
            candidate_id INTEGER NOT NULL,
            votes INTEGER,
            election_id INTEGER,
            center_id INTEGER,
            bureau_name TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(bureau_id, candidate_id)
        )
        "#,
    ),
];

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for (_, create_sql) in TABLES {
        sqlx::query(create_sql).execute(pool).await?;
    }

    create_indexes(pool).await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_election_centers_election ON election_centers(election_id)",
        "CREATE INDEX IF NOT EXISTS idx_bureaux_center ON bureaux(center_id)",
        "CREATE INDEX IF NOT EXISTS idx_bureaux_election ON bureaux(election_id)",
        "CREATE INDEX IF NOT EXISTS idx_election_candidates_election ON election_candidates(election_id)",
        "CREATE INDEX IF NOT EXISTS idx_results_bureau ON results(bureau_id)",
        "CREATE INDEX IF NOT EXISTS idx_results_candidate ON results(candidate_id)",
        "CREATE INDEX IF NOT EXISTS idx_results_election ON results(election_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    Ok(())
}

/// Verify database schema integrity
pub async fn verify_schema(pool: &SqlitePool) -> Result<()> {
    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(pool)
            .await?;

    for (expected, _) in TABLES {
        if !tables.iter().any(|name| name == expected) {
            return Err(DatabaseError::Integrity(format!(
                "Missing table: {}",
                expected
            )));
        }
    }

    Ok(())
}
