mod candidate;
mod coverage;
mod ingest;
mod init_db;
mod render;
mod summary;

pub use candidate::candidate;
pub use coverage::coverage;
pub use ingest::ingest;
pub use init_db::init_db;
pub use summary::summary;

use crate::database::{schema, ResultsDatabase};
use std::path::Path;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Opens an existing store and checks it has every table.
async fn open_store(database_path: &Path) -> Result<ResultsDatabase, Box<dyn std::error::Error>> {
    let database_url = format!("sqlite:{}", database_path.display());
    let db = ResultsDatabase::new(&database_url).await?;
    schema::verify_schema(db.pool()).await?;
    Ok(db)
}
