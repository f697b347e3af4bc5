use crate::commands::CommandResult;
use crate::database::ingestion::{Snapshot, SnapshotIngester};
use crate::database::ResultsDatabase;
use colored::Colorize;
use std::path::Path;

pub async fn ingest(snapshot_path: &Path, database_path: &Path) -> CommandResult {
    println!(
        "🚀 Ingesting {} into {}",
        snapshot_path.display().to_string().bright_cyan(),
        database_path.display().to_string().bright_cyan()
    );

    let snapshot = Snapshot::from_file(snapshot_path)?;
    let database_url = format!("sqlite:{}", database_path.display());
    let db = ResultsDatabase::new(&database_url).await?;

    let summary = SnapshotIngester::new(db).ingest(&snapshot).await?;

    println!(
        "📋 {} elections, {} centers, {} bureaux, {} candidates",
        summary.elections.to_string().bright_yellow(),
        summary.centers.to_string().bright_yellow(),
        summary.bureaux.to_string().bright_yellow(),
        summary.candidates.to_string().bright_yellow()
    );
    println!(
        "🎉 Ingestion completed! Stored {} result rows in {} seconds",
        summary.results.to_string().bright_green().bold(),
        format!("{:.2}", summary.total_duration_ms as f64 / 1000.0).bright_green().bold()
    );
    Ok(())
}
