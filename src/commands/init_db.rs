use crate::commands::CommandResult;
use crate::database::{schema, ResultsDatabase};
use colored::Colorize;
use std::path::Path;

pub async fn init_db(database_path: &Path) -> CommandResult {
    let database_url = format!("sqlite:{}", database_path.display());
    let db = ResultsDatabase::new(&database_url).await?;
    schema::create_schema(db.pool()).await?;
    schema::verify_schema(db.pool()).await?;

    println!(
        "✅ Database initialized: {}",
        database_path.display().to_string().bright_green()
    );
    Ok(())
}
