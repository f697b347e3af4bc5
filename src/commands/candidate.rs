use crate::commands::render::{no_results, print_election_header, print_json, print_table};
use crate::commands::{open_store, CommandResult};
use crate::config::EngineConfig;
use crate::model::election::{CandidateId, ElectionId};
use crate::results::views::ViewRequest;
use crate::results::{ResultsOutcome, ResultsService};
use colored::Colorize;
use std::path::Path;

pub async fn candidate(
    database_path: &Path,
    election_id: ElectionId,
    candidate_id: CandidateId,
    request: ViewRequest,
    json: bool,
    config: EngineConfig,
) -> CommandResult {
    let db = open_store(database_path).await?;
    let service = ResultsService::new(db, config);

    let report = match service
        .candidate_report(election_id, candidate_id, request)
        .await?
    {
        ResultsOutcome::Ready(report) => report,
        ResultsOutcome::NoResults => {
            no_results(election_id);
            return Ok(());
        }
    };

    if json {
        return Ok(print_json(&report)?);
    }

    print_election_header(&report.election);
    let rank = match report.result.rank {
        0 => "unranked".to_string(),
        rank => format!("rank {}", rank),
    };
    println!(
        "👤 {} {} votes ({:.2}%), {}",
        report.result.candidate.name.bright_green().bold(),
        report.result.votes,
        report.result.percentage,
        rank
    );
    println!();
    print_table(&report.table);
    Ok(())
}
