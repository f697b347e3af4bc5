use crate::commands::coverage::watch_coverage;
use crate::commands::render::{
    no_results, print_candidates, print_coverage, print_election_header, print_json, print_table,
    print_totals,
};
use crate::commands::{open_store, CommandResult};
use crate::config::EngineConfig;
use crate::model::election::ElectionId;
use crate::results::ranking::winner;
use crate::results::views::ViewRequest;
use crate::results::{ResultsOutcome, ResultsService};
use colored::Colorize;
use std::path::Path;

pub async fn summary(
    database_path: &Path,
    election_id: ElectionId,
    request: ViewRequest,
    json: bool,
    watch: bool,
    config: EngineConfig,
) -> CommandResult {
    let db = open_store(database_path).await?;
    let service = ResultsService::new(db.clone(), config);

    let report = match service.election_report(election_id, request).await? {
        ResultsOutcome::Ready(report) => report,
        ResultsOutcome::NoResults => {
            no_results(election_id);
            return Ok(());
        }
    };

    if json {
        print_json(&report)?;
    } else {
        print_election_header(&report.election);
        print_totals(&report.summary.totals, report.summary.participation_pct);
        print_coverage(&report.coverage);
        println!();
        print_candidates(&report.summary.candidates);
        if let Some(leader) = winner(&report.summary.candidates) {
            println!("🏆 Leading: {}", leader.candidate.name.bright_green().bold());
        }
        println!();
        print_table(&report.table);
    }

    if watch && report.coverage.is_estimated {
        // the report above already printed the first estimate
        watch_coverage(db, service.config().coverage.clone(), election_id, false).await?;
    }
    Ok(())
}
