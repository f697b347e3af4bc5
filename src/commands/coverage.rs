use crate::commands::render::{no_results, print_coverage, print_coverage_update, print_json};
use crate::commands::{open_store, CommandResult};
use crate::config::{CoverageConfig, EngineConfig};
use crate::database::ResultsDatabase;
use crate::model::election::ElectionId;
use crate::results::tracker::{compute_coverage, CoverageTracker};
use colored::Colorize;
use std::path::Path;

pub async fn coverage(
    database_path: &Path,
    election_id: ElectionId,
    watch: bool,
    json: bool,
    config: &EngineConfig,
) -> CommandResult {
    let db = open_store(database_path).await?;

    if watch {
        return watch_coverage(db, config.coverage.clone(), election_id, true).await;
    }

    match compute_coverage(&db, election_id, &config.coverage).await? {
        Some(estimate) if json => print_json(&estimate)?,
        Some(estimate) => print_coverage(&estimate),
        None => no_results(election_id),
    }
    Ok(())
}

/// Prints every retry until the schedule ends or an authoritative count
/// turns up. The initial estimate is printed only when the caller has not
/// shown it already.
pub(super) async fn watch_coverage(
    db: ResultsDatabase,
    config: CoverageConfig,
    election_id: ElectionId,
    print_initial: bool,
) -> CommandResult {
    let mut tracker = CoverageTracker::new(db, config);
    let mut updates = tracker.subscribe();

    let Some(initial) = tracker.track(election_id).await? else {
        no_results(election_id);
        return Ok(());
    };
    let _ = updates.borrow_and_update();
    if print_initial {
        print_coverage(&initial);
    }

    if !initial.is_estimated {
        return Ok(());
    }
    println!("{}", "⏳ Waiting for an authoritative bureau count...".dimmed());

    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if let Some(state) = state {
                print_coverage_update(&state);
            }
        }
    });

    tracker.settle().await;
    drop(tracker);
    printer.await?;

    Ok(())
}
