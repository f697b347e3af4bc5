//! Terminal rendering shared by the result commands.
use crate::model::election::{CandidateResult, CoverageEstimate, Election, Totals};
use crate::results::tracker::CoverageState;
use crate::results::views::{BureauRow, CenterGroup, ResultsTable, UnitMetrics};
use colored::Colorize;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn no_results(election_id: i64) {
    println!(
        "{} for election {}",
        "No results available".yellow(),
        election_id.to_string().bright_cyan()
    );
}

pub fn print_election_header(election: &Election) {
    let date = election
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".to_string());
    println!(
        "🗳️  {} ({}, {})",
        election.title.bright_cyan().bold(),
        date,
        election.status
    );
}

pub fn print_totals(totals: &Totals, participation_pct: f64) {
    println!(
        "   Registered {}  Voters {}  Expressed {}  Participation {}",
        totals.registered.to_string().bright_yellow(),
        totals.voters.to_string().bright_yellow(),
        totals.expressed.to_string().bright_yellow(),
        format!("{:.2}%", participation_pct).bright_green()
    );
}

pub fn print_coverage(estimate: &CoverageEstimate) {
    let marker = if estimate.is_estimated {
        "estimated".yellow()
    } else {
        "confirmed".green()
    };
    println!(
        "📊 Coverage {} ({} of {} bureaux, {} via {})",
        format!("{:.1}%", estimate.coverage_pct).bright_green().bold(),
        estimate.reporting_bureaux,
        estimate.expected_bureaux,
        marker,
        estimate.source
    );
}

pub fn print_coverage_update(state: &CoverageState) {
    match &state.estimate {
        Some(estimate) => {
            print!("   retry {}: ", state.attempts);
            print_coverage(estimate);
        }
        None => println!("   retry {}: election no longer available", state.attempts),
    }
}

pub fn print_candidates(results: &[CandidateResult]) {
    for result in results {
        let rank = match result.rank {
            0 => "-".to_string(),
            rank => rank.to_string(),
        };
        let name = if result.rank == 1 {
            result.candidate.name.bright_green().bold()
        } else {
            result.candidate.name.normal()
        };
        let party = match &result.candidate.party {
            Some(party) if !result.candidate.is_independent() => party.as_str(),
            _ => "Independent",
        };
        println!(
            "   {:>3}  {} ({})  {} votes  {:.2}%",
            rank,
            name,
            party.dimmed(),
            result.votes,
            result.percentage
        );
    }
}

fn metrics_line(metrics: &UnitMetrics) -> String {
    format!(
        "participation {:>6.2}%  score {:>6.2}%  votes {}",
        metrics.participation_pct, metrics.score_pct, metrics.votes
    )
}

fn print_bureau_row(row: &BureauRow, indent: &str, with_center: bool) {
    let label = match (&row.center_name, with_center) {
        (Some(center), true) => format!("{} / {}", center, row.bureau_name),
        _ => row.bureau_name.clone(),
    };
    println!("{}{:<32} {}", indent, label, metrics_line(&row.metrics));
}

fn print_center_group(group: &CenterGroup) {
    println!(
        "   🏫 {:<29} {}",
        group.center_name.bright_cyan(),
        metrics_line(&group.metrics)
    );
    for row in &group.bureaux {
        print_bureau_row(row, "        ", false);
    }
}

pub fn print_table(table: &ResultsTable) {
    if table.is_empty() {
        println!("{}", "   (no rows)".dimmed());
        return;
    }
    match table {
        ResultsTable::ByCenter(groups) => groups.iter().for_each(print_center_group),
        ResultsTable::ByBureau(rows) => {
            for row in rows {
                print_bureau_row(row, "   ", true);
            }
        }
    }
}
