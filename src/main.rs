mod commands;
mod config;
mod database;
mod model;
mod normalizers;
mod results;
mod util;

use crate::commands::{candidate, coverage, ingest, init_db, summary};
use crate::config::EngineConfig;
use crate::results::views::{SortDirection, SortKey, ViewMode, ViewRequest};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
struct Opts {
    /// Engine configuration file (JSON)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct ViewArgs {
    /// Row layout: by-center or by-bureau
    #[clap(long, default_value = "by-center")]
    view: ViewMode,
    /// Sort key: center, participation, score or votes
    #[clap(long, default_value = "center")]
    sort: SortKey,
    /// Sort direction: asc or desc
    #[clap(long, default_value = "asc")]
    direction: SortDirection,
}

impl ViewArgs {
    fn request(self) -> ViewRequest {
        ViewRequest {
            mode: self.view,
            key: self.sort,
            direction: self.direction,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create the SQLite schema.
    InitDb {
        /// SQLite database path
        database_path: PathBuf,
    },
    /// Load a JSON snapshot into the database
    Ingest {
        /// Snapshot file
        snapshot_path: PathBuf,
        /// SQLite database path
        database_path: PathBuf,
    },
    /// Whole-election results
    Summary {
        /// SQLite database path
        database_path: PathBuf,
        election_id: i64,
        #[clap(flatten)]
        view: ViewArgs,
        /// Print JSON instead of tables
        #[clap(long)]
        json: bool,
        /// Keep following the coverage estimate while it is heuristic
        #[clap(long)]
        watch: bool,
    },
    /// Results of one candidate, per center or bureau
    Candidate {
        /// SQLite database path
        database_path: PathBuf,
        election_id: i64,
        candidate_id: i64,
        #[clap(flatten)]
        view: ViewArgs,
        #[clap(long)]
        json: bool,
    },
    /// Expected bureaux and coverage rate
    Coverage {
        /// SQLite database path
        database_path: PathBuf,
        election_id: i64,
        #[clap(long)]
        watch: bool,
        #[clap(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let opts = Opts::parse();

    let config = match EngineConfig::load(opts.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match opts.command {
        Command::InitDb { database_path } => init_db(&database_path).await,
        Command::Ingest {
            snapshot_path,
            database_path,
        } => ingest(&snapshot_path, &database_path).await,
        Command::Summary {
            database_path,
            election_id,
            view,
            json,
            watch,
        } => {
            summary(
                &database_path,
                election_id,
                view.request(),
                json,
                watch,
                config,
            )
            .await
        }
        Command::Candidate {
            database_path,
            election_id,
            candidate_id,
            view,
            json,
        } => {
            candidate(
                &database_path,
                election_id,
                candidate_id,
                view.request(),
                json,
                config,
            )
            .await
        }
        Command::Coverage {
            database_path,
            election_id,
            watch,
            json,
        } => coverage(&database_path, election_id, watch, json, &config).await,
    };

    if let Err(e) = outcome {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
