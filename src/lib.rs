pub mod aggregate;
pub mod analyze;
pub mod cleaner;
pub mod cli;
pub mod columns;
pub mod config;
pub mod counts;
pub mod dedup;
pub mod distribution;
pub mod error;
pub mod header;
pub mod io_utils;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod sheet;
pub mod students;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("markstat", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Parsed command line: {:?}", cli.command);
    match cli.command {
        Commands::Analyze(args) => analyze::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}
