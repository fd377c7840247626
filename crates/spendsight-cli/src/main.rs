//! Spendsight CLI - Personal finance insights
//!
//! Usage:
//!   spendsight --data snapshot.json savings        Savings recommendations
//!   spendsight --csv history.csv suggest "Coffee"  Category suggestions
//!   spendsight --data snapshot.json forecast -m 6  Expense forecast
//!   spendsight --data snapshot.json insights       All findings

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use commands::{InputOptions, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let options = InputOptions {
        data: cli.data.as_deref(),
        csv: cli.csv.as_deref(),
        config: cli.config.as_deref(),
        now: cli.now.as_deref(),
        json: cli.json,
    };

    match cli.command {
        Commands::Config { path } => commands::cmd_config(&options, path),
        Commands::Suggest {
            description,
            amount,
            kind,
        } => commands::cmd_suggest(&Session::load(&options)?, &description, amount, &kind),
        Commands::Savings => commands::cmd_savings(&Session::load(&options)?),
        Commands::Anomalies { days } => commands::cmd_anomalies(&Session::load(&options)?, days),
        Commands::Forecast {
            months,
            seed,
            no_variance,
        } => commands::cmd_forecast(&Session::load(&options)?, months, seed, no_variance),
        Commands::Insights => commands::cmd_insights(&Session::load(&options)?),
    }
}
