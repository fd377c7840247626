//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Longest recent window `anomalies --days` accepts
pub const MAX_RECENT_DAYS: i64 = 3650;

/// Spendsight - Insights from your spending history
#[derive(Parser)]
#[command(name = "spendsight")]
#[command(about = "Category suggestions, savings tips, anomalies and forecasts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Snapshot JSON (transactions, categories, budgets, recurring)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Transactions CSV (id,type,amount,description,date,category_id)
    #[arg(long, global = true)]
    pub csv: Option<PathBuf>,

    /// Threshold config (defaults to the data-dir override, then built-ins)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Reference time for the analysis (defaults to the local clock)
    ///
    /// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or a bare `YYYY-MM-DD`.
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Suggest categories for a transaction
    Suggest {
        /// Transaction description
        description: String,

        /// Transaction amount (omit to match on description only)
        #[arg(short, long)]
        amount: Option<f64>,

        /// Transaction type: expense, income, transfer
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
    },

    /// Recommend ways to save this month
    Savings,

    /// Detect unusual spending
    Anomalies {
        /// Days counted as recent (1 to 3650)
        #[arg(
            short,
            long,
            default_value = "30",
            value_parser = clap::value_parser!(i64).range(1..=MAX_RECENT_DAYS)
        )]
        days: i64,
    },

    /// Forecast monthly expenses
    Forecast {
        /// Months to project (defaults to the config value)
        #[arg(short, long)]
        months: Option<u32>,

        /// Seed for the month-to-month variance
        #[arg(long, conflicts_with = "no_variance")]
        seed: Option<u64>,

        /// Project the plain trend line without variance
        #[arg(long)]
        no_variance: bool,
    },

    /// Run every analyzer and list findings by severity
    Insights,

    /// Show the effective threshold config
    Config {
        /// Print where config is read from instead of its contents
        #[arg(long)]
        path: bool,
    },
}
