//! Shared command plumbing
//!
//! This module contains:
//! - `InputOptions` - The global flags every command reads
//! - `Session` - Snapshot, config and reference time loaded once per run
//! - `cmd_config` - Show the effective threshold config

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use spendsight_core::config::{resolve_config_path, InsightsConfig};
use spendsight_core::models::parse_timestamp;
use spendsight_core::Snapshot;

/// Global flags, borrowed from the parsed CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOptions<'a> {
    pub data: Option<&'a Path>,
    pub csv: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub now: Option<&'a str>,
    pub json: bool,
}

/// Everything a command needs to run an analysis
#[derive(Debug)]
pub struct Session {
    pub snapshot: Snapshot,
    pub config: InsightsConfig,
    pub now: NaiveDateTime,
    pub json: bool,
}

impl Session {
    pub fn load(options: &InputOptions<'_>) -> Result<Self> {
        Ok(Self {
            snapshot: load_snapshot(options.data, options.csv)?,
            config: load_config(options.config)?,
            now: resolve_now(options.now)?,
            json: options.json,
        })
    }
}

/// Load the snapshot JSON and/or transactions CSV
pub fn load_snapshot(data: Option<&Path>, csv: Option<&Path>) -> Result<Snapshot> {
    if data.is_none() && csv.is_none() {
        bail!("No input data: pass --data <snapshot.json> and/or --csv <transactions.csv>");
    }

    let mut snapshot = match data {
        Some(path) => Snapshot::from_json_file(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
        None => Snapshot::default(),
    };

    if let Some(path) = csv {
        let transactions = Snapshot::transactions_from_csv_file(path)
            .with_context(|| format!("Failed to load transactions {}", path.display()))?;
        snapshot.extend_transactions(transactions);
    }

    tracing::debug!(
        transactions = snapshot.transactions.len(),
        categories = snapshot.categories.len(),
        "Input loaded"
    );
    Ok(snapshot)
}

pub fn load_config(path: Option<&Path>) -> Result<InsightsConfig> {
    InsightsConfig::load(path).context("Failed to load insights config")
}

/// Parse `--now`, falling back to the local wall clock
pub fn resolve_now(now: Option<&str>) -> Result<NaiveDateTime> {
    match now {
        Some(raw) => parse_timestamp(raw)
            .with_context(|| format!("Invalid --now value '{}'", raw)),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

/// Render a value as the pretty JSON `--json` prints
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

pub fn cmd_config(options: &InputOptions<'_>, show_path: bool) -> Result<()> {
    if show_path {
        match resolve_config_path(options.config) {
            Some(path) => println!("{}", path.display()),
            None => println!("(built-in defaults)"),
        }
        return Ok(());
    }

    let config = load_config(options.config)?;
    if options.json {
        return print_json(&config);
    }
    print!("{}", config.to_toml_string()?);
    Ok(())
}
