//! Threshold configuration for the insight analyzers
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path, or the override in the data dir
//!    (~/.local/share/spendsight/config/insights.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Override files may be partial; every missing key keeps its default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/insights.toml");

/// All analyzer thresholds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub suggestions: SuggestionConfig,
    pub savings: SavingsConfig,
    pub anomalies: AnomalyConfig,
    pub forecast: ForecastConfig,
}

/// Category suggestion thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub max_suggestions: usize,
    /// Categories must score above this to be suggested
    pub min_score: f64,
    /// Time constant of the recency decay, in days
    pub recency_time_constant_days: f64,
    pub exact_similarity: f64,
    pub high_similarity: f64,
    pub partial_similarity: f64,
    /// Relative amount tolerance for an exact description match
    pub exact_amount_tolerance: f64,
    /// Relative amount tolerance for a close amount
    pub close_amount_tolerance: f64,
    /// Absolute difference below which two amounts are equal
    pub exact_amount_epsilon: f64,
    pub category_name_similarity: f64,
    pub recurring_min_days: usize,
    pub recurring_min_occurrences: usize,
    /// Usage count above which an unmatched category is penalized
    pub generic_usage_threshold: usize,
    pub generic_penalty_per_use: f64,
    /// Confidence at which a caller may apply a suggestion without asking
    pub auto_apply_confidence: f64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            min_score: 2.0,
            recency_time_constant_days: 60.0,
            exact_similarity: 0.85,
            high_similarity: 0.75,
            partial_similarity: 0.5,
            exact_amount_tolerance: 0.10,
            close_amount_tolerance: 0.15,
            exact_amount_epsilon: 0.01,
            category_name_similarity: 0.6,
            recurring_min_days: 10,
            recurring_min_occurrences: 15,
            generic_usage_threshold: 20,
            generic_penalty_per_use: 0.5,
            auto_apply_confidence: 0.8,
        }
    }
}

/// Savings recommendation thresholds (amounts in currency units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsConfig {
    pub max_recommendations: usize,
    /// Budget usage (percent) at which a budget counts as approaching
    pub approaching_budget_percent: f64,
    pub high_spending_min: f64,
    pub high_spending_high_priority: f64,
    pub high_spending_savings_rate: f64,
    pub increase_min_previous: f64,
    pub increase_min_percent: f64,
    pub increase_min_current: f64,
    pub increase_high_priority_percent: f64,
    pub many_small_min_count: usize,
    pub many_small_max_average: f64,
    pub many_small_savings_rate: f64,
    pub recurring_min_amount: f64,
    pub recurring_overrun_ratio: f64,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 8,
            approaching_budget_percent: 80.0,
            high_spending_min: 200.0,
            high_spending_high_priority: 1000.0,
            high_spending_savings_rate: 0.2,
            increase_min_previous: 50.0,
            increase_min_percent: 80.0,
            increase_min_current: 300.0,
            increase_high_priority_percent: 150.0,
            many_small_min_count: 15,
            many_small_max_average: 40.0,
            many_small_savings_rate: 0.15,
            recurring_min_amount: 50.0,
            recurring_overrun_ratio: 1.3,
        }
    }
}

/// Anomaly detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub max_anomalies: usize,
    /// Fixed denominator for the daily baseline
    pub baseline_days: f64,
    pub daily_medium_multiplier: f64,
    pub daily_high_multiplier: f64,
    pub max_day_transactions: usize,
    /// Categories need more than this many historical expenses for a baseline
    pub category_min_history: usize,
    pub single_medium_multiplier: f64,
    pub single_high_multiplier: f64,
    /// Unusual-hour window, `[start, end)` in local hours
    pub unusual_hour_start: u32,
    pub unusual_hour_end: u32,
    pub unusual_hour_min_amount: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            max_anomalies: 10,
            baseline_days: 60.0,
            daily_medium_multiplier: 3.0,
            daily_high_multiplier: 5.0,
            max_day_transactions: 5,
            category_min_history: 5,
            single_medium_multiplier: 5.0,
            single_high_multiplier: 10.0,
            unusual_hour_start: 2,
            unusual_hour_end: 5,
            unusual_hour_min_amount: 100.0,
        }
    }
}

/// Expense forecast thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub min_transactions: usize,
    pub min_months: usize,
    /// Complete months before the current one that feed the model
    pub history_months: u32,
    /// Months per side of the trend comparison
    pub trend_window: usize,
    /// Largest trend applied per forecast month (fraction)
    pub max_trend_step: f64,
    /// Trend percentage beyond which a month is labeled increasing/decreasing
    pub trend_label_threshold: f64,
    /// Scale of the variance jitter relative to the coefficient of variation
    pub variance_scale: f64,
    pub confidence_step: f64,
    pub min_confidence: f64,
    pub breakdown_categories: usize,
    pub default_months_ahead: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_transactions: 10,
            min_months: 2,
            history_months: 6,
            trend_window: 3,
            max_trend_step: 0.10,
            trend_label_threshold: 5.0,
            variance_scale: 0.05,
            confidence_step: 0.15,
            min_confidence: 0.3,
            breakdown_categories: 5,
            default_months_ahead: 3,
        }
    }
}

impl InsightsConfig {
    /// Load configuration (explicit path or override first, then default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match resolve_config_path(override_path) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading insights config");
                fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?
            }
            None => DEFAULT_CONFIG.to_string(),
        };

        Self::parse(&content)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Render the effective config as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to render config: {}", e)))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendsight").join("config").join("insights.toml"))
}

/// The file that [`InsightsConfig::load`] would read, if any
///
/// An explicit path that does not exist is an error at load time rather than a
/// silent fallback, since the caller asked for it by name.
pub fn resolve_config_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }
    default_config_path().filter(|p| p.exists())
}
