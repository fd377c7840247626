//! Spendsight Core Library
//!
//! Insight engines for the Spendsight personal finance app:
//! - Text similarity for transaction descriptions
//! - Category suggestions for new transactions
//! - Savings recommendations against budgets and history
//! - Spending anomaly detection
//! - Monthly expense forecasts
//! - Threshold config with embedded defaults and a user override
//! - Snapshot loading from JSON and CSV
//!
//! Every engine is synchronous and takes the reference time as a parameter;
//! nothing here reads the clock or touches storage.

pub mod calendar;
pub mod config;
pub mod error;
pub mod insights;
pub mod models;
pub mod snapshot;

/// Test utilities: record builders with a fixed clock
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use calendar::MonthKey;
pub use config::InsightsConfig;
pub use error::{Error, Result};
pub use insights::{
    detect_anomalies, forecast_expenses, recommend_savings, similarity, suggest_categories,
    AnalysisContext, Anomaly, AnomalyDetector, CategorySuggester, CategorySuggestion,
    ExpenseForecast, ExpenseForecaster, Finding, Insight, InsightEngine, NoVariance,
    SavingsAdvisor, SavingsRecommendation, SeededVariance, VarianceSource,
};
pub use models::{
    BudgetRecord, CategoryRecord, CategoryType, RecurringDefinition, TransactionRecord,
    TransactionType,
};
pub use snapshot::Snapshot;
