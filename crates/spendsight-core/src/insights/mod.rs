//! Insight Engine - Financial Insights over a Snapshot
//!
//! Each analyzer is a pure function of borrowed records and an explicit
//! `now`. They can be called directly or run together through the
//! [`InsightEngine`], which turns their results into [`Finding`]s.
//!
//! ## Analyzers
//!
//! - **Category Suggester** - Ranks categories for a new transaction
//! - **Savings Advisor** - Budget, trend and habit based recommendations
//! - **Anomaly Detector** - Unusual days, transactions and times
//! - **Expense Forecaster** - Projects monthly expenses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spendsight_core::insights::{AnalysisContext, InsightEngine};
//!
//! let engine = InsightEngine::new();
//! let ctx = AnalysisContext::new(&snapshot, now);
//! let findings = engine.analyze_all(&ctx)?;
//! ```

pub mod anomaly_detector;
pub mod category_suggester;
pub mod engine;
pub mod expense_forecaster;
pub mod savings_advisor;
pub mod similarity;
pub mod types;

pub use anomaly_detector::{detect_anomalies, AnomalyDetector};
pub use category_suggester::{suggest_categories, CategorySuggester, SuggestionRequest};
pub use engine::{AnalysisContext, Insight, InsightEngine};
pub use expense_forecaster::{
    forecast_expenses, ExpenseForecaster, NoVariance, SeededVariance, VarianceSource,
};
pub use savings_advisor::{recommend_savings, SavingsAdvisor, SavingsInput};
pub use similarity::similarity;
pub use types::{
    Anomaly, AnomalySeverity, AnomalyType, CategoryForecast, CategorySuggestion, ExpenseForecast,
    Finding, ForecastMonth, InsightType, MatchReason, MonthlyTotal, Priority, RecommendationType,
    SavingsRecommendation, Severity, TrendDirection,
};

/// Round half away from zero to `places` decimals
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.846_153, 2), 3.85);
        assert_eq!(round_to(4.000_000_000_001, 1), 4.0);
        assert_eq!(round_to(-2.25, 1), -2.3);
        assert_eq!(round_to(171.428_571, 2), 171.43);
    }
}
