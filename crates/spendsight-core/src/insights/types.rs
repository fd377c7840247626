//! Core types for the Insight Engine

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::TransactionRecord;

/// Types of insights surfaced in the findings feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Ways to reduce spending against budgets and history
    SavingsOpportunity,
    /// Statistically unusual days or transactions
    SpendingAnomaly,
    /// Projected monthly expenses
    ExpenseForecaster,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::SavingsOpportunity => "savings_opportunity",
            InsightType::SpendingAnomaly => "spending_anomaly",
            InsightType::ExpenseForecaster => "expense_forecaster",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "savings_opportunity" => Ok(InsightType::SavingsOpportunity),
            "spending_anomaly" => Ok(InsightType::SpendingAnomaly),
            "expense_forecaster" => Ok(InsightType::ExpenseForecaster),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// Severity level of a finding in the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational - no action needed
    Info,
    /// Worth attention but not urgent
    Attention,
    /// Should be addressed soon
    Warning,
    /// Requires immediate attention
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Attention => "attention",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Attention => 2,
            Severity::Warning => 3,
            Severity::Alert => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A finding produced by an insight analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Type of insight that generated this finding
    pub insight_type: InsightType,
    /// Stable key for deduplication by the caller (e.g., "savings:over_budget:groceries")
    pub key: String,
    pub severity: Severity,
    /// Short title (e.g., "Over Budget")
    pub title: String,
    /// One-line summary
    pub summary: String,
    pub detail: Option<String>,
    /// Analyzer-specific structured data
    pub data: serde_json::Value,
    /// The `now` the analysis ran against
    pub detected_at: NaiveDateTime,
}

impl Finding {
    pub fn new(
        insight_type: InsightType,
        key: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        summary: impl Into<String>,
        detected_at: NaiveDateTime,
    ) -> Self {
        Self {
            insight_type,
            key: key.into(),
            severity,
            title: title.into(),
            summary: summary.into(),
            detail: None,
            data: serde_json::Value::Null,
            detected_at,
        }
    }

    /// Add optional detail text
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Add structured data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

// -----------------------------------------------------------------------------
// Category suggestions
// -----------------------------------------------------------------------------

/// Why a category scored, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactMatch,
    SimilarDescription,
    PartialMatch,
    ExactAmount,
    SimilarAmount,
    CategoryNameMatch,
    RecurringPattern,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::ExactMatch => "exact_match",
            MatchReason::SimilarDescription => "similar_description",
            MatchReason::PartialMatch => "partial_match",
            MatchReason::ExactAmount => "exact_amount",
            MatchReason::SimilarAmount => "similar_amount",
            MatchReason::CategoryNameMatch => "category_name_match",
            MatchReason::RecurringPattern => "recurring_pattern",
        }
    }

    /// Reasons that tie a category to this particular query
    pub fn is_specific(&self) -> bool {
        matches!(
            self,
            MatchReason::ExactMatch
                | MatchReason::SimilarDescription
                | MatchReason::ExactAmount
                | MatchReason::CategoryNameMatch
        )
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ranked category suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySuggestion {
    pub category_id: String,
    pub category_name: String,
    /// `min(score / 100, 1)`
    pub confidence: f64,
    pub score: f64,
    pub reasons: Vec<MatchReason>,
    /// Mean amount of this category's history, whole units
    pub avg_amount: f64,
    pub usage_count: usize,
    pub matched_description: Option<String>,
    pub matched_amount: Option<f64>,
}

// -----------------------------------------------------------------------------
// Savings recommendations
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Numeric rank for sorting (higher = more urgent)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    OverBudget,
    ApproachingBudget,
    HighSpending,
    SpendingIncrease,
    ManySmall,
    RecurringExceeded,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::OverBudget => "over_budget",
            RecommendationType::ApproachingBudget => "approaching_budget",
            RecommendationType::HighSpending => "high_spending",
            RecommendationType::SpendingIncrease => "spending_increase",
            RecommendationType::ManySmall => "many_small",
            RecommendationType::RecurringExceeded => "recurring_exceeded",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A prioritized savings recommendation
///
/// Fields beyond the common core are only set by the rules that compute them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsRecommendation {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    /// `None` for the uncategorized bucket or an overall budget
    pub category_id: Option<String>,
    pub priority: Priority,
    pub potential_savings: f64,
    pub current_spend: f64,
    pub historical_monthly_average: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_spend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over_budget_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_transaction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_amount: Option<f64>,
}

impl SavingsRecommendation {
    pub fn new(
        recommendation_type: RecommendationType,
        category_id: Option<String>,
        priority: Priority,
        potential_savings: f64,
        current_spend: f64,
    ) -> Self {
        Self {
            recommendation_type,
            category_id,
            priority,
            potential_savings,
            current_spend,
            historical_monthly_average: 0.0,
            message: String::new(),
            previous_spend: None,
            budget_amount: None,
            percent_used: None,
            over_budget_percentage: None,
            days_left: None,
            daily_limit: None,
            percent_change: None,
            transaction_count: None,
            average_transaction: None,
            expected_amount: None,
        }
    }
}

// -----------------------------------------------------------------------------
// Anomalies
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl AnomalySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalySeverity::Low => "low",
            AnomalySeverity::Medium => "medium",
            AnomalySeverity::High => "high",
        }
    }

    /// Numeric rank for sorting (higher = more severe)
    pub fn rank(&self) -> u8 {
        match self {
            AnomalySeverity::Low => 1,
            AnomalySeverity::Medium => 2,
            AnomalySeverity::High => 3,
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    HighDailySpending,
    UnusualTransaction,
    UnusualTime,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::HighDailySpending => "high_daily_spending",
            AnomalyType::UnusualTransaction => "unusual_transaction",
            AnomalyType::UnusualTime => "unusual_time",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unusual day or transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub date: NaiveDate,
    /// Day total or transaction amount
    pub amount: f64,
    /// Baseline the amount was compared against, when there is one
    pub expected_amount: Option<f64>,
    pub category_id: Option<String>,
    pub message: String,
    /// Contributing transactions (one for single-transaction anomalies)
    pub transactions: Vec<TransactionRecord>,
}

// -----------------------------------------------------------------------------
// Forecasts
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expense total for one historical month
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total: f64,
    pub transaction_count: usize,
}

/// Projected share of a category within a forecast month
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForecast {
    pub category_id: Option<String>,
    /// Fraction of historical spend, 0..1
    pub share: f64,
    pub amount: f64,
}

/// One projected month
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastMonth {
    /// `YYYY-MM`
    pub month: String,
    /// 1 for next month
    pub month_offset: u32,
    pub total: f64,
    pub trend: TrendDirection,
    pub trend_percentage: f64,
    pub confidence: f64,
    /// Sum of active recurring definitions, for breakdown only
    pub recurring_total: f64,
    pub variance_factor: f64,
    pub categories: Vec<CategoryForecast>,
}

/// Forecast result, including the data-sufficiency gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseForecast {
    pub has_enough_data: bool,
    pub min_transactions: usize,
    pub min_months: usize,
    pub transaction_count: usize,
    pub month_count: usize,
    pub weighted_average: f64,
    pub trend_percentage: f64,
    pub history: Vec<MonthlyTotal>,
    pub forecast: Vec<ForecastMonth>,
}
