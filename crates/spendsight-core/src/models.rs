//! Domain models for Spendsight
//!
//! These records are owned by the storage layer and handed to the insights
//! engine already fetched. The engine only reads them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which transaction types a category applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    #[default]
    Expense,
    Income,
    Both,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Both => "both",
        }
    }

    /// Whether a category of this type can hold a transaction of `kind`
    pub fn accepts(&self, kind: TransactionType) -> bool {
        match self {
            Self::Both => true,
            Self::Expense => kind == TransactionType::Expense,
            Self::Income => kind == TransactionType::Income,
        }
    }
}

impl std::str::FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "both" => Ok(Self::Both),
            _ => Err(format!("Unknown category type: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single transaction as fetched from storage
///
/// `amount` and `date` are lenient on input: a missing or unparseable amount
/// becomes 0 and a missing or unparseable date becomes `None`. Engines skip
/// undated records wherever a date is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default, deserialize_with = "de_lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de_lenient_timestamp")]
    pub date: Option<NaiveDateTime>,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl TransactionRecord {
    /// Amount coerced to a usable, non-negative value
    pub fn amount_or_zero(&self) -> f64 {
        if self.amount.is_finite() && self.amount > 0.0 {
            self.amount
        } else {
            0.0
        }
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    /// Calendar day of the transaction, if dated
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.map(|d| d.date())
    }

    /// Wall-clock hour of the transaction, if dated
    pub fn hour(&self) -> Option<u32> {
        self.date.map(|d| d.hour())
    }
}

/// A user-defined category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub category_type: CategoryType,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A monthly budget, per category or overall when `category_id` is `None`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecord {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl BudgetRecord {
    /// Whether the budget covers the given month (unscoped budgets cover all)
    pub fn applies_to(&self, year: i32, month: u32) -> bool {
        self.year.map_or(true, |y| y == year) && self.month.map_or(true, |m| m == month)
    }
}

/// A recurring transaction template (rent, subscriptions, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringDefinition {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Parse a timestamp in any of the formats the storage layer emits
///
/// Accepts RFC 3339 (wall-clock time of the given offset is kept), naive
/// ISO-8601 with or without fractional seconds, `YYYY-MM-DD HH:MM:SS`, and a
/// bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse an amount that may arrive as a number, a decimal string, or null
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    /// Epoch milliseconds
    Millis(i64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn de_lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawAmount> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawAmount::Number(n)) if n.is_finite() => n,
        Some(RawAmount::Text(s)) => parse_amount(&s).unwrap_or(0.0),
        _ => 0.0,
    })
}

fn de_lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawTimestamp> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawTimestamp::Millis(ms)) => {
            DateTime::from_timestamp_millis(ms).map(|d| d.naive_utc())
        }
        Some(RawTimestamp::Text(s)) => parse_timestamp(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_transaction_type_round_trip() {
        assert_eq!(TransactionType::from_str("Expense").unwrap(), TransactionType::Expense);
        assert_eq!(TransactionType::Income.as_str(), "income");
        assert!(TransactionType::from_str("refund").is_err());
    }

    #[test]
    fn test_category_type_accepts() {
        assert!(CategoryType::Both.accepts(TransactionType::Income));
        assert!(CategoryType::Expense.accepts(TransactionType::Expense));
        assert!(!CategoryType::Expense.accepts(TransactionType::Income));
        assert!(!CategoryType::Income.accepts(TransactionType::Transfer));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2026-03-14T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-14T09:30:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-14 09:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2026-03-14"),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_lenient_record_deserialization() {
        let json = r#"[
            {"id": "a", "type": "expense", "amount": "18.50", "description": "Coffee",
             "date": "2026-03-14T08:00:00", "categoryId": "cafe"},
            {"id": "b", "type": "expense", "description": "No amount", "date": "not a date"},
            {"id": "c", "type": "income", "amount": null, "date": {"bad": true}}
        ]"#;
        let records: Vec<TransactionRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records.len(), 3);
        assert!((records[0].amount - 18.5).abs() < f64::EPSILON);
        assert_eq!(records[0].category_id.as_deref(), Some("cafe"));
        assert_eq!(records[0].hour(), Some(8));
        assert_eq!(records[1].amount, 0.0);
        assert!(records[1].date.is_none());
        assert!(records[2].description.is_empty());
    }

    #[test]
    fn test_amount_or_zero_coerces() {
        let mut tx: TransactionRecord = serde_json::from_str(
            r#"{"id": "x", "type": "expense", "amount": -5}"#,
        )
        .unwrap();
        assert_eq!(tx.amount_or_zero(), 0.0);
        tx.amount = f64::NAN;
        assert_eq!(tx.amount_or_zero(), 0.0);
        tx.amount = 12.0;
        assert_eq!(tx.amount_or_zero(), 12.0);
    }

    #[test]
    fn test_budget_applies_to() {
        let scoped = BudgetRecord {
            category_id: None,
            amount: 100.0,
            month: Some(3),
            year: Some(2026),
        };
        assert!(scoped.applies_to(2026, 3));
        assert!(!scoped.applies_to(2026, 4));

        let unscoped = BudgetRecord {
            category_id: Some("food".into()),
            amount: 100.0,
            month: None,
            year: None,
        };
        assert!(unscoped.applies_to(2030, 12));
    }

    #[test]
    fn test_recurring_defaults_active() {
        let def: RecurringDefinition =
            serde_json::from_str(r#"{"categoryId": "rent", "amount": 1200}"#).unwrap();
        assert!(def.is_active);
    }
}
