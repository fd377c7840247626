//! Test utilities: record builders with a fixed clock
//!
//! Enabled for this crate's tests and, through the `test-utils` feature, for
//! downstream crates.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::models::{
    BudgetRecord, CategoryRecord, CategoryType, RecurringDefinition, TransactionRecord,
    TransactionType,
};

/// The fixed "now" used across tests: 2026-10-18 12:00
pub fn now() -> NaiveDateTime {
    at(2026, 10, 18, 12)
}

/// A timestamp on the given day and hour
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid test timestamp")
}

pub fn category(id: &str, name: &str, category_type: CategoryType) -> CategoryRecord {
    CategoryRecord {
        id: id.to_string(),
        name: name.to_string(),
        category_type,
        icon: None,
        color: None,
    }
}

/// A transaction at an explicit timestamp
pub fn tx_at(
    id: &str,
    transaction_type: TransactionType,
    description: &str,
    amount: f64,
    category_id: Option<&str>,
    date: NaiveDateTime,
) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        transaction_type,
        amount,
        description: description.to_string(),
        date: Some(date),
        category_id: category_id.map(str::to_string),
    }
}

/// An expense `days_ago` whole days before [`now`]
pub fn expense(
    id: &str,
    description: &str,
    amount: f64,
    category_id: Option<&str>,
    days_ago: i64,
) -> TransactionRecord {
    tx_at(
        id,
        TransactionType::Expense,
        description,
        amount,
        category_id,
        now() - Duration::days(days_ago),
    )
}

/// An expense at an explicit timestamp
pub fn expense_at(
    id: &str,
    amount: f64,
    category_id: Option<&str>,
    date: NaiveDateTime,
) -> TransactionRecord {
    tx_at(id, TransactionType::Expense, "", amount, category_id, date)
}

/// `count` expenses of `amount` each, spread over consecutive days of a month
pub fn month_of_expenses(
    prefix: &str,
    year: i32,
    month: u32,
    count: u32,
    amount: f64,
    category_id: Option<&str>,
) -> Vec<TransactionRecord> {
    (0..count)
        .map(|i| {
            expense_at(
                &format!("{prefix}-{year}-{month}-{i}"),
                amount,
                category_id,
                at(year, month, 1 + (i % 28), 10),
            )
        })
        .collect()
}

pub fn budget(category_id: Option<&str>, amount: f64) -> BudgetRecord {
    BudgetRecord {
        category_id: category_id.map(str::to_string),
        amount,
        month: None,
        year: None,
    }
}

pub fn recurring(category_id: Option<&str>, amount: f64, description: &str) -> RecurringDefinition {
    RecurringDefinition {
        category_id: category_id.map(str::to_string),
        amount,
        description: description.to_string(),
        is_active: true,
    }
}
