//! In-memory record sets and the history windows the analyzers run over
//!
//! A [`Snapshot`] is what a caller hands to the engines: transactions,
//! categories, budgets and recurring definitions. It can be loaded from a
//! JSON document or, for transactions alone, from a CSV export.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Months, NaiveDateTime, TimeDelta};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::calendar::MonthKey;
use crate::error::{Error, Result};
use crate::models::{
    parse_amount, parse_timestamp, BudgetRecord, CategoryRecord, RecurringDefinition,
    TransactionRecord, TransactionType,
};

/// Everything the engines read, as supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(deserialize_with = "de_transactions_skipping_malformed")]
    pub transactions: Vec<TransactionRecord>,
    pub categories: Vec<CategoryRecord>,
    pub budgets: Vec<BudgetRecord>,
    pub recurring: Vec<RecurringDefinition>,
}

/// Read the transaction list one element at a time, dropping malformed rows
fn de_transactions_skipping_malformed<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<TransactionRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut transactions = Vec::with_capacity(raw.len());

    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<TransactionRecord>(value) {
            Ok(tx) => transactions.push(tx),
            Err(e) => warn!(index, error = %e, "Skipping malformed transaction"),
        }
    }
    Ok(transactions)
}

/// `from` minus `days`, clamped to the earliest representable time
fn days_back(from: NaiveDateTime, days: i64) -> NaiveDateTime {
    TimeDelta::try_days(days)
        .and_then(|delta| from.checked_sub_signed(delta))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Column positions in a transactions CSV, located by header name
struct CsvColumns {
    id: usize,
    kind: usize,
    amount: usize,
    description: Option<usize>,
    date: Option<usize>,
    category_id: Option<usize>,
}

impl CsvColumns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                Error::InvalidData(format!("CSV is missing the '{}' column", name))
            })
        };

        Ok(Self {
            id: require("id")?,
            kind: require("type")?,
            amount: require("amount")?,
            description: find("description"),
            date: find("date"),
            category_id: find("category_id").or_else(|| find("categoryId")),
        })
    }
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl Snapshot {
    /// Parse a JSON snapshot document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(content)?;
        debug!(
            transactions = snapshot.transactions.len(),
            categories = snapshot.categories.len(),
            budgets = snapshot.budgets.len(),
            recurring = snapshot.recurring.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;
        Self::from_json_str(&content)
    }

    /// Read transactions from CSV with columns
    /// `id,type,amount,description,date,category_id`
    ///
    /// Rows with an unknown type are skipped with a warning; a bad amount
    /// becomes 0 and a bad date leaves the record undated.
    pub fn transactions_from_csv<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = CsvColumns::locate(&rdr.headers()?.clone())?;
        let mut transactions = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result?;

            let Some(id) = field(&record, Some(columns.id)) else {
                warn!(row = line + 1, "Skipping CSV row without an id");
                continue;
            };
            let kind = field(&record, Some(columns.kind)).unwrap_or_default();
            let transaction_type: TransactionType = match kind.parse() {
                Ok(t) => t,
                Err(e) => {
                    warn!(row = line + 1, error = %e, "Skipping CSV row");
                    continue;
                }
            };

            transactions.push(TransactionRecord {
                id: id.to_string(),
                transaction_type,
                amount: field(&record, Some(columns.amount))
                    .and_then(parse_amount)
                    .unwrap_or(0.0),
                description: field(&record, columns.description)
                    .unwrap_or_default()
                    .to_string(),
                date: field(&record, columns.date).and_then(parse_timestamp),
                category_id: field(&record, columns.category_id).map(str::to_string),
            });
        }

        debug!("Parsed {} CSV transactions", transactions.len());
        Ok(transactions)
    }

    pub fn transactions_from_csv_file(path: &Path) -> Result<Vec<TransactionRecord>> {
        Self::transactions_from_csv(File::open(path)?)
    }

    /// Append transactions loaded from elsewhere
    pub fn extend_transactions(
        &mut self,
        transactions: impl IntoIterator<Item = TransactionRecord>,
    ) {
        self.transactions.extend(transactions);
    }

    fn dated_between(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
        inclusive: bool,
    ) -> Vec<TransactionRecord> {
        self.transactions
            .iter()
            .filter(|t| {
                t.date.is_some_and(|d| {
                    d >= from && if inclusive { d <= until } else { d < until }
                })
            })
            .cloned()
            .collect()
    }

    /// Records from the start of `now`'s month through `now`
    pub fn current_month(&self, now: NaiveDateTime) -> Vec<TransactionRecord> {
        self.dated_between(MonthKey::of(now).start(), now, true)
    }

    /// Records in the calendar month before `now`'s
    pub fn previous_month(&self, now: NaiveDateTime) -> Vec<TransactionRecord> {
        let current = MonthKey::of(now);
        self.dated_between(current.previous().start(), current.start(), false)
    }

    /// Records from `months` months before `now` through `now`
    pub fn trailing_months(&self, now: NaiveDateTime, months: u32) -> Vec<TransactionRecord> {
        let from = now
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDateTime::MIN);
        self.dated_between(from, now, true)
    }

    /// Records from `days` days before `now` through `now`
    pub fn last_days(&self, now: NaiveDateTime, days: i64) -> Vec<TransactionRecord> {
        self.dated_between(days_back(now, days), now, true)
    }

    /// `days` days of records ending `offset` days before `now`
    pub fn days_before(
        &self,
        now: NaiveDateTime,
        offset: i64,
        days: i64,
    ) -> Vec<TransactionRecord> {
        let until = days_back(now, offset);
        self.dated_between(days_back(until, days), until, false)
    }

    /// Most recent categorized records up to `now`, newest first
    pub fn categorized_history(&self, now: NaiveDateTime, limit: usize) -> Vec<TransactionRecord> {
        let mut history: Vec<TransactionRecord> = self
            .transactions
            .iter()
            .filter(|t| t.category_id.is_some() && t.date.is_some_and(|d| d <= now))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.date.cmp(&a.date));
        history.truncate(limit);
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, expense_at, now};

    fn snapshot() -> Snapshot {
        Snapshot {
            transactions: vec![
                expense_at("oct", 10.0, Some("food"), at(2026, 10, 2, 9)),
                expense_at("oct-late", 10.0, None, at(2026, 10, 25, 9)),
                expense_at("sep", 20.0, Some("food"), at(2026, 9, 30, 23)),
                expense_at("aug", 30.0, Some("fun"), at(2026, 8, 1, 9)),
                expense_at("jul", 40.0, Some("fun"), at(2026, 7, 17, 9)),
            ],
            ..Snapshot::default()
        }
    }

    fn ids(records: &[TransactionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_month_windows() {
        let s = snapshot();
        assert_eq!(ids(&s.current_month(now())), vec!["oct"]);
        assert_eq!(ids(&s.previous_month(now())), vec!["sep"]);
        assert_eq!(ids(&s.trailing_months(now(), 3)), vec!["oct", "sep", "aug"]);
    }

    #[test]
    fn test_day_windows() {
        let s = snapshot();
        assert_eq!(ids(&s.last_days(now(), 30)), vec!["oct", "sep"]);
        // 60 days ending 30 days ago: Jul 20 .. Sep 18
        assert_eq!(ids(&s.days_before(now(), 30, 60)), vec!["aug"]);
        assert_eq!(ids(&s.days_before(now(), 30, 90)), vec!["aug", "jul"]);
        assert!(s.days_before(now(), 30, 20).is_empty());
    }

    #[test]
    fn test_categorized_history_newest_first() {
        let s = snapshot();
        assert_eq!(ids(&s.categorized_history(now(), 3)), vec!["oct", "sep", "aug"]);
    }

    #[test]
    fn test_json_snapshot() {
        let json = r#"{
            "transactions": [
                {
                    "id": "1",
                    "type": "expense",
                    "amount": "12.50",
                    "date": "2026-10-01T08:30:00",
                    "categoryId": "cafe"
                }
            ],
            "budgets": [{"categoryId": "cafe", "amount": 100}]
        }"#;

        let s = Snapshot::from_json_str(json).unwrap();
        assert_eq!(s.transactions[0].amount, 12.5);
        assert_eq!(s.budgets.len(), 1);
        assert!(s.categories.is_empty());
    }

    #[test]
    fn test_json_snapshot_skips_malformed_transactions() {
        let json = r#"{
            "transactions": [
                {"id": "ok", "type": "expense", "amount": 20, "date": "2026-10-01"},
                {"id": "odd", "type": "refund", "amount": 5},
                {"type": "expense", "amount": 7},
                {"id": "untyped", "amount": 9},
                {"id": "late", "type": "income", "amount": 100, "date": "2026-10-03"}
            ],
            "categories": [{"id": "cafe", "name": "Cafe"}]
        }"#;

        let s = Snapshot::from_json_str(json).unwrap();
        assert_eq!(ids(&s.transactions), vec!["ok", "late"]);
        assert_eq!(s.categories.len(), 1);
    }

    #[test]
    fn test_transactions_must_be_a_list() {
        let json = r#"{"transactions": {"id": "1"}}"#;
        assert!(matches!(Snapshot::from_json_str(json), Err(Error::Json(_))));
    }

    #[test]
    fn test_huge_day_windows_clamp() {
        let s = snapshot();
        assert_eq!(s.last_days(now(), 100_000_000).len(), 4);
        assert_eq!(s.last_days(now(), i64::MAX).len(), 4);
        assert!(s.days_before(now(), i64::MAX, 30).is_empty());
        assert_eq!(ids(&s.days_before(now(), 30, i64::MAX)), vec!["aug", "jul"]);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(Snapshot::from_json_str("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_csv_transactions() {
        let csv = "id,type,amount,description,date,category_id\n\
                   1,expense,\"$1,200.00\",Rent,2026-10-01,housing\n\
                   2,income,3000,Salary,2026-10-01 09:00:00,\n\
                   3,refund,5,Odd row,2026-10-02,\n\
                   4,expense,abc,Broken,not a date,misc\n";

        let txs = Snapshot::transactions_from_csv(csv.as_bytes()).unwrap();

        assert_eq!(ids(&txs), vec!["1", "2", "4"]);
        assert_eq!(txs[0].amount, 1200.0);
        assert_eq!(txs[0].category_id.as_deref(), Some("housing"));
        assert_eq!(txs[1].transaction_type, TransactionType::Income);
        assert_eq!(txs[1].category_id, None);
        assert_eq!(txs[2].amount, 0.0);
        assert_eq!(txs[2].date, None);
    }

    #[test]
    fn test_csv_requires_core_columns() {
        let err = Snapshot::transactions_from_csv("id,amount\n1,5\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("'type'"));
    }
}
