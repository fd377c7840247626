//! Calendar-month arithmetic shared by the analyzers and snapshot windows

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A calendar month (year + 1-based month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Build a key, returning `None` for a month outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn of(ts: NaiveDateTime) -> Self {
        Self::of_date(ts.date())
    }

    /// Shift by a signed number of months
    pub fn add_months(self, delta: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn previous(self) -> Self {
        self.add_months(-1)
    }

    pub fn next(self) -> Self {
        self.add_months(1)
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(self) -> u32 {
        let next = self.next().first_day();
        (next - self.first_day()).num_days() as u32
    }

    /// Midnight on the first day of the month
    pub fn start(self) -> NaiveDateTime {
        self.first_day().and_time(chrono::NaiveTime::MIN)
    }

    /// `YYYY-MM`
    pub fn label(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Days remaining in the month after `today`
pub fn days_left_in_month(today: NaiveDate) -> u32 {
    MonthKey::of_date(today)
        .days_in_month()
        .saturating_sub(today.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_months_wraps_years() {
        let jan = MonthKey::new(2026, 1).unwrap();
        assert_eq!(jan.previous(), MonthKey::new(2025, 12).unwrap());
        assert_eq!(jan.add_months(-13), MonthKey::new(2024, 12).unwrap());
        assert_eq!(jan.add_months(11), MonthKey::new(2026, 12).unwrap());
        assert_eq!(jan.add_months(12), MonthKey::new(2027, 1).unwrap());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(MonthKey::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(MonthKey::new(2026, 2).unwrap().days_in_month(), 28);
        assert_eq!(MonthKey::new(2026, 12).unwrap().days_in_month(), 31);
        assert_eq!(MonthKey::new(2026, 4).unwrap().days_in_month(), 30);
    }

    #[test]
    fn test_days_left_in_month() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(days_left_in_month(d), 13);
        let last = NaiveDate::from_ymd_opt(2026, 10, 31).unwrap();
        assert_eq!(days_left_in_month(last), 0);
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(MonthKey::new(2026, 0).is_none());
        assert!(MonthKey::new(2026, 13).is_none());
        assert_eq!(MonthKey::new(2026, 3).unwrap().label(), "2026-03");
    }
}
