//! Expense Forecaster
//!
//! Projects monthly expense totals from recent complete months:
//! - Recency-weighted average of monthly totals
//! - Trend between the latest months and the ones before them
//! - Bounded jitter scaled by how volatile the history is
//!
//! The jitter comes from a [`VarianceSource`] so callers can pick between a
//! flat trend line and a reproducible pseudo-random spread.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::calendar::MonthKey;
use crate::config::ForecastConfig;
use crate::error::Result;
use crate::models::{RecurringDefinition, TransactionRecord};

use super::engine::{AnalysisContext, Insight};
use super::round_to;
use super::types::{
    CategoryForecast, ExpenseForecast, Finding, ForecastMonth, InsightType, MonthlyTotal,
    Severity, TrendDirection,
};

/// Supplies the jitter sample for a forecast month
pub trait VarianceSource {
    /// A value in `[-1, 1]` for the target month
    fn sample(&self, month: MonthKey) -> f64;
}

/// No jitter: forecasts follow the trend line exactly
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariance;

impl VarianceSource for NoVariance {
    fn sample(&self, _month: MonthKey) -> f64 {
        0.0
    }
}

/// Deterministic jitter from a SHA-256 digest of a seed and the target month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededVariance {
    seed: u64,
}

impl SeededVariance {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed derived from the analysis time, so a given run is reproducible
    pub fn from_now(now: NaiveDateTime) -> Self {
        Self::new(now.and_utc().timestamp() as u64)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl VarianceSource for SeededVariance {
    fn sample(&self, month: MonthKey) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(month.label().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let unit = u64::from_le_bytes(bytes) as f64 / u64::MAX as f64;
        (unit * 2.0 - 1.0).clamp(-1.0, 1.0)
    }
}

/// Builds expense forecasts
#[derive(Debug, Clone, Default)]
pub struct ExpenseForecaster {
    config: ForecastConfig,
}

impl ExpenseForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Recency-weighted mean; `totals` is most recent first
    fn weighted_average(totals: &[f64]) -> f64 {
        let n = totals.len();
        let (sum, weights) = totals
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, weights), (i, total)| {
                let w = (n - i) as f64;
                (sum + total * w, weights + w)
            });
        if weights > 0.0 {
            sum / weights
        } else {
            0.0
        }
    }

    /// Percent change between the latest window and the one before it
    fn trend_percentage(&self, totals: &[f64]) -> f64 {
        let window = self.config.trend_window.max(1);
        let mean = |slice: &[f64]| {
            if slice.is_empty() {
                None
            } else {
                Some(slice.iter().sum::<f64>() / slice.len() as f64)
            }
        };

        let recent = mean(&totals[..totals.len().min(window)]);
        let older = totals
            .get(window..totals.len().min(window * 2))
            .and_then(mean);

        match (recent, older) {
            (Some(recent), Some(older)) if older > 0.0 => (recent - older) / older * 100.0,
            _ => 0.0,
        }
    }

    pub fn forecast(
        &self,
        historical: &[TransactionRecord],
        recurring: &[RecurringDefinition],
        now: NaiveDateTime,
        months_ahead: u32,
        variance: &dyn VarianceSource,
    ) -> ExpenseForecast {
        let cfg = &self.config;

        let expenses: Vec<&TransactionRecord> = historical
            .iter()
            .filter(|t| t.is_expense() && t.date.is_some_and(|d| d <= now))
            .collect();
        let month_count = expenses
            .iter()
            .filter_map(|t| t.date.map(MonthKey::of))
            .collect::<BTreeSet<_>>()
            .len();

        let mut result = ExpenseForecast {
            has_enough_data: false,
            min_transactions: cfg.min_transactions,
            min_months: cfg.min_months,
            transaction_count: expenses.len(),
            month_count,
            weighted_average: 0.0,
            trend_percentage: 0.0,
            history: Vec::new(),
            forecast: Vec::new(),
        };

        if expenses.len() < cfg.min_transactions || month_count < cfg.min_months {
            debug!(
                transactions = expenses.len(),
                months = month_count,
                "Not enough history to forecast"
            );
            return result;
        }

        // Complete months before the current one, oldest first
        let current = MonthKey::of(now);
        let first = current.add_months(-(cfg.history_months as i32));
        let mut months: BTreeMap<MonthKey, (f64, usize)> = BTreeMap::new();
        let mut categories: BTreeMap<Option<&str>, f64> = BTreeMap::new();
        for tx in &expenses {
            let Some(date) = tx.date else { continue };
            let key = MonthKey::of(date);
            if key < first || key >= current {
                continue;
            }
            let entry = months.entry(key).or_default();
            entry.0 += tx.amount_or_zero();
            entry.1 += 1;
            *categories.entry(tx.category_id.as_deref()).or_default() += tx.amount_or_zero();
        }

        if months.is_empty() {
            debug!("No complete months in the forecast window");
            return result;
        }

        result.history = months
            .iter()
            .map(|(key, (total, count))| MonthlyTotal {
                month: key.label(),
                total: round_to(*total, 2),
                transaction_count: *count,
            })
            .collect();

        let totals: Vec<f64> = months.values().rev().map(|(total, _)| *total).collect();
        let average = Self::weighted_average(&totals);
        let trend = self.trend_percentage(&totals);

        let mean = totals.iter().sum::<f64>() / totals.len() as f64;
        let std_dev = (totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>()
            / totals.len() as f64)
            .sqrt();
        let volatility = if mean > 0.0 { std_dev / mean } else { 0.0 };

        let recurring_total: f64 = recurring
            .iter()
            .filter(|d| d.is_active)
            .map(|d| d.amount)
            .sum();

        let window_total: f64 = categories.values().sum();
        let mut shares: Vec<(Option<&str>, f64)> = categories
            .into_iter()
            .filter(|_| window_total > 0.0)
            .map(|(key, amount)| (key, amount / window_total))
            .collect();
        shares.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        shares.truncate(cfg.breakdown_categories);

        let trend_label = if trend > cfg.trend_label_threshold {
            TrendDirection::Increasing
        } else if trend < -cfg.trend_label_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        let step = (trend / 100.0).clamp(-cfg.max_trend_step, cfg.max_trend_step);

        result.forecast = (1..=months_ahead)
            .map(|k| {
                let month = current.add_months(k as i32);
                let trend_multiplier = 1.0 + step * k as f64;
                let variance_factor =
                    1.0 + variance.sample(month).clamp(-1.0, 1.0) * cfg.variance_scale * volatility;
                let total = (average * trend_multiplier * variance_factor).round();

                ForecastMonth {
                    month: month.label(),
                    month_offset: k,
                    total,
                    trend: trend_label,
                    trend_percentage: round_to(trend, 1),
                    confidence: round_to(
                        (1.0 - cfg.confidence_step * k as f64).max(cfg.min_confidence),
                        2,
                    ),
                    recurring_total: round_to(recurring_total, 2),
                    variance_factor: round_to(variance_factor, 4),
                    categories: shares
                        .iter()
                        .map(|(key, share)| CategoryForecast {
                            category_id: key.map(str::to_string),
                            share: round_to(*share, 4),
                            amount: round_to(total * share, 2),
                        })
                        .collect(),
                }
            })
            .collect();

        result.has_enough_data = true;
        result.weighted_average = round_to(average, 2);
        result.trend_percentage = round_to(trend, 1);

        debug!(
            months = totals.len(),
            weighted_average = result.weighted_average,
            trend = result.trend_percentage,
            months_ahead,
            "Expense forecast complete"
        );

        result
    }
}

impl Insight for ExpenseForecaster {
    fn id(&self) -> InsightType {
        InsightType::ExpenseForecaster
    }

    fn name(&self) -> &'static str {
        "Expense Forecaster"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        // One extra month so the oldest complete month is whole
        let historical = ctx
            .snapshot
            .trailing_months(ctx.now, self.config.history_months + 1);
        let forecast = self.forecast(
            &historical,
            &ctx.snapshot.recurring,
            ctx.now,
            self.config.default_months_ahead,
            &SeededVariance::from_now(ctx.now),
        );

        let Some(next) = forecast.forecast.first() else {
            return Ok(vec![]);
        };

        let severity = match next.trend {
            TrendDirection::Increasing => Severity::Attention,
            _ => Severity::Info,
        };
        let summary = format!(
            "Expected spending next month: about ${:.0} ({}, {:+.1}%)",
            next.total, next.trend, next.trend_percentage
        );
        let detail = format!(
            "Based on {} months of history; ${:.2} of recurring charges",
            forecast.history.len(),
            next.recurring_total
        );
        let key = format!("forecast:{}", next.month);

        Ok(vec![Finding::new(
            InsightType::ExpenseForecaster,
            key,
            severity,
            format!("{}-Month Expense Forecast", forecast.forecast.len()),
            summary,
            ctx.now,
        )
        .with_detail(detail)
        .with_data(serde_json::to_value(&forecast)?)])
    }
}

/// Forecast expenses using the default thresholds
pub fn forecast_expenses(
    historical: &[TransactionRecord],
    recurring: &[RecurringDefinition],
    now: NaiveDateTime,
    months_ahead: u32,
    variance: &dyn VarianceSource,
) -> ExpenseForecast {
    ExpenseForecaster::new().forecast(historical, recurring, now, months_ahead, variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, expense_at, month_of_expenses, now, recurring};

    /// Ten expenses per month, April through September 2026
    fn history(per_month: &[f64]) -> Vec<TransactionRecord> {
        per_month
            .iter()
            .enumerate()
            .flat_map(|(i, total)| {
                month_of_expenses("m", 2026, 4 + i as u32, 10, total / 10.0, Some("general"))
            })
            .collect()
    }

    #[test]
    fn test_not_enough_data() {
        let records = vec![
            expense_at("a", 10.0, None, at(2026, 8, 3, 9)),
            expense_at("b", 10.0, None, at(2026, 8, 9, 9)),
            expense_at("c", 10.0, None, at(2026, 9, 3, 9)),
        ];

        let result = forecast_expenses(&records, &[], now(), 3, &NoVariance);

        assert!(!result.has_enough_data);
        assert!(result.forecast.is_empty());
        assert_eq!(result.transaction_count, 3);
        assert_eq!(result.month_count, 2);
        assert_eq!(result.min_transactions, 10);
        assert_eq!(result.min_months, 2);
    }

    #[test]
    fn test_single_month_fails_gate() {
        let records = month_of_expenses("m", 2026, 9, 20, 10.0, None);
        let result = forecast_expenses(&records, &[], now(), 3, &NoVariance);
        assert!(!result.has_enough_data);
        assert_eq!(result.month_count, 1);
    }

    #[test]
    fn test_flat_history_projects_flat() {
        let records = history(&[500.0; 6]);

        let result = forecast_expenses(&records, &[], now(), 3, &NoVariance);

        assert!(result.has_enough_data);
        assert_eq!(result.history.len(), 6);
        assert_eq!(result.history[0].month, "2026-04");
        assert_eq!(result.weighted_average, 500.0);
        let totals: Vec<f64> = result.forecast.iter().map(|m| m.total).collect();
        assert_eq!(totals, vec![500.0, 500.0, 500.0]);
        assert!(result.forecast.iter().all(|m| m.trend == TrendDirection::Stable));
        assert_eq!(result.forecast[0].month, "2026-11");
        assert_eq!(result.forecast[2].month, "2027-01");
    }

    #[test]
    fn test_increasing_trend_is_capped() {
        let records = history(&[100.0, 100.0, 100.0, 200.0, 200.0, 200.0]);

        let result = forecast_expenses(&records, &[], now(), 3, &NoVariance);

        // (200*15 + 100*6) / 21
        assert_eq!(result.weighted_average, 171.43);
        assert_eq!(result.trend_percentage, 100.0);
        let totals: Vec<f64> = result.forecast.iter().map(|m| m.total).collect();
        assert_eq!(totals, vec![189.0, 206.0, 223.0]);
        assert!(result
            .forecast
            .iter()
            .all(|m| m.trend == TrendDirection::Increasing));
    }

    #[test]
    fn test_confidence_non_increasing_with_floor() {
        let records = history(&[300.0, 320.0, 310.0, 330.0, 300.0, 290.0]);

        let result = forecast_expenses(&records, &[], now(), 8, &NoVariance);

        let confidence: Vec<f64> = result.forecast.iter().map(|m| m.confidence).collect();
        assert_eq!(confidence[0], 0.85);
        assert!(confidence.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(*confidence.last().unwrap(), 0.3);
    }

    #[test]
    fn test_current_month_excluded_from_history() {
        let mut records = history(&[400.0; 6]);
        records.extend(month_of_expenses("now", 2026, 10, 10, 500.0, None));

        let result = forecast_expenses(&records, &[], now(), 1, &NoVariance);

        assert_eq!(result.history.len(), 6);
        assert_eq!(result.forecast[0].total, 400.0);
        assert_eq!(result.forecast[0].categories.len(), 1);
    }

    #[test]
    fn test_seeded_variance_is_bounded_and_reproducible() {
        let records = history(&[200.0, 600.0, 200.0, 600.0, 200.0, 600.0]);
        let variance = SeededVariance::new(42);

        let a = forecast_expenses(&records, &[], now(), 6, &variance);
        let b = forecast_expenses(&records, &[], now(), 6, &variance);

        // Volatility is 0.5, so the factor stays within 1 +/- 0.025
        for (x, y) in a.forecast.iter().zip(&b.forecast) {
            assert_eq!(x.total, y.total);
            assert!((x.variance_factor - 1.0).abs() <= 0.025 + 1e-9);
        }
        assert_eq!(SeededVariance::from_now(now()), SeededVariance::from_now(now()));
    }

    #[test]
    fn test_seeded_samples_in_range() {
        let variance = SeededVariance::new(7);
        let start = MonthKey::new(2026, 1).unwrap();
        for i in 0..48 {
            let u = variance.sample(start.add_months(i));
            assert!((-1.0..=1.0).contains(&u));
        }
    }

    #[test]
    fn test_recurring_total_and_breakdown() {
        let mut records = history(&[300.0; 6]);
        records.extend((0..6).map(|i| {
            expense_at(&format!("r{i}"), 100.0, Some("rent"), at(2026, 4 + i, 1, 9))
        }));
        let mut paused = recurring(Some("gym"), 40.0, "Gym");
        paused.is_active = false;
        let defs = vec![recurring(Some("rent"), 100.0, "Rent"), paused];

        let result = forecast_expenses(&records, &defs, now(), 1, &NoVariance);

        let month = &result.forecast[0];
        assert_eq!(month.total, 400.0);
        assert_eq!(month.recurring_total, 100.0);
        assert_eq!(month.categories[0].category_id.as_deref(), Some("general"));
        assert_eq!(month.categories[0].share, 0.75);
        assert_eq!(month.categories[1].amount, 100.0);
    }

    #[test]
    fn test_weighted_average_weights_recent_months() {
        assert_eq!(ExpenseForecaster::weighted_average(&[]), 0.0);
        // Most recent first: (30*2 + 0*1) / 3
        assert_eq!(ExpenseForecaster::weighted_average(&[30.0, 0.0]), 20.0);
    }
}
