//! Spending Anomalies
//!
//! Compares recent expenses with a historical baseline and flags:
//! - Days whose total is a multiple of the average day
//! - Single transactions far above their category's average
//! - Sizable purchases in the small hours

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::config::AnomalyConfig;
use crate::error::Result;
use crate::models::TransactionRecord;

use super::engine::{AnalysisContext, Insight};
use super::round_to;
use super::types::{Anomaly, AnomalySeverity, AnomalyType, Finding, InsightType, Severity};

/// Days counted as recent when run from the engine
const RECENT_DAYS: i64 = 30;

/// Flags unusual days and transactions
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Average daily spend over the fixed baseline window
    pub fn daily_average(&self, historical: &[TransactionRecord]) -> f64 {
        let total: f64 = historical
            .iter()
            .filter(|t| t.is_expense())
            .map(TransactionRecord::amount_or_zero)
            .sum();
        if self.config.baseline_days > 0.0 {
            total / self.config.baseline_days
        } else {
            0.0
        }
    }

    pub fn detect(
        &self,
        recent: &[TransactionRecord],
        historical: &[TransactionRecord],
        now: NaiveDateTime,
    ) -> Vec<Anomaly> {
        let cfg = &self.config;

        let in_window: Vec<&TransactionRecord> = recent
            .iter()
            .filter(|t| t.date.is_some_and(|d| d <= now))
            .collect();
        let recent: Vec<&TransactionRecord> =
            in_window.iter().copied().filter(|t| t.is_expense()).collect();

        let mut anomalies = Vec::new();
        self.detect_high_days(&recent, historical, &mut anomalies);
        self.detect_unusual_transactions(&recent, historical, &mut anomalies);

        // Unusual time of day, any transaction type
        for tx in &in_window {
            let Some(hour) = tx.hour() else { continue };
            let amount = tx.amount_or_zero();
            if hour < cfg.unusual_hour_start
                || hour >= cfg.unusual_hour_end
                || amount <= cfg.unusual_hour_min_amount
            {
                continue;
            }
            let Some(date) = tx.day() else { continue };
            anomalies.push(Anomaly {
                anomaly_type: AnomalyType::UnusualTime,
                severity: AnomalySeverity::Low,
                date,
                amount,
                expected_amount: None,
                category_id: tx.category_id.clone(),
                message: format!(
                    "${:.2} {} at {:02}:00 on \"{}\"",
                    amount, tx.transaction_type, hour, tx.description
                ),
                transactions: vec![(*tx).clone()],
            });
        }

        // Stable: rule order is kept within a severity
        anomalies.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
        let found = anomalies.len();
        anomalies.truncate(cfg.max_anomalies);

        debug!(
            recent = recent.len(),
            historical = historical.len(),
            found,
            returned = anomalies.len(),
            "Anomaly detection complete"
        );

        anomalies
    }

    fn detect_high_days(
        &self,
        recent: &[&TransactionRecord],
        historical: &[TransactionRecord],
        out: &mut Vec<Anomaly>,
    ) {
        let cfg = &self.config;
        let average = self.daily_average(historical);
        if average <= 0.0 {
            debug!("No historical baseline, skipping daily spending check");
            return;
        }

        let mut days: BTreeMap<NaiveDate, Vec<&TransactionRecord>> = BTreeMap::new();
        for tx in recent {
            if let Some(day) = tx.day() {
                days.entry(day).or_default().push(*tx);
            }
        }

        for (date, mut txs) in days {
            let total: f64 = txs.iter().map(|t| t.amount_or_zero()).sum();
            if total <= average * cfg.daily_medium_multiplier {
                continue;
            }

            let severity = if total > average * cfg.daily_high_multiplier {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            };
            txs.sort_by(|a, b| {
                b.amount_or_zero()
                    .partial_cmp(&a.amount_or_zero())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let count = txs.len();
            out.push(Anomaly {
                anomaly_type: AnomalyType::HighDailySpending,
                severity,
                date,
                amount: round_to(total, 2),
                expected_amount: Some(round_to(average, 2)),
                category_id: None,
                message: format!(
                    "${:.2} spent on {} across {} transactions, {:.1}x the daily average",
                    total,
                    date,
                    count,
                    total / average
                ),
                transactions: txs
                    .into_iter()
                    .take(cfg.max_day_transactions)
                    .cloned()
                    .collect(),
            });
        }
    }

    fn detect_unusual_transactions(
        &self,
        recent: &[&TransactionRecord],
        historical: &[TransactionRecord],
        out: &mut Vec<Anomaly>,
    ) {
        let cfg = &self.config;

        let mut per_category: HashMap<Option<&str>, (f64, usize)> = HashMap::new();
        for tx in historical.iter().filter(|t| t.is_expense()) {
            let entry = per_category.entry(tx.category_id.as_deref()).or_default();
            entry.0 += tx.amount_or_zero();
            entry.1 += 1;
        }
        let averages: HashMap<Option<&str>, f64> = per_category
            .into_iter()
            .filter(|(_, (_, count))| *count > cfg.category_min_history)
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect();

        for tx in recent {
            let Some(&average) = averages.get(&tx.category_id.as_deref()) else {
                continue;
            };
            let amount = tx.amount_or_zero();
            if average <= 0.0 || amount <= average * cfg.single_medium_multiplier {
                continue;
            }
            let Some(date) = tx.day() else { continue };

            let severity = if amount > average * cfg.single_high_multiplier {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            };
            out.push(Anomaly {
                anomaly_type: AnomalyType::UnusualTransaction,
                severity,
                date,
                amount,
                expected_amount: Some(round_to(average, 2)),
                category_id: tx.category_id.clone(),
                message: format!(
                    "\"{}\" for ${:.2} is {:.1}x the usual ${:.2} in {}",
                    tx.description,
                    amount,
                    amount / average,
                    average,
                    tx.category_id.as_deref().unwrap_or("Uncategorized")
                ),
                transactions: vec![(*tx).clone()],
            });
        }
    }
}

impl Insight for AnomalyDetector {
    fn id(&self) -> InsightType {
        InsightType::SpendingAnomaly
    }

    fn name(&self) -> &'static str {
        "Spending Anomaly"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let recent = ctx.snapshot.last_days(ctx.now, RECENT_DAYS);
        let historical = ctx.snapshot.days_before(
            ctx.now,
            RECENT_DAYS,
            self.config.baseline_days.round() as i64,
        );

        self.detect(&recent, &historical, ctx.now)
            .into_iter()
            .map(|anomaly| -> Result<Finding> {
                let severity = match anomaly.severity {
                    AnomalySeverity::High => Severity::Warning,
                    AnomalySeverity::Medium => Severity::Attention,
                    AnomalySeverity::Low => Severity::Info,
                };
                let title = match anomaly.anomaly_type {
                    AnomalyType::HighDailySpending => "High Daily Spending",
                    AnomalyType::UnusualTransaction => "Unusual Transaction",
                    AnomalyType::UnusualTime => "Unusual Time",
                };
                let key = format!(
                    "anomaly:{}:{}:{}",
                    anomaly.anomaly_type,
                    anomaly.date,
                    anomaly.transactions.first().map(|t| t.id.as_str()).unwrap_or_default()
                );

                Ok(Finding::new(
                    InsightType::SpendingAnomaly,
                    key,
                    severity,
                    title,
                    anomaly.message.clone(),
                    ctx.now,
                )
                .with_data(serde_json::to_value(&anomaly)?))
            })
            .collect()
    }
}

/// Detect anomalies using the default thresholds
pub fn detect_anomalies(
    recent: &[TransactionRecord],
    historical: &[TransactionRecord],
    now: NaiveDateTime,
) -> Vec<Anomaly> {
    AnomalyDetector::new().detect(recent, historical, now)
}
