//! Savings Recommendations
//!
//! Cross-references this month's spending with the previous month, the
//! trailing history, budgets and recurring definitions:
//! - Budgets that are exceeded or nearly used up
//! - Large unbudgeted categories
//! - Sharp month-over-month increases
//! - Many small purchases adding up
//! - Recurring charges running over their expected amount

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::calendar::{days_left_in_month, MonthKey};
use crate::config::SavingsConfig;
use crate::error::Result;
use crate::models::{BudgetRecord, RecurringDefinition, TransactionRecord};

use super::engine::{AnalysisContext, Insight};
use super::round_to;
use super::types::{
    Finding, InsightType, Priority, RecommendationType, SavingsRecommendation, Severity,
};

/// Months of history behind `historicalMonthlyAverage`
const TRAILING_MONTHS: u32 = 3;

type CategoryKey = Option<String>;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    amount: f64,
    count: usize,
}

/// Per-category expense totals; the `None` key is the uncategorized bucket
fn aggregate(records: &[TransactionRecord]) -> BTreeMap<CategoryKey, Totals> {
    let mut totals: BTreeMap<CategoryKey, Totals> = BTreeMap::new();
    for tx in records.iter().filter(|t| t.is_expense() && t.date.is_some()) {
        let entry = totals.entry(tx.category_id.clone()).or_default();
        entry.amount += tx.amount_or_zero();
        entry.count += 1;
    }
    totals
}

fn label(category: &CategoryKey) -> &str {
    category.as_deref().unwrap_or("Uncategorized")
}

/// Record sets a savings analysis runs over
#[derive(Debug, Clone, Copy)]
pub struct SavingsInput<'a> {
    pub current_month: &'a [TransactionRecord],
    pub previous_month: &'a [TransactionRecord],
    /// Roughly three months of history
    pub trailing: &'a [TransactionRecord],
    pub budgets: &'a [BudgetRecord],
    pub recurring: &'a [RecurringDefinition],
}

/// Produces prioritized savings recommendations
#[derive(Debug, Clone, Default)]
pub struct SavingsAdvisor {
    config: SavingsConfig,
}

impl SavingsAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SavingsConfig) -> Self {
        Self { config }
    }

    pub fn recommend(
        &self,
        input: &SavingsInput<'_>,
        now: NaiveDateTime,
    ) -> Vec<SavingsRecommendation> {
        let cfg = &self.config;

        let actual_months = input
            .trailing
            .iter()
            .filter(|t| t.is_expense())
            .filter_map(|t| t.date.map(MonthKey::of))
            .collect::<BTreeSet<_>>()
            .len()
            .max(1) as f64;

        let current = aggregate(input.current_month);
        let previous = aggregate(input.previous_month);
        let trailing = aggregate(input.trailing);

        let total_current: f64 = current.values().map(|t| t.amount).sum();
        let total_trailing: f64 = trailing.values().map(|t| t.amount).sum();
        let spend_of = |map: &BTreeMap<CategoryKey, Totals>, key: &CategoryKey| {
            map.get(key).map(|t| t.amount).unwrap_or(0.0)
        };
        let monthly_average =
            |key: &CategoryKey| round_to(spend_of(&trailing, key) / actual_months, 2);

        let mut recommendations: Vec<SavingsRecommendation> = Vec::new();
        let mut budgeted: HashSet<String> = HashSet::new();
        let mut flagged: HashSet<CategoryKey> = HashSet::new();

        // 1. Budgets
        let month = MonthKey::of(now);
        for budget in input
            .budgets
            .iter()
            .filter(|b| b.amount > 0.0 && b.applies_to(month.year, month.month))
        {
            let key = budget.category_id.clone();
            let (spend, historical) = match &key {
                Some(id) => {
                    budgeted.insert(id.clone());
                    (spend_of(&current, &key), monthly_average(&key))
                }
                None => (total_current, round_to(total_trailing / actual_months, 2)),
            };
            let name = key.as_deref().unwrap_or("Overall");
            let percent_used = spend / budget.amount * 100.0;

            let rec = if percent_used > 100.0 {
                let overage = spend - budget.amount;
                let over_pct = round_to(percent_used - 100.0, 1);
                let mut rec = SavingsRecommendation::new(
                    RecommendationType::OverBudget,
                    key.clone(),
                    Priority::High,
                    round_to(overage, 2),
                    round_to(spend, 2),
                );
                rec.over_budget_percentage = Some(over_pct);
                rec.message = format!(
                    "{} is {:.0}% over its ${:.0} budget (${:.2} over)",
                    name, over_pct, budget.amount, overage
                );
                rec
            } else if percent_used >= cfg.approaching_budget_percent {
                let remaining = budget.amount - spend;
                let days_left = days_left_in_month(now.date());
                let mut rec = SavingsRecommendation::new(
                    RecommendationType::ApproachingBudget,
                    key.clone(),
                    Priority::High,
                    0.0,
                    round_to(spend, 2),
                );
                rec.days_left = Some(days_left);
                rec.daily_limit =
                    (days_left > 0).then(|| round_to(remaining / days_left as f64, 2));
                rec.message = match rec.daily_limit {
                    Some(limit) => format!(
                        "{} has used {:.0}% of its budget; keep to ${:.2}/day for the next {} days",
                        name, percent_used, limit, days_left
                    ),
                    None => format!(
                        "{} has used {:.0}% of its budget with ${:.2} left",
                        name, percent_used, remaining
                    ),
                };
                rec
            } else {
                continue;
            };

            let mut rec = rec;
            rec.budget_amount = Some(budget.amount);
            rec.percent_used = Some(round_to(percent_used, 1));
            rec.historical_monthly_average = historical;
            if key.is_some() {
                flagged.insert(key);
            }
            recommendations.push(rec);
        }

        // 2. High spending in unbudgeted categories
        for (key, totals) in &current {
            if key.as_ref().is_some_and(|id| budgeted.contains(id)) {
                continue;
            }
            if totals.amount <= cfg.high_spending_min {
                continue;
            }

            let priority = if totals.amount > cfg.high_spending_high_priority {
                Priority::High
            } else {
                Priority::Medium
            };
            let mut rec = SavingsRecommendation::new(
                RecommendationType::HighSpending,
                key.clone(),
                priority,
                round_to(totals.amount * cfg.high_spending_savings_rate, 2),
                round_to(totals.amount, 2),
            );
            let prev = spend_of(&previous, key);
            if prev > 0.0 {
                rec.previous_spend = Some(round_to(prev, 2));
                rec.percent_change = Some(round_to((totals.amount - prev) / prev * 100.0, 1));
            }
            rec.historical_monthly_average = monthly_average(key);
            rec.message = format!(
                "${:.0} spent on {} this month; trimming 20% would save ${:.0}",
                totals.amount,
                label(key),
                rec.potential_savings
            );
            flagged.insert(key.clone());
            recommendations.push(rec);
        }

        // 3. Month-over-month increases
        for (key, prev) in &previous {
            if prev.amount < cfg.increase_min_previous || flagged.contains(key) {
                continue;
            }
            let cur = spend_of(&current, key);
            let increase = (cur - prev.amount) / prev.amount * 100.0;
            if increase <= cfg.increase_min_percent || cur <= cfg.increase_min_current {
                continue;
            }

            let priority = if increase > cfg.increase_high_priority_percent {
                Priority::High
            } else {
                Priority::Medium
            };
            let mut rec = SavingsRecommendation::new(
                RecommendationType::SpendingIncrease,
                key.clone(),
                priority,
                round_to(cur - prev.amount, 2),
                round_to(cur, 2),
            );
            rec.previous_spend = Some(round_to(prev.amount, 2));
            rec.percent_change = Some(round_to(increase, 1));
            rec.historical_monthly_average = monthly_average(key);
            rec.message = format!(
                "{} spending is up {:.0}% from last month (${:.0} vs ${:.0})",
                label(key),
                increase,
                cur,
                prev.amount
            );
            flagged.insert(key.clone());
            recommendations.push(rec);
        }

        // 4. Many small purchases
        for (key, totals) in &current {
            if totals.count <= cfg.many_small_min_count {
                continue;
            }
            let average = totals.amount / totals.count as f64;
            if average >= cfg.many_small_max_average {
                continue;
            }

            let mut rec = SavingsRecommendation::new(
                RecommendationType::ManySmall,
                key.clone(),
                Priority::Medium,
                round_to(totals.amount * cfg.many_small_savings_rate, 2),
                round_to(totals.amount, 2),
            );
            rec.transaction_count = Some(totals.count);
            rec.average_transaction = Some(round_to(average, 2));
            rec.historical_monthly_average = monthly_average(key);
            rec.message = format!(
                "{} small purchases in {} averaging ${:.2} add up to ${:.0}",
                totals.count,
                label(key),
                average,
                totals.amount
            );
            flagged.insert(key.clone());
            recommendations.push(rec);
        }

        // 5. Recurring charges over their expected amount
        for def in input
            .recurring
            .iter()
            .filter(|d| d.is_active && d.amount > cfg.recurring_min_amount)
        {
            let key = def.category_id.clone();
            if flagged.contains(&key) {
                continue;
            }
            let actual = spend_of(&current, &key);
            if actual <= def.amount * cfg.recurring_overrun_ratio {
                continue;
            }

            let mut rec = SavingsRecommendation::new(
                RecommendationType::RecurringExceeded,
                key.clone(),
                Priority::Medium,
                round_to(actual - def.amount, 2),
                round_to(actual, 2),
            );
            rec.expected_amount = Some(def.amount);
            rec.historical_monthly_average = monthly_average(&key);
            rec.message = format!(
                "{} is at ${:.0} this month against an expected ${:.0} for {}",
                label(&key),
                actual,
                def.amount,
                def.description
            );
            flagged.insert(key);
            recommendations.push(rec);
        }

        recommendations.sort_by(|a, b| {
            b.priority.rank().cmp(&a.priority.rank()).then_with(|| {
                b.potential_savings
                    .partial_cmp(&a.potential_savings)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        let produced = recommendations.len();
        recommendations.truncate(cfg.max_recommendations);

        debug!(
            produced,
            returned = recommendations.len(),
            months = actual_months,
            "Savings analysis complete"
        );

        recommendations
    }
}

impl Insight for SavingsAdvisor {
    fn id(&self) -> InsightType {
        InsightType::SavingsOpportunity
    }

    fn name(&self) -> &'static str {
        "Savings Opportunity"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let snapshot = ctx.snapshot;
        let current_month = snapshot.current_month(ctx.now);
        let previous_month = snapshot.previous_month(ctx.now);
        let trailing = snapshot.trailing_months(ctx.now, TRAILING_MONTHS);

        let recommendations = self.recommend(
            &SavingsInput {
                current_month: &current_month,
                previous_month: &previous_month,
                trailing: &trailing,
                budgets: &snapshot.budgets,
                recurring: &snapshot.recurring,
            },
            ctx.now,
        );

        recommendations
            .into_iter()
            .map(|rec| -> Result<Finding> {
                let severity = match (rec.recommendation_type, rec.priority) {
                    (RecommendationType::OverBudget, _) => Severity::Alert,
                    (_, Priority::High) => Severity::Warning,
                    (_, Priority::Medium) => Severity::Attention,
                    (_, Priority::Low) => Severity::Info,
                };
                let title = match rec.recommendation_type {
                    RecommendationType::OverBudget => "Over Budget",
                    RecommendationType::ApproachingBudget => "Approaching Budget",
                    RecommendationType::HighSpending => "High Spending",
                    RecommendationType::SpendingIncrease => "Spending Increase",
                    RecommendationType::ManySmall => "Small Purchases Adding Up",
                    RecommendationType::RecurringExceeded => "Recurring Charge Over Expected",
                };
                let key = format!(
                    "savings:{}:{}",
                    rec.recommendation_type,
                    rec.category_id.as_deref().unwrap_or("none")
                );

                Ok(Finding::new(
                    InsightType::SavingsOpportunity,
                    key,
                    severity,
                    title,
                    rec.message.clone(),
                    ctx.now,
                )
                .with_detail(format!("Potential savings: ${:.2}", rec.potential_savings))
                .with_data(serde_json::to_value(&rec)?))
            })
            .collect()
    }
}

/// Recommend savings using the default thresholds
pub fn recommend_savings(
    current_month: &[TransactionRecord],
    previous_month: &[TransactionRecord],
    trailing: &[TransactionRecord],
    budgets: &[BudgetRecord],
    recurring: &[RecurringDefinition],
    now: NaiveDateTime,
) -> Vec<SavingsRecommendation> {
    SavingsAdvisor::new().recommend(
        &SavingsInput {
            current_month,
            previous_month,
            trailing,
            budgets,
            recurring,
        },
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, budget, expense_at, month_of_expenses, now, recurring};

    #[test]
    fn test_over_budget_scenario() {
        let current = month_of_expenses("g", 2026, 10, 13, 40.0, Some("groceries"));
        let budgets = vec![budget(Some("groceries"), 500.0)];

        let recs = recommend_savings(&current, &[], &[], &budgets, &[], now());

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.recommendation_type, RecommendationType::OverBudget);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.over_budget_percentage, Some(4.0));
        assert_eq!(rec.potential_savings, 20.0);
        assert_eq!(rec.budget_amount, Some(500.0));
    }

    #[test]
    fn test_approaching_budget_daily_limit() {
        let current = vec![expense_at("a", 450.0, Some("dining"), at(2026, 10, 5, 19))];
        let budgets = vec![budget(Some("dining"), 500.0)];

        let recs = recommend_savings(&current, &[], &[], &budgets, &[], now());

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.recommendation_type, RecommendationType::ApproachingBudget);
        assert_eq!(rec.days_left, Some(13));
        // 50 left over 13 days
        assert_eq!(rec.daily_limit, Some(3.85));
        assert_eq!(rec.percent_used, Some(90.0));
    }

    #[test]
    fn test_approaching_budget_on_last_day_has_no_daily_limit() {
        let last_day = at(2026, 10, 31, 9);
        let current = vec![expense_at("a", 450.0, Some("dining"), at(2026, 10, 5, 19))];
        let budgets = vec![budget(Some("dining"), 500.0)];

        let recs = recommend_savings(&current, &[], &[], &budgets, &[], last_day);

        assert_eq!(recs[0].days_left, Some(0));
        assert_eq!(recs[0].daily_limit, None);
    }

    #[test]
    fn test_budget_for_other_month_ignored() {
        let current = month_of_expenses("g", 2026, 10, 13, 40.0, Some("groceries"));
        let mut stale = budget(Some("groceries"), 100.0);
        stale.month = Some(9);
        stale.year = Some(2026);

        let recs = recommend_savings(&current, &[], &[], &[stale], &[], now());

        // Falls through to unbudgeted high spending instead
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].recommendation_type, RecommendationType::HighSpending);
    }

    #[test]
    fn test_overall_budget_uses_total_spend() {
        let mut current = month_of_expenses("a", 2026, 10, 5, 30.0, Some("fun"));
        current.extend(month_of_expenses("b", 2026, 10, 5, 30.0, None));
        let budgets = vec![budget(None, 250.0)];

        let recs = recommend_savings(&current, &[], &[], &budgets, &[], now());

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].recommendation_type, RecommendationType::OverBudget);
        assert_eq!(recs[0].category_id, None);
        assert_eq!(recs[0].potential_savings, 50.0);
    }

    #[test]
    fn test_high_spending_with_change_vs_previous() {
        let current = vec![expense_at("a", 1200.0, Some("travel"), at(2026, 10, 3, 9))];
        let previous = vec![expense_at("b", 400.0, Some("travel"), at(2026, 9, 3, 9))];
        let trailing = vec![
            expense_at("c", 300.0, Some("travel"), at(2026, 8, 3, 9)),
            expense_at("d", 300.0, Some("travel"), at(2026, 7, 3, 9)),
            expense_at("e", 400.0, Some("travel"), at(2026, 9, 3, 9)),
        ];

        let recs = recommend_savings(&current, &previous, &trailing, &[], &[], now());

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.recommendation_type, RecommendationType::HighSpending);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.potential_savings, 240.0);
        assert_eq!(rec.percent_change, Some(200.0));
        // 1000 over 3 distinct months
        assert_eq!(rec.historical_monthly_average, 333.33);
    }

    #[test]
    fn test_spending_increase_for_budgeted_category() {
        // Budgeted (so no high_spending) but well under budget
        let current = vec![expense_at("a", 350.0, Some("home"), at(2026, 10, 3, 9))];
        let previous = vec![expense_at("b", 100.0, Some("home"), at(2026, 9, 3, 9))];
        let budgets = vec![budget(Some("home"), 2000.0)];

        let recs = recommend_savings(&current, &previous, &[], &budgets, &[], now());

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.recommendation_type, RecommendationType::SpendingIncrease);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.potential_savings, 250.0);
        assert_eq!(rec.percent_change, Some(250.0));
    }

    #[test]
    fn test_many_small_transactions() {
        let current = month_of_expenses("c", 2026, 10, 16, 5.0, Some("coffee"));

        let recs = recommend_savings(&current, &[], &[], &[], &[], now());

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].recommendation_type, RecommendationType::ManySmall);
        assert_eq!(recs[0].transaction_count, Some(16));
        assert_eq!(recs[0].potential_savings, 12.0);
    }

    #[test]
    fn test_recurring_exceeded() {
        let current = vec![expense_at("a", 180.0, Some("utilities"), at(2026, 10, 2, 9))];
        let defs = vec![recurring(Some("utilities"), 100.0, "Electric bill")];

        let recs = recommend_savings(&current, &[], &[], &[], &defs, now());

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].recommendation_type, RecommendationType::RecurringExceeded);
        assert_eq!(recs[0].potential_savings, 80.0);
        assert_eq!(recs[0].expected_amount, Some(100.0));
    }

    #[test]
    fn test_recurring_inactive_or_small_ignored() {
        let current = vec![
            expense_at("a", 180.0, Some("utilities"), at(2026, 10, 2, 9)),
            expense_at("b", 100.0, Some("streaming"), at(2026, 10, 2, 9)),
        ];
        let mut inactive = recurring(Some("utilities"), 100.0, "Electric bill");
        inactive.is_active = false;
        let small = recurring(Some("streaming"), 20.0, "Music");

        let recs = recommend_savings(&current, &[], &[], &[], &[inactive, small], now());
        assert!(recs.is_empty());
    }

    #[test]
    fn test_ordering_and_cap() {
        let mut current = Vec::new();
        let mut budgets = Vec::new();
        for i in 0..6 {
            let cat = format!("b{i}");
            current.push(expense_at(
                &format!("o{i}"),
                150.0 + i as f64,
                Some(cat.as_str()),
                at(2026, 10, 2, 9),
            ));
            budgets.push(budget(Some(cat.as_str()), 100.0));
        }
        for i in 0..6 {
            let cat = format!("h{i}");
            current.push(expense_at(
                &format!("h{i}"),
                500.0 + 10.0 * i as f64,
                Some(cat.as_str()),
                at(2026, 10, 2, 9),
            ));
        }

        let recs = recommend_savings(&current, &[], &[], &budgets, &[], now());

        assert_eq!(recs.len(), 8);
        for pair in recs.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.priority.rank() >= b.priority.rank());
            if a.priority == b.priority {
                assert!(a.potential_savings >= b.potential_savings);
            }
        }
        assert!(recs[..6].iter().all(|r| r.priority == Priority::High));
        assert_eq!(recs[6].priority, Priority::Medium);
    }

    #[test]
    fn test_empty_input() {
        assert!(recommend_savings(&[], &[], &[], &[], &[], now()).is_empty());
    }
}
