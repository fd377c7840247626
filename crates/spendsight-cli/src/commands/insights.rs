//! Analysis commands: suggest, savings, anomalies, forecast, insights

use anyhow::{anyhow, Result};
use spendsight_core::insights::{
    AnalysisContext, AnomalyDetector, CategorySuggester, ExpenseForecaster, InsightEngine,
    NoVariance, SavingsAdvisor, SavingsInput, SavingsRecommendation, SeededVariance,
    SuggestionRequest, VarianceSource,
};
use spendsight_core::models::TransactionType;

use super::core::{print_json, Session};
use super::truncate;

/// Most recent categorized records the suggester looks at
const SUGGESTION_HISTORY_LIMIT: usize = 1000;

pub fn cmd_suggest(
    session: &Session,
    description: &str,
    amount: Option<f64>,
    kind: &str,
) -> Result<()> {
    let transaction_type: TransactionType = kind.parse().map_err(|e: String| anyhow!(e))?;
    let history = session
        .snapshot
        .categorized_history(session.now, SUGGESTION_HISTORY_LIMIT);

    let suggester = CategorySuggester::with_config(session.config.suggestions.clone());
    let suggestions = suggester.suggest(
        &history,
        &session.snapshot.categories,
        &SuggestionRequest {
            description,
            amount: amount.unwrap_or(0.0),
            transaction_type,
            now: session.now,
        },
    );

    if session.json {
        return print_json(&suggestions);
    }

    println!();
    println!("🏷️  Category suggestions for \"{}\"", truncate(description, 40));
    println!("   ─────────────────────────────────────────────────────────────");
    if suggestions.is_empty() {
        println!("   No suggestions (not enough matching history).");
        return Ok(());
    }

    for (i, s) in suggestions.iter().enumerate() {
        let reasons: Vec<&str> = s.reasons.iter().map(|r| r.as_str()).collect();
        println!(
            "   {}. {:24} {:>4.0}%  {}",
            i + 1,
            truncate(&s.category_name, 24),
            s.confidence * 100.0,
            reasons.join(", ")
        );
    }
    if let Some(best) = suggester.auto_apply_candidate(&suggestions) {
        println!();
        println!("   ✅ Confident enough to apply \"{}\" automatically", best.category_name);
    }

    Ok(())
}

/// Recommendations for the session's current month
pub fn savings_recommendations(session: &Session) -> Vec<SavingsRecommendation> {
    let snapshot = &session.snapshot;
    let current_month = snapshot.current_month(session.now);
    let previous_month = snapshot.previous_month(session.now);
    let trailing = snapshot.trailing_months(session.now, 3);

    SavingsAdvisor::with_config(session.config.savings.clone()).recommend(
        &SavingsInput {
            current_month: &current_month,
            previous_month: &previous_month,
            trailing: &trailing,
            budgets: &snapshot.budgets,
            recurring: &snapshot.recurring,
        },
        session.now,
    )
}

pub fn cmd_savings(session: &Session) -> Result<()> {
    let recommendations = savings_recommendations(session);

    if session.json {
        return print_json(&recommendations);
    }

    println!();
    println!("💰 Savings Recommendations");
    println!("   ─────────────────────────────────────────────────────────────");
    if recommendations.is_empty() {
        println!("   Nothing to flag this month.");
        return Ok(());
    }

    let total: f64 = recommendations.iter().map(|r| r.potential_savings).sum();
    for rec in &recommendations {
        println!(
            "   [{:6}] {:18} ${:>9.2}  {}",
            rec.priority.as_str(),
            rec.recommendation_type.as_str(),
            rec.potential_savings,
            rec.message
        );
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Potential savings: ${:.2}", total);

    Ok(())
}

pub fn cmd_anomalies(session: &Session, days: i64) -> Result<()> {
    let config = &session.config.anomalies;
    let recent = session.snapshot.last_days(session.now, days);
    let historical = session.snapshot.days_before(
        session.now,
        days,
        config.baseline_days.round() as i64,
    );

    let anomalies =
        AnomalyDetector::with_config(config.clone()).detect(&recent, &historical, session.now);

    if session.json {
        return print_json(&anomalies);
    }

    println!();
    println!("🚨 Spending Anomalies (last {} days)", days);
    println!("   ─────────────────────────────────────────────────────────────");
    if anomalies.is_empty() {
        println!("   No anomalies found.");
        return Ok(());
    }

    for anomaly in &anomalies {
        println!(
            "   [{:6}] {} {:20} ${:>9.2}  {}",
            anomaly.severity.as_str(),
            anomaly.date,
            anomaly.anomaly_type.as_str(),
            anomaly.amount,
            anomaly.message
        );
    }

    Ok(())
}

pub fn cmd_forecast(
    session: &Session,
    months: Option<u32>,
    seed: Option<u64>,
    no_variance: bool,
) -> Result<()> {
    let forecaster = ExpenseForecaster::with_config(session.config.forecast.clone());
    let months = months.unwrap_or(forecaster.config().default_months_ahead);
    let historical = session
        .snapshot
        .trailing_months(session.now, forecaster.config().history_months + 1);

    let seeded = seed
        .map(SeededVariance::new)
        .unwrap_or_else(|| SeededVariance::from_now(session.now));
    let variance: &dyn VarianceSource = if no_variance { &NoVariance } else { &seeded };

    let forecast = forecaster.forecast(
        &historical,
        &session.snapshot.recurring,
        session.now,
        months,
        variance,
    );

    if session.json {
        return print_json(&forecast);
    }

    println!();
    println!("📈 Expense Forecast");
    println!("   ─────────────────────────────────────────────────────────────");
    if !forecast.has_enough_data {
        println!(
            "   Not enough history: {} expenses over {} months (need {} over {}).",
            forecast.transaction_count,
            forecast.month_count,
            forecast.min_transactions,
            forecast.min_months
        );
        return Ok(());
    }

    println!(
        "   Weighted monthly average: ${:.2}   Trend: {:+.1}%",
        forecast.weighted_average, forecast.trend_percentage
    );
    if !no_variance {
        println!("   Variance seed: {} (pass --seed to repeat)", seeded.seed());
    }
    println!();
    println!("   {:8} │ {:>10} │ {:10} │ {:>5}", "Month", "Total", "Trend", "Conf.");
    println!("   ─────────┼────────────┼────────────┼───────");
    for month in &forecast.forecast {
        println!(
            "   {:8} │ {:>10.0} │ {:10} │ {:>4.0}%",
            month.month,
            month.total,
            month.trend.as_str(),
            month.confidence * 100.0
        );
    }
    if let Some(first) = forecast.forecast.first() {
        if first.recurring_total > 0.0 {
            println!();
            println!("   Includes about ${:.2}/month of recurring charges", first.recurring_total);
        }
    }

    Ok(())
}

pub fn cmd_insights(session: &Session) -> Result<()> {
    let engine = InsightEngine::with_config(&session.config);
    let findings = engine.analyze_all(&AnalysisContext::new(&session.snapshot, session.now))?;

    if session.json {
        return print_json(&findings);
    }

    println!();
    println!("🔎 Insights as of {}", session.now.format("%Y-%m-%d %H:%M"));
    println!("   ─────────────────────────────────────────────────────────────");
    if findings.is_empty() {
        println!("   No findings.");
        return Ok(());
    }

    for finding in &findings {
        println!("   [{:9}] {}: {}", finding.severity.as_str(), finding.title, finding.summary);
        if let Some(detail) = &finding.detail {
            println!("               {}", detail);
        }
    }

    Ok(())
}
