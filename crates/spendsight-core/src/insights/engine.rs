//! Insight Engine - runs the analyzers over a snapshot and collects findings

use chrono::NaiveDateTime;

use crate::config::InsightsConfig;
use crate::snapshot::Snapshot;
use crate::Result;

use super::types::{Finding, InsightType};
use super::{AnomalyDetector, ExpenseForecaster, SavingsAdvisor};

/// Context provided to insight analyzers
pub struct AnalysisContext<'a> {
    /// Records to analyze
    pub snapshot: &'a Snapshot,
    /// Reference time; windows are cut relative to it
    pub now: NaiveDateTime,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(snapshot: &'a Snapshot, now: NaiveDateTime) -> Self {
        Self { snapshot, now }
    }
}

/// Trait for insight analyzers
pub trait Insight: Send + Sync {
    /// Unique identifier for this insight type
    fn id(&self) -> InsightType;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Analyze data and produce findings
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>>;
}

/// The main insight engine that orchestrates analysis
pub struct InsightEngine {
    insights: Vec<Box<dyn Insight>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    /// Create an engine with the built-in analyzers and default thresholds
    pub fn new() -> Self {
        Self::with_config(&InsightsConfig::default())
    }

    pub fn with_config(config: &InsightsConfig) -> Self {
        let mut engine = Self { insights: vec![] };

        engine.register(Box::new(SavingsAdvisor::with_config(config.savings.clone())));
        engine.register(Box::new(AnomalyDetector::with_config(config.anomalies.clone())));
        engine.register(Box::new(ExpenseForecaster::with_config(config.forecast.clone())));

        engine
    }

    /// An engine with no analyzers registered
    pub fn empty() -> Self {
        Self { insights: vec![] }
    }

    /// Register an insight analyzer
    pub fn register(&mut self, insight: Box<dyn Insight>) {
        self.insights.push(insight);
    }

    /// Run all insight analyzers and collect findings, most severe first
    ///
    /// An analyzer that fails is logged and skipped.
    pub fn analyze_all(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        let mut all_findings = vec![];

        for insight in &self.insights {
            match insight.analyze(ctx) {
                Ok(findings) => {
                    tracing::debug!(
                        insight = insight.id().as_str(),
                        count = findings.len(),
                        "Insight analysis complete"
                    );
                    all_findings.extend(findings);
                }
                Err(e) => {
                    tracing::warn!(
                        insight = insight.name(),
                        error = %e,
                        "Insight analysis failed"
                    );
                }
            }
        }

        // Stable, so analyzer order is kept within a severity
        all_findings.sort_by(|a, b| b.severity.priority().cmp(&a.severity.priority()));

        tracing::info!(findings = all_findings.len(), "Insight analysis finished");
        Ok(all_findings)
    }

    /// Get list of registered insight types
    pub fn insight_types(&self) -> Vec<InsightType> {
        self.insights.iter().map(|i| i.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::types::Severity;
    use crate::test_utils::{budget, month_of_expenses, now};
    use crate::Error;

    struct Failing;

    impl Insight for Failing {
        fn id(&self) -> InsightType {
            InsightType::SpendingAnomaly
        }

        fn name(&self) -> &'static str {
            "Failing"
        }

        fn analyze(&self, _ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
            Err(Error::Insight("boom".into()))
        }
    }

    struct Fixed(Severity);

    impl Insight for Fixed {
        fn id(&self) -> InsightType {
            InsightType::ExpenseForecaster
        }

        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
            Ok(vec![Finding::new(
                self.id(),
                format!("fixed:{}", self.0),
                self.0,
                "Fixed",
                "Fixed finding",
                ctx.now,
            )])
        }
    }

    #[test]
    fn test_engine_creation() {
        let engine = InsightEngine::new();
        let types = engine.insight_types();

        assert_eq!(
            types,
            vec![
                InsightType::SavingsOpportunity,
                InsightType::SpendingAnomaly,
                InsightType::ExpenseForecaster
            ]
        );
    }

    #[test]
    fn test_analyze_empty_snapshot() {
        let snapshot = Snapshot::default();
        let engine = InsightEngine::new();

        let findings = engine
            .analyze_all(&AnalysisContext::new(&snapshot, now()))
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_failing_analyzer_does_not_abort() {
        let snapshot = Snapshot::default();
        let mut engine = InsightEngine::empty();
        engine.register(Box::new(Failing));
        engine.register(Box::new(Fixed(Severity::Info)));

        let findings = engine
            .analyze_all(&AnalysisContext::new(&snapshot, now()))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].key, "fixed:info");
    }

    #[test]
    fn test_findings_sorted_by_severity() {
        let snapshot = Snapshot::default();
        let mut engine = InsightEngine::empty();
        engine.register(Box::new(Fixed(Severity::Info)));
        engine.register(Box::new(Fixed(Severity::Alert)));
        engine.register(Box::new(Fixed(Severity::Attention)));

        let findings = engine
            .analyze_all(&AnalysisContext::new(&snapshot, now()))
            .unwrap();
        let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Alert, Severity::Attention, Severity::Info]
        );
    }

    #[test]
    fn test_over_budget_finding() {
        let snapshot = Snapshot {
            transactions: month_of_expenses("g", 2026, 10, 13, 40.0, Some("groceries")),
            budgets: vec![budget(Some("groceries"), 500.0)],
            ..Snapshot::default()
        };

        let findings = InsightEngine::new()
            .analyze_all(&AnalysisContext::new(&snapshot, now()))
            .unwrap();

        let finding = findings
            .iter()
            .find(|f| f.key == "savings:over_budget:groceries")
            .unwrap();
        assert_eq!(finding.severity, Severity::Alert);
        assert_eq!(finding.data["overBudgetPercentage"], 4.0);
        assert_eq!(finding.detected_at, now());
    }

    #[test]
    fn test_findings_depend_only_on_context_time() {
        let mut transactions = Vec::new();
        for month in 4..=10 {
            transactions.extend(month_of_expenses("g", 2026, month, 13, 40.0, Some("groceries")));
        }
        let snapshot = Snapshot {
            transactions,
            budgets: vec![budget(Some("groceries"), 500.0)],
            ..Snapshot::default()
        };
        let engine = InsightEngine::new();
        let ctx = AnalysisContext::new(&snapshot, now());

        let first = engine.analyze_all(&ctx).unwrap();
        let second = engine.analyze_all(&ctx).unwrap();

        assert!(!first.is_empty());
        assert!(first.iter().all(|f| f.detected_at == now()));
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
