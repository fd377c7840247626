//! Category Suggestions
//!
//! Ranks a user's categories for a new transaction from their own history:
//! - Fuzzy description matching, weighted by how recent each match is
//! - Exact and close amount matches
//! - Category names that resemble the description
//! - Categories used on many distinct days (recurring patterns)
//!
//! Catch-all categories that only score through sheer volume are penalized
//! when a description is given.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, trace};

use crate::config::SuggestionConfig;
use crate::models::{CategoryRecord, TransactionRecord, TransactionType};

use super::similarity::similarity;
use super::types::{CategorySuggestion, MatchReason};

const EXACT_MATCH_POINTS: f64 = 100.0;
const HIGH_SIMILARITY_POINTS: f64 = 60.0;
const PARTIAL_MATCH_POINTS: f64 = 30.0;
const EXACT_AMOUNT_POINTS: f64 = 25.0;
const EXACT_AMOUNT_ONLY_POINTS: f64 = 50.0;
const CLOSE_AMOUNT_POINTS: f64 = 10.0;
const CLOSE_AMOUNT_ONLY_POINTS: f64 = 25.0;
const CATEGORY_NAME_POINTS: f64 = 40.0;
const RECURRING_PATTERN_POINTS: f64 = 15.0;

/// What the user has typed so far
#[derive(Debug, Clone)]
pub struct SuggestionRequest<'a> {
    pub description: &'a str,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub now: NaiveDateTime,
}

/// Per-category accumulator, built fresh for every request
#[derive(Debug, Default)]
struct CategoryScore {
    score: f64,
    reasons: BTreeSet<MatchReason>,
    usage_count: usize,
    avg_amount: f64,
    matched: Option<(String, f64)>,
    active_days: HashSet<NaiveDate>,
}

impl CategoryScore {
    fn add(&mut self, points: f64, reason: MatchReason) {
        self.score += points;
        self.reasons.insert(reason);
    }

    fn record_usage(&mut self, tx: &TransactionRecord, day: NaiveDate) {
        self.usage_count += 1;
        self.avg_amount += (tx.amount_or_zero() - self.avg_amount) / self.usage_count as f64;
        self.active_days.insert(day);
    }

    /// Earliest-to-score capture: the first record (in history order) that
    /// triggers a capturing rule is the one reported for the category.
    fn capture_first_match(&mut self, tx: &TransactionRecord) {
        if self.matched.is_none() {
            self.matched = Some((tx.description.clone(), tx.amount_or_zero()));
        }
    }

    fn has_specific_reason(&self) -> bool {
        self.reasons.iter().any(MatchReason::is_specific)
    }

    fn penalize(&mut self, points: f64) {
        self.score = (self.score - points).max(0.0);
    }
}

/// Suggests categories for a new transaction
#[derive(Debug, Clone, Default)]
pub struct CategorySuggester {
    config: SuggestionConfig,
}

impl CategorySuggester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SuggestionConfig) -> Self {
        Self { config }
    }

    /// Recency weight of a record `days_ago` old (floored at one day)
    pub fn recency_weight(&self, days_ago: f64) -> f64 {
        (-days_ago.max(1.0) / self.config.recency_time_constant_days).exp()
    }

    /// Rank candidate categories for the request, best first
    pub fn suggest(
        &self,
        history: &[TransactionRecord],
        categories: &[CategoryRecord],
        request: &SuggestionRequest<'_>,
    ) -> Vec<CategorySuggestion> {
        let description = request.description.trim();
        let has_description = !description.is_empty();
        let has_amount = request.amount.is_finite() && request.amount > 0.0;

        if !has_description && !has_amount {
            return vec![];
        }
        if history.is_empty() {
            return vec![];
        }

        let candidates: Vec<&CategoryRecord> = categories
            .iter()
            .filter(|c| c.category_type.accepts(request.transaction_type))
            .collect();

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, cat) in candidates.iter().enumerate() {
            index.entry(cat.id.as_str()).or_insert(i);
        }
        let mut scores: Vec<CategoryScore> =
            candidates.iter().map(|_| CategoryScore::default()).collect();

        let mut skipped = 0usize;
        for tx in history {
            let Some(slot) = tx
                .category_id
                .as_deref()
                .and_then(|id| index.get(id).copied())
            else {
                continue;
            };
            let Some(date) = tx.date else {
                skipped += 1;
                continue;
            };

            let entry = &mut scores[slot];
            let days_ago = (request.now - date).num_seconds() as f64 / 86_400.0;
            let weight = self.recency_weight(days_ago);
            let tx_amount = tx.amount_or_zero();

            let amount_diff = (tx_amount - request.amount).abs();
            let relative_diff = if has_amount {
                amount_diff / request.amount
            } else {
                f64::INFINITY
            };

            if has_description {
                let sim = similarity(description, &tx.description);
                if sim >= self.config.exact_similarity
                    && relative_diff <= self.config.exact_amount_tolerance
                {
                    entry.add(EXACT_MATCH_POINTS * weight * sim, MatchReason::ExactMatch);
                    entry.capture_first_match(tx);
                } else if sim >= self.config.high_similarity {
                    entry.add(
                        HIGH_SIMILARITY_POINTS * weight * sim,
                        MatchReason::SimilarDescription,
                    );
                } else if sim >= self.config.partial_similarity {
                    entry.add(PARTIAL_MATCH_POINTS * weight * sim, MatchReason::PartialMatch);
                }
            }

            if has_amount {
                if amount_diff < self.config.exact_amount_epsilon {
                    let base = if has_description {
                        EXACT_AMOUNT_POINTS
                    } else {
                        EXACT_AMOUNT_ONLY_POINTS
                    };
                    entry.add(base * weight, MatchReason::ExactAmount);
                    if !has_description {
                        entry.capture_first_match(tx);
                    }
                } else if relative_diff <= self.config.close_amount_tolerance {
                    let base = if has_description {
                        CLOSE_AMOUNT_POINTS
                    } else {
                        CLOSE_AMOUNT_ONLY_POINTS
                    };
                    entry.add(base * weight, MatchReason::SimilarAmount);
                }
            }

            entry.record_usage(tx, date.date());
        }

        if skipped > 0 {
            debug!(skipped, "Skipped undated history records");
        }

        for (cat, entry) in candidates.iter().zip(scores.iter_mut()) {
            if has_description {
                let sim = similarity(description, &cat.name);
                if sim >= self.config.category_name_similarity {
                    entry.add(CATEGORY_NAME_POINTS * sim, MatchReason::CategoryNameMatch);
                }
            }

            if entry.active_days.len() >= self.config.recurring_min_days
                && entry.usage_count >= self.config.recurring_min_occurrences
            {
                entry.add(RECURRING_PATTERN_POINTS, MatchReason::RecurringPattern);
            }

            if has_description
                && !entry.has_specific_reason()
                && entry.usage_count > self.config.generic_usage_threshold
            {
                let penalty = entry.usage_count as f64 * self.config.generic_penalty_per_use;
                trace!(category = %cat.id, penalty, "Penalizing generic category");
                entry.penalize(penalty);
            }

            trace!(
                category = %cat.id,
                score = entry.score,
                usage = entry.usage_count,
                reasons = ?entry.reasons,
                "Category scored"
            );
        }

        let mut ranked: Vec<(&CategoryRecord, CategoryScore)> = candidates
            .into_iter()
            .zip(scores)
            .filter(|(_, s)| s.score > self.config.min_score)
            .collect();

        // Stable sort keeps input category order for equal scores
        ranked.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.config.max_suggestions);

        let suggestions: Vec<CategorySuggestion> = ranked
            .into_iter()
            .map(|(cat, s)| {
                let (matched_description, matched_amount) = match s.matched {
                    Some((d, a)) => (Some(d), Some(a)),
                    None => (None, None),
                };
                CategorySuggestion {
                    category_id: cat.id.clone(),
                    category_name: cat.name.clone(),
                    confidence: (s.score / 100.0).min(1.0),
                    score: s.score,
                    reasons: s.reasons.into_iter().collect(),
                    avg_amount: s.avg_amount.round(),
                    usage_count: s.usage_count,
                    matched_description,
                    matched_amount,
                }
            })
            .collect();

        debug!(
            history = history.len(),
            suggestions = suggestions.len(),
            "Category suggestion complete"
        );

        suggestions
    }

    /// The top suggestion, if it is confident enough to apply unprompted
    pub fn auto_apply_candidate<'s>(
        &self,
        suggestions: &'s [CategorySuggestion],
    ) -> Option<&'s CategorySuggestion> {
        suggestions
            .first()
            .filter(|s| s.confidence >= self.config.auto_apply_confidence)
    }
}

/// Suggest up to three categories using the default thresholds
pub fn suggest_categories(
    history: &[TransactionRecord],
    categories: &[CategoryRecord],
    description: &str,
    amount: f64,
    transaction_type: TransactionType,
    now: NaiveDateTime,
) -> Vec<CategorySuggestion> {
    CategorySuggester::new().suggest(
        history,
        categories,
        &SuggestionRequest {
            description,
            amount,
            transaction_type,
            now,
        },
    )
}
