//! Weighted per-question aggregation.
//!
//! Counts accumulate fractionally (weights are real numbers) and are rounded only when a
//! row is built for presentation, so every surface that shows a count or percentage reads it
//! from here and gets the same number.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::survey::{Answer, Question, Response};

/// One choice's line in an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub choice_id: String,
    pub label: String,
    /// Weighted count rounded to the nearest integer.
    pub count: u64,
    /// `round(100 * count / total)` from the unrounded values; 0 when nothing was answered.
    pub percentage: u64,
    /// Unrounded weighted count.
    pub weighted_count: f64,
}

/// Aggregate for one question over one response set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub question_id: String,
    pub question_text: String,
    /// Multi-select percentages share one denominator and may sum past 100.
    pub multi_select: bool,
    /// Rows in schema choice order, zero counts included.
    pub rows: Vec<AggregateRow>,
    /// Distinct respondents who answered, weighted and rounded.
    pub total: u64,
    pub weighted_total: f64,
}

impl AggregateResult {
    /// Schema order, zero-count choices omitted.
    pub fn compact(&self) -> Vec<&AggregateRow> {
        self.rows.iter().filter(|r| r.weighted_count > 0.0).collect()
    }

    /// Every choice, highest count first; ties keep schema order.
    pub fn detailed(&self) -> Vec<&AggregateRow> {
        let mut rows: Vec<&AggregateRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.weighted_count.total_cmp(&a.weighted_count));
        rows
    }

    /// Most common choice, first in schema order on ties. `None` when nobody answered.
    pub fn top(&self) -> Option<&AggregateRow> {
        self.detailed()
            .into_iter()
            .next()
            .filter(|r| r.weighted_count > 0.0)
    }

    pub fn row(&self, choice_id: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| r.choice_id == choice_id)
    }
}

/// Presentation rounding shared by every count and percentage.
pub fn round_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// `round(100 * part / whole)`, or 0 when `whole` is zero.
pub fn percent(part: f64, whole: f64) -> u64 {
    if whole == 0.0 {
        return 0;
    }
    round_count(100.0 * part / whole)
}

/// Aggregate `question` over `responses`.
///
/// Each answering respondent adds its weight to the total exactly once; unrecognized answer
/// shapes are skipped without touching counts or total.
pub fn aggregate(question: &Question, responses: &[Response]) -> AggregateResult {
    let mut counts: HashMap<&str, f64> = question
        .choices
        .iter()
        .map(|c| (c.id.as_str(), 0.0))
        .collect();
    let mut counted: HashSet<&str> = HashSet::new();
    let mut total = 0.0;

    for response in responses {
        let Some(answer) = response.answer(&question.id) else {
            continue;
        };
        let weight = response.weight;

        match answer {
            Answer::Single(choice_id) if choice_id.is_empty() => continue,
            Answer::Single(choice_id) => {
                *counts.entry(choice_id.as_str()).or_insert(0.0) += weight;
            }
            Answer::Multi(choice_ids) => {
                for choice_id in choice_ids {
                    *counts.entry(choice_id.as_str()).or_insert(0.0) += weight;
                }
            }
            Answer::Scale(values) => {
                for (choice_id, value) in values {
                    *counts.entry(choice_id.as_str()).or_insert(0.0) += value * weight;
                }
            }
            Answer::Unrecognized(raw) => {
                debug!(
                    question_id = %question.id,
                    response_id = %response.id,
                    answer = %raw,
                    "skipping unrecognized answer shape"
                );
                continue;
            }
        }

        if counted.insert(response.id.as_str()) {
            total += weight;
        }
    }

    let rows = question
        .choices
        .iter()
        .map(|choice| {
            let weighted = counts.get(choice.id.as_str()).copied().unwrap_or(0.0);
            AggregateRow {
                choice_id: choice.id.clone(),
                label: choice.text.clone(),
                count: round_count(weighted),
                percentage: percent(weighted, total),
                weighted_count: weighted,
            }
        })
        .collect();

    AggregateResult {
        question_id: question.id.clone(),
        question_text: question.text.clone(),
        multi_select: question.is_multi_select(),
        rows,
        total: round_count(total),
        weighted_total: total,
    }
}

/// Aggregate every question in one pass over the schema.
pub fn aggregate_all(questions: &[Question], responses: &[Response]) -> Vec<AggregateResult> {
    questions.iter().map(|q| aggregate(q, responses)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_zero_is_zero() {
        assert_eq!(percent(5.0, 0.0), 0);
        assert_eq!(percent(1.0, 3.0), 33);
        assert_eq!(percent(2.0, 3.0), 67);
    }

    #[test]
    fn round_count_clamps_non_finite() {
        assert_eq!(round_count(f64::NAN), 0);
        assert_eq!(round_count(-2.4), 0);
        assert_eq!(round_count(2.5), 3);
    }
}
