//! Cross-tabulation of two or more free-text criteria.

use serde::Serialize;
use tracing::debug;

use crate::aggregate::percent;
use crate::schema_index::{Criteria, CriteriaResolver, Criterion};
use crate::survey::{Question, Response};

/// Base and intersection counts for a resolved multi-criteria query.
///
/// Counts are plain respondent counts; weights are not applied here, unlike
/// [`crate::aggregate::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabResult {
    pub base: Criterion,
    pub base_label: String,
    pub base_count: usize,
    pub intersections: Vec<Criterion>,
    pub intersection_labels: Vec<String>,
    pub intersection_count: usize,
    pub percent_of_base: u64,
    pub percent_of_all: u64,
    /// Size of the response set the percentages were taken over.
    pub total_responses: usize,
    pub insight: String,
}

fn choice_label(questions: &[Question], criterion: &Criterion) -> String {
    questions
        .iter()
        .find(|q| q.id == criterion.question_id)
        .and_then(|q| q.choice(&criterion.choice_id))
        .map(|c| c.text.clone())
        .unwrap_or_else(|| criterion.choice_id.clone())
}

fn answered_exactly(response: &Response, criterion: &Criterion) -> bool {
    response
        .answer(&criterion.question_id)
        .and_then(|a| a.as_single())
        == Some(criterion.choice_id.as_str())
}

/// Resolve `query` and cross-tabulate it, or `None` when fewer than two questions resolve.
pub fn resolve<R: CriteriaResolver + ?Sized>(
    resolver: &R,
    questions: &[Question],
    responses: &[Response],
    query: &str,
) -> Option<CrossTabResult> {
    let criteria = resolver.extract_criteria(query);
    debug!(resolved = criteria.len(), "cross-tab criteria");
    cross_tab(&criteria, questions, responses)
}

/// Cross-tabulate already-resolved criteria.
///
/// The first criterion is the base; every other criterion must hold as well for a response to
/// count toward the intersection. Matching is scalar equality only, so multi-select answers
/// never satisfy a predicate here.
pub fn cross_tab(
    criteria: &Criteria,
    questions: &[Question],
    responses: &[Response],
) -> Option<CrossTabResult> {
    if criteria.len() < 2 {
        return None;
    }
    let mut iter = criteria.iter();
    let base = iter.next()?.clone();
    let intersections: Vec<Criterion> = iter.cloned().collect();

    let base_group: Vec<&Response> = responses
        .iter()
        .filter(|r| answered_exactly(r, &base))
        .collect();
    let intersection_count = base_group
        .iter()
        .filter(|r| intersections.iter().all(|c| answered_exactly(r, c)))
        .count();

    let base_count = base_group.len();
    let percent_of_base = percent(intersection_count as f64, base_count as f64);
    let percent_of_all = percent(intersection_count as f64, responses.len() as f64);

    let base_label = choice_label(questions, &base);
    let intersection_labels: Vec<String> = intersections
        .iter()
        .map(|c| choice_label(questions, c))
        .collect();
    let insight = render_insight(&base_label, &intersection_labels, percent_of_base);

    Some(CrossTabResult {
        base,
        base_label,
        base_count,
        intersections,
        intersection_labels,
        intersection_count,
        percent_of_base,
        percent_of_all,
        total_responses: responses.len(),
        insight,
    })
}

fn render_insight(base_label: &str, intersection_labels: &[String], percent_of_base: u64) -> String {
    let combined = intersection_labels
        .iter()
        .map(|l| format!("\"{l}\""))
        .collect::<Vec<_>>()
        .join(" and ");
    format!(
        "{combined} is notable among respondents who chose \"{base_label}\": \
         {percent_of_base}% of them also chose it."
    )
}

impl CrossTabResult {
    /// Markdown rendering for the query surface.
    pub fn to_markdown(&self) -> String {
        let criteria = self.intersection_labels.join(" + ");
        format!(
            "| Group | Respondents | % of base | % of all |\n\
             |---|---|---|---|\n\
             | {base} | {base_count} | {base_self}% | {base_all}% |\n\
             | {base} + {criteria} | {count} | {pob}% | {poa}% |\n\n{insight}",
            base = self.base_label,
            base_count = self.base_count,
            base_self = percent(self.base_count as f64, self.base_count as f64),
            base_all = percent(self.base_count as f64, self.total_responses as f64),
            count = self.intersection_count,
            pob = self.percent_of_base,
            poa = self.percent_of_all,
            insight = self.insight,
        )
    }
}
