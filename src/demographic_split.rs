//! Breakdown of a criteria-selected base group by one demographic field.

use serde::Serialize;
use tracing::debug;

use crate::aggregate::percent;
use crate::schema_index::{Criteria, CriteriaResolver};
use crate::survey::{distinct_values, Answer, DemographicField, Response, SurveyData};

/// Predicate value for one question: a single choice or any of several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CriterionValue {
    One(String),
    AnyOf(Vec<String>),
}

impl CriterionValue {
    fn accepts(&self, choice_id: &str) -> bool {
        match self {
            CriterionValue::One(id) => id == choice_id,
            CriterionValue::AnyOf(ids) => ids.iter().any(|id| id == choice_id),
        }
    }

    /// Scalar answers are checked directly; a multi-select answer matches when any of its
    /// selections does.
    pub fn matches(&self, answer: &Answer) -> bool {
        match answer {
            Answer::Single(id) => self.accepts(id),
            Answer::Multi(ids) => ids.iter().any(|id| self.accepts(id)),
            Answer::Scale(_) | Answer::Unrecognized(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCriterion {
    pub question_id: String,
    pub value: CriterionValue,
}

/// "Travelling domestically" covers both the domestic-only and the domestic-and-international
/// answers of the travel-scope question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomesticWidening {
    pub question_id: String,
    pub domestic_only: String,
    pub domestic_and_international: String,
}

impl Default for DomesticWidening {
    fn default() -> Self {
        Self {
            question_id: "Q1".to_string(),
            domestic_only: "Q1_1".to_string(),
            domestic_and_international: "Q1_3".to_string(),
        }
    }
}

impl DomesticWidening {
    fn applies(&self, criteria: &Criteria, query: &str) -> bool {
        criteria.len() == 1
            && criteria.get(&self.question_id) == Some(self.domestic_only.as_str())
            && query.to_lowercase().contains("domestic")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRow {
    pub value: String,
    pub count: usize,
    pub percentage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicSplitResult {
    pub field: DemographicField,
    pub base_criteria: Vec<BaseCriterion>,
    pub base_labels: Vec<String>,
    /// Unweighted size of the base group.
    pub base_total: usize,
    /// One row per value the field takes anywhere in the dataset, in encounter order.
    pub rows: Vec<SplitRow>,
    pub insight: String,
}

impl DemographicSplitResult {
    /// Row with the highest percentage; the first encountered wins ties.
    pub fn top(&self) -> Option<&SplitRow> {
        let mut best: Option<&SplitRow> = None;
        for row in &self.rows {
            if best.map_or(true, |b| row.percentage > b.percentage) {
                best = Some(row);
            }
        }
        best
    }

    /// Markdown table for the query surface, blank lines around the table.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "\n| {} | Respondents | % |\n|---|---|---|\n",
            capitalize(self.field.label())
        );
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {}% |\n",
                row.value, row.count, row.percentage
            ));
        }
        out.push('\n');
        out.push_str(&self.insight);
        out
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Resolves "break X down by <field>" queries.
#[derive(Debug, Clone)]
pub struct DemographicSplitEngine {
    widening: Option<DomesticWidening>,
}

impl Default for DemographicSplitEngine {
    fn default() -> Self {
        Self {
            widening: Some(DomesticWidening::default()),
        }
    }
}

impl DemographicSplitEngine {
    pub fn new(widening: Option<DomesticWidening>) -> Self {
        Self { widening }
    }

    /// Resolve `query` against the filtered `responses`.
    ///
    /// Activates only when the query names a demographic field and at least one criterion
    /// resolves. Row values come from the whole of `survey.responses`.
    pub fn resolve<R: CriteriaResolver + ?Sized>(
        &self,
        resolver: &R,
        survey: &SurveyData,
        responses: &[Response],
        query: &str,
    ) -> Option<DemographicSplitResult> {
        let field = DemographicField::detect(query)?;
        let criteria = resolver.extract_criteria(query);
        if criteria.is_empty() {
            return None;
        }
        let base = self.base_criteria(&criteria, query);
        debug!(field = %field, criteria = base.len(), "demographic split");
        Some(split(survey, responses, field, base))
    }

    /// Turn resolved criteria into base predicates, applying the domestic widening rule.
    pub fn base_criteria(&self, criteria: &Criteria, query: &str) -> Vec<BaseCriterion> {
        let widening = self.widening.as_ref().filter(|w| w.applies(criteria, query));
        criteria
            .iter()
            .map(|c| {
                let value = match widening {
                    Some(w) if c.question_id == w.question_id => CriterionValue::AnyOf(vec![
                        w.domestic_only.clone(),
                        w.domestic_and_international.clone(),
                    ]),
                    _ => CriterionValue::One(c.choice_id.clone()),
                };
                BaseCriterion {
                    question_id: c.question_id.clone(),
                    value,
                }
            })
            .collect()
    }
}

fn satisfies(response: &Response, criteria: &[BaseCriterion]) -> bool {
    criteria.iter().all(|c| {
        response
            .answer(&c.question_id)
            .is_some_and(|answer| c.value.matches(answer))
    })
}

fn base_label(survey: &SurveyData, criterion: &BaseCriterion) -> String {
    match &criterion.value {
        CriterionValue::One(id) => survey.choice_text(&criterion.question_id, id).to_string(),
        CriterionValue::AnyOf(ids) => ids
            .iter()
            .map(|id| survey.choice_text(&criterion.question_id, id))
            .collect::<Vec<_>>()
            .join(" or "),
    }
}

/// Split the base group selected by `criteria` over the values of `field`.
pub fn split(
    survey: &SurveyData,
    responses: &[Response],
    field: DemographicField,
    criteria: Vec<BaseCriterion>,
) -> DemographicSplitResult {
    let base_group: Vec<&Response> = responses
        .iter()
        .filter(|r| satisfies(r, &criteria))
        .collect();
    let base_total = base_group.len();

    let rows: Vec<SplitRow> = distinct_values(&survey.responses, field)
        .into_iter()
        .map(|value| {
            let count = base_group
                .iter()
                .filter(|r| r.demographics.get(field) == value)
                .count();
            SplitRow {
                percentage: percent(count as f64, base_total as f64),
                value,
                count,
            }
        })
        .collect();

    let base_labels: Vec<String> = criteria.iter().map(|c| base_label(survey, c)).collect();
    let mut result = DemographicSplitResult {
        field,
        base_criteria: criteria,
        base_labels,
        base_total,
        rows,
        insight: String::new(),
    };
    result.insight = render_insight(&result);
    result
}

fn render_insight(result: &DemographicSplitResult) -> String {
    let base = result
        .base_labels
        .iter()
        .map(|l| format!("\"{l}\""))
        .collect::<Vec<_>>()
        .join(" and ");
    match result.top() {
        Some(top) => format!(
            "{} is the largest {} among respondents who chose {base}, at {}% of {} respondents.",
            top.value,
            result.field.label(),
            top.percentage,
            result.base_total
        ),
        None => format!("No {} values recorded.", result.field.label()),
    }
}
