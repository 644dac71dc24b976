//! Survey schema and response data model.
//!
//! `SurveyData` is produced by an external loader (generator or spreadsheet import) and is
//! treated as immutable for the lifetime of a session: re-uploads replace it wholesale.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Schema
// =============================================================================

/// Shape of the answers a question collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Scale,
    OpenEnded,
}

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A survey question. Choice order drives display and tie-break order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        question_type: QuestionType,
        choices: Vec<Choice>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            question_type,
            choices,
        }
    }

    pub fn is_multi_select(&self) -> bool {
        self.question_type == QuestionType::MultipleChoice
    }

    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

// =============================================================================
// Responses
// =============================================================================

/// A recorded answer to one question.
///
/// Deserialized from the loose JSON shape `string | string[] | {choiceId: number}`; anything
/// else lands in `Unrecognized` and is ignored by every consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multi(Vec<String>),
    Scale(BTreeMap<String, f64>),
    Unrecognized(serde_json::Value),
}

impl Answer {
    /// Whether the recorded answer selects `choice_id`.
    ///
    /// Single answers match by equality, multi-select answers by containment. Scale answers
    /// never match a choice predicate.
    pub fn selects(&self, choice_id: &str) -> bool {
        match self {
            Answer::Single(id) => id == choice_id,
            Answer::Multi(ids) => ids.iter().any(|id| id == choice_id),
            Answer::Scale(_) | Answer::Unrecognized(_) => false,
        }
    }

    /// The single selected choice id, if this is a scalar answer.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Answer::Single(id) => Some(id),
            _ => None,
        }
    }
}

/// Fixed demographic fields recorded for each respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DemographicField {
    AgeGroup,
    Gender,
    FamilyComposition,
    IncomeRange,
    Region,
}

impl DemographicField {
    pub const ALL: [DemographicField; 5] = [
        DemographicField::AgeGroup,
        DemographicField::Gender,
        DemographicField::FamilyComposition,
        DemographicField::IncomeRange,
        DemographicField::Region,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DemographicField::AgeGroup => "ageGroup",
            DemographicField::Gender => "gender",
            DemographicField::FamilyComposition => "familyComposition",
            DemographicField::IncomeRange => "incomeRange",
            DemographicField::Region => "region",
        }
    }

    /// Human label used in rendered summaries.
    pub fn label(&self) -> &'static str {
        match self {
            DemographicField::AgeGroup => "age group",
            DemographicField::Gender => "gender",
            DemographicField::FamilyComposition => "family composition",
            DemographicField::IncomeRange => "income range",
            DemographicField::Region => "region",
        }
    }

    /// Detect which demographic field a free-text query asks about.
    ///
    /// Fields are checked in a fixed order (age, gender, income, region, family) and the first
    /// hit wins. Only whole words count, so neither "percentage" nor "travel agents" reads as
    /// an age question.
    pub fn detect(query: &str) -> Option<DemographicField> {
        const KEYWORDS: [(&[&str], DemographicField); 5] = [
            (&["age", "ages", "aged", "agegroup"], DemographicField::AgeGroup),
            (&["gender", "genders"], DemographicField::Gender),
            (&["income", "incomes", "incomerange"], DemographicField::IncomeRange),
            (&["region", "regions", "regional"], DemographicField::Region),
            (
                &["family", "families", "familycomposition"],
                DemographicField::FamilyComposition,
            ),
        ];

        let lower = query.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        KEYWORDS
            .iter()
            .find(|(keywords, _)| words.iter().any(|w| keywords.contains(w)))
            .map(|(_, field)| *field)
    }
}

impl fmt::Display for DemographicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown demographic field: {0}")]
pub struct UnknownFieldError(pub String);

impl FromStr for DemographicField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ageGroup" | "age_group" | "age" => Ok(DemographicField::AgeGroup),
            "gender" => Ok(DemographicField::Gender),
            "familyComposition" | "family_composition" | "family" => {
                Ok(DemographicField::FamilyComposition)
            }
            "incomeRange" | "income_range" | "income" => Ok(DemographicField::IncomeRange),
            "region" => Ok(DemographicField::Region),
            other => Err(UnknownFieldError(other.to_string())),
        }
    }
}

fn unknown_value() -> String {
    "Unknown".to_string()
}

/// Demographic profile of one respondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    #[serde(default = "unknown_value")]
    pub age_group: String,
    #[serde(default = "unknown_value")]
    pub gender: String,
    #[serde(default = "unknown_value")]
    pub family_composition: String,
    #[serde(default = "unknown_value")]
    pub income_range: String,
    #[serde(default = "unknown_value")]
    pub region: String,
}

impl Demographics {
    pub fn get(&self, field: DemographicField) -> &str {
        match field {
            DemographicField::AgeGroup => &self.age_group,
            DemographicField::Gender => &self.gender,
            DemographicField::FamilyComposition => &self.family_composition,
            DemographicField::IncomeRange => &self.income_range,
            DemographicField::Region => &self.region,
        }
    }
}

impl Default for Demographics {
    fn default() -> Self {
        Self {
            age_group: unknown_value(),
            gender: unknown_value(),
            family_composition: unknown_value(),
            income_range: unknown_value(),
            region: unknown_value(),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// One respondent's answers, demographics and sampling weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Response {
    pub fn new(id: impl Into<String>, demographics: Demographics) -> Self {
        Self {
            id: id.into(),
            demographics,
            answers: BTreeMap::new(),
            weight: default_weight(),
        }
    }

    pub fn with_answer(mut self, question_id: impl Into<String>, answer: Answer) -> Self {
        self.answers.insert(question_id.into(), answer);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }
}

// =============================================================================
// Survey
// =============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid survey json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Schema plus the full response list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl SurveyData {
    pub fn from_json_str(raw: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Display text of a choice, falling back to the raw id when the schema doesn't know it.
    pub fn choice_text<'a>(&'a self, question_id: &str, choice_id: &'a str) -> &'a str {
        self.question(question_id)
            .and_then(|q| q.choice(choice_id))
            .map(|c| c.text.as_str())
            .unwrap_or(choice_id)
    }

    /// Distinct values of `field` across all responses, in first-encounter order.
    pub fn field_values(&self, field: DemographicField) -> Vec<String> {
        distinct_values(&self.responses, field)
    }

    /// Distinct values for every demographic field.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            values: DemographicField::ALL
                .iter()
                .map(|field| (*field, self.field_values(*field)))
                .collect(),
        }
    }
}

pub(crate) fn distinct_values(responses: &[Response], field: DemographicField) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for response in responses {
        let value = response.demographics.get(field);
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

/// Selectable values per demographic field, as offered by a filter control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub values: BTreeMap<DemographicField, Vec<String>>,
}

impl FilterOptions {
    pub fn get(&self, field: DemographicField) -> &[String] {
        self.values.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_deserializes_all_shapes() {
        let raw = r#"{
            "a": "Q1_1",
            "b": ["Q3_1", "Q3_2"],
            "c": {"Q4_1": 3, "Q4_2": 5},
            "d": 42
        }"#;
        let answers: BTreeMap<String, Answer> = serde_json::from_str(raw).unwrap();
        assert_eq!(answers["a"], Answer::Single("Q1_1".into()));
        assert_eq!(
            answers["b"],
            Answer::Multi(vec!["Q3_1".into(), "Q3_2".into()])
        );
        assert!(matches!(&answers["c"], Answer::Scale(m) if m["Q4_2"] == 5.0));
        assert!(matches!(answers["d"], Answer::Unrecognized(_)));
    }

    #[test]
    fn response_defaults_weight_and_demographics() {
        let r: Response = serde_json::from_str(r#"{"id": "r1"}"#).unwrap();
        assert_eq!(r.weight, 1.0);
        assert_eq!(r.demographics.region, "Unknown");
    }

    #[test]
    fn detect_checks_keywords_in_fixed_order() {
        assert_eq!(
            DemographicField::detect("Show age-wise split by gender"),
            Some(DemographicField::AgeGroup)
        );
        assert_eq!(
            DemographicField::detect("break down by INCOME"),
            Some(DemographicField::IncomeRange)
        );
        assert_eq!(DemographicField::detect("beach lovers"), None);
        assert_eq!(
            DemographicField::detect("what percentage chose a cruise?"),
            None
        );
    }

    #[test]
    fn detect_matches_whole_words_only() {
        assert_eq!(
            DemographicField::detect("gender breakdown of people using travel agents"),
            Some(DemographicField::Gender)
        );
        assert_eq!(DemographicField::detect("who uses travel agents?"), None);
        assert_eq!(
            DemographicField::detect("respondents aged 25-34"),
            Some(DemographicField::AgeGroup)
        );
        assert_eq!(
            DemographicField::detect("split by age group"),
            Some(DemographicField::AgeGroup)
        );
        assert_eq!(
            DemographicField::detect("regional differences"),
            Some(DemographicField::Region)
        );
    }

    #[test]
    fn field_parses_camel_and_snake_case() {
        assert_eq!(
            "familyComposition".parse::<DemographicField>(),
            Ok(DemographicField::FamilyComposition)
        );
        assert_eq!(
            "income_range".parse::<DemographicField>(),
            Ok(DemographicField::IncomeRange)
        );
        assert!("shoeSize".parse::<DemographicField>().is_err());
    }
}
