//! Headline numbers for the summary panel.
//!
//! Everything here is read off [`crate::aggregate`], so the panel agrees with the charts.

use serde::Serialize;

use crate::aggregate::{aggregate, percent};
use crate::survey::{QuestionType, Response, SurveyData};

/// Most common answer to one single-choice question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopAnswer {
    pub question_id: String,
    pub question_text: String,
    pub choice_id: String,
    pub label: String,
    pub count: u64,
    pub percentage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummary {
    pub total_responses: usize,
    pub filtered_responses: usize,
    /// Filtered responses as a share of all responses, whole percent.
    pub filtered_share: u64,
    pub top_answers: Vec<TopAnswer>,
}

impl SurveySummary {
    pub fn is_filtered(&self) -> bool {
        self.filtered_responses != self.total_responses
    }
}

pub fn summarize(survey: &SurveyData, filtered: &[Response]) -> SurveySummary {
    let top_answers = survey
        .questions
        .iter()
        .filter(|q| q.question_type == QuestionType::SingleChoice)
        .filter_map(|q| {
            let result = aggregate(q, filtered);
            let top = result.top()?;
            Some(TopAnswer {
                question_id: q.id.clone(),
                question_text: q.text.clone(),
                choice_id: top.choice_id.clone(),
                label: top.label.clone(),
                count: top.count,
                percentage: top.percentage,
            })
        })
        .collect();

    SurveySummary {
        total_responses: survey.responses.len(),
        filtered_responses: filtered.len(),
        filtered_share: percent(filtered.len() as f64, survey.responses.len() as f64),
        top_answers,
    }
}
