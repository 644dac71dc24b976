//! Prompt rendering for the completion fallback.
//!
//! When neither local engine resolves a query, the completion endpoint gets a system message
//! carrying the assistant instructions plus a summary of the current (filtered) aggregates, so
//! its numbers match the charts.

use crate::aggregate::aggregate;
use crate::gateway::{Message, Role};
use crate::survey::{distinct_values, DemographicField, Question, Response};

pub const SYSTEM_PROMPT: &str = r#"You are a travel data assistant.
Answer using ONLY the provided survey data.
Your answers MUST match exactly with the data shown in the charts.
Present counts and percentages precisely as they appear in the data.

IMPORTANT: For multi-select questions (marked as "multi-select question"), percentages may sum to over 100% because respondents can select multiple options. This is expected and correct.

Do not mention question IDs (like Q3_1) in your response; use only the question text and answer options.
If you provide a demographic split, format it as a markdown table (with a blank line before and after the table).
Always present percentages as whole numbers (e.g., 24% not 24.3%).
After presenting data, add a brief insight highlighting the most significant finding.
Only add explanations if the user asks for them. For follow-up questions, use the previous context."#;

pub const GREETING: &str = "Hello! Ask me anything about the travel survey data.";

fn json_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// One line per question: `text: {"label": {"count": n, "percentage": p}, ...}`.
fn render_question(question: &Question, responses: &[Response]) -> String {
    let result = aggregate(question, responses);
    let entries = result
        .compact()
        .into_iter()
        .map(|row| {
            format!(
                "{}:{{\"count\":{},\"percentage\":{}}}",
                json_str(&row.label),
                row.count,
                row.percentage
            )
        })
        .collect::<Vec<_>>()
        .join(",");

    let mut line = format!("{}: {{{entries}}}", question.text);
    if question.is_multi_select() {
        line.push_str(" (multi-select question - percentages may sum to >100%)");
    }
    line
}

/// Per-value respondent counts of `field` over `responses`, encounter order.
fn render_breakdown(field: DemographicField, responses: &[Response]) -> String {
    let entries = distinct_values(responses, field)
        .into_iter()
        .map(|value| {
            let count = responses
                .iter()
                .filter(|r| r.demographics.get(field) == value)
                .count();
            format!("{}:{count}", json_str(&value))
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "If the user asks for a breakdown by {}, use this data: {{{entries}}}",
        field.as_str()
    )
}

/// Aggregate context for the system message.
pub fn render_survey_context(
    questions: &[Question],
    responses: &[Response],
    demographic: Option<DemographicField>,
) -> String {
    let counts = questions
        .iter()
        .map(|q| render_question(q, responses))
        .collect::<Vec<_>>()
        .join("\n");

    let fields = DemographicField::ALL
        .iter()
        .map(DemographicField::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!(
        "Survey Questions with Response Counts:\n{counts}\n\n\
         Demographic fields: {fields}\nTotal responses: {}",
        responses.len()
    );
    if let Some(field) = demographic {
        out.push('\n');
        out.push_str(&render_breakdown(field, responses));
    }
    out
}

/// Message payload for one fallback call: fresh system context, prior non-system turns, then
/// the new user query.
pub fn build_messages(context: &str, history: &[Message], query: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(format!("{SYSTEM_PROMPT}\n\n{context}")));
    messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
    messages.push(Message::user(query));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_messages_drops_old_system_turns() {
        let history = vec![
            Message::system("stale"),
            Message::assistant(GREETING),
            Message::user("earlier"),
        ];
        let messages = build_messages("ctx", &history, "now");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.ends_with("ctx"));
        assert_eq!(messages[1].content, GREETING);
        assert_eq!(messages[3], Message::user("now"));
    }

    #[test]
    fn context_annotates_multi_select_and_adds_breakdown() {
        let survey = crate::mock::travel_survey(30, 2);
        let context = render_survey_context(
            &survey.questions,
            &survey.responses,
            Some(DemographicField::Gender),
        );

        let resources = context
            .lines()
            .find(|l| l.starts_with("Which of the following resources"))
            .unwrap();
        assert!(resources.ends_with("(multi-select question - percentages may sum to >100%)"));
        assert!(context.contains("Total responses: 30"));
        assert!(context.contains("If the user asks for a breakdown by gender"));
    }
}
