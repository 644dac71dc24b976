use survey_insights::crosstab::{self, cross_tab};
use survey_insights::mock::travel_questions;
use survey_insights::schema_index::{Criteria, CriteriaResolver, SchemaIndex};
use survey_insights::survey::{Answer, Demographics, Response};

fn respondent(i: usize, q1: &str, q2: &str) -> Response {
    Response::new(format!("r{i}"), Demographics::default())
        .with_answer("Q1", Answer::Single(q1.to_string()))
        .with_answer("Q2", Answer::Single(q2.to_string()))
}

/// 200 respondents: 100 domestic-only, half of whom want a beach vacation.
fn scenario() -> Vec<Response> {
    let mut responses = Vec::new();
    for i in 0..100 {
        let trip = if i < 50 { "Q2_1" } else { "Q2_2" };
        responses.push(respondent(i, "Q1_1", trip));
    }
    for i in 100..200 {
        responses.push(respondent(i, "Q1_2", "Q2_1"));
    }
    responses
}

#[test]
fn domestic_beach_scenario() {
    let questions = travel_questions();
    let index = SchemaIndex::build(&questions);

    let result = crosstab::resolve(
        &index,
        &questions,
        &scenario(),
        "Of the domestic only travellers, how many are planning a beach vacation?",
    )
    .expect("two criteria resolve");

    assert_eq!(result.base.question_id, "Q1");
    assert_eq!(result.base.choice_id, "Q1_1");
    assert_eq!(result.base_count, 100);
    assert_eq!(result.intersection_count, 50);
    assert_eq!(result.percent_of_base, 50);
    assert_eq!(result.percent_of_all, 25);
    assert_eq!(result.total_responses, 200);
    assert_eq!(result.intersection_labels, vec!["Beach vacation"]);
    assert!(result.insight.contains("\"Beach vacation\" is notable"));
    assert!(result.insight.contains("\"Domestic only\""));
}

#[test]
fn base_is_first_question_in_schema_order_regardless_of_query_order() {
    let questions = travel_questions();
    let index = SchemaIndex::build(&questions);

    let criteria = index.extract_criteria("beach vacation for domestic only travellers");
    let first = criteria.first().unwrap();
    assert_eq!(first.question_id, "Q1");
}

#[test]
fn single_criterion_does_not_activate() {
    let questions = travel_questions();
    let index = SchemaIndex::build(&questions);

    assert!(crosstab::resolve(&index, &questions, &scenario(), "beach vacation").is_none());
    assert!(crosstab::resolve(&index, &questions, &scenario(), "what is the weather").is_none());
}

#[test]
fn three_criteria_intersect_all_of_them() {
    let questions = travel_questions();
    let responses: Vec<Response> = (0..10)
        .map(|i| {
            let q5 = if i < 3 { "Q5_1" } else { "Q5_2" };
            respondent(i, "Q1_1", "Q2_1").with_answer("Q5", Answer::Single(q5.to_string()))
        })
        .collect();

    let criteria: Criteria = [("Q1", "Q1_1"), ("Q2", "Q2_1"), ("Q5", "Q5_1")]
        .into_iter()
        .collect();
    let result = cross_tab(&criteria, &questions, &responses).unwrap();

    assert_eq!(result.base_count, 10);
    assert_eq!(result.intersections.len(), 2);
    assert_eq!(result.intersection_count, 3);
    assert_eq!(result.percent_of_base, 30);
    assert_eq!(result.percent_of_all, 30);
}

#[test]
fn multi_select_answers_never_satisfy_a_predicate() {
    let questions = travel_questions();
    let responses = vec![
        Response::new("multi", Demographics::default())
            .with_answer("Q1", Answer::Multi(vec!["Q1_1".to_string()]))
            .with_answer("Q2", Answer::Single("Q2_1".to_string())),
        respondent(1, "Q1_1", "Q2_1"),
    ];

    let criteria: Criteria = [("Q1", "Q1_1"), ("Q2", "Q2_1")].into_iter().collect();
    let result = cross_tab(&criteria, &questions, &responses).unwrap();

    assert_eq!(result.base_count, 1);
    assert_eq!(result.intersection_count, 1);
    assert_eq!(result.percent_of_all, 50);
}

#[test]
fn empty_base_gives_zero_percentages() {
    let questions = travel_questions();
    let criteria: Criteria = [("Q1", "Q1_4"), ("Q2", "Q2_1")].into_iter().collect();
    let result = cross_tab(&criteria, &questions, &scenario()).unwrap();

    assert_eq!(result.base_count, 0);
    assert_eq!(result.percent_of_base, 0);
    assert_eq!(result.percent_of_all, 0);

    let empty = cross_tab(&criteria, &questions, &[]).unwrap();
    assert_eq!(empty.percent_of_all, 0);
}

#[test]
fn markdown_names_every_criterion() {
    let questions = travel_questions();
    let criteria: Criteria = [("Q1", "Q1_1"), ("Q2", "Q2_1")].into_iter().collect();
    let md = cross_tab(&criteria, &questions, &scenario())
        .unwrap()
        .to_markdown();

    assert!(md.contains("Domestic only"));
    assert!(md.contains("Beach vacation"));
    assert!(md.contains("50%"));
}
