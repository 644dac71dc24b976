use survey_insights::mock::travel_questions;
use survey_insights::schema_index::{CriteriaResolver, Criterion, SchemaIndex};
use survey_insights::survey::{Choice, Question, QuestionType};

fn target(index: &SchemaIndex, key: &str) -> Option<(String, String)> {
    index
        .lookup(key)
        .map(|c| (c.question_id.clone(), c.choice_id.clone()))
}

#[test]
fn registers_label_stripped_and_qualified_keys() {
    let questions = vec![Question::new(
        "Q5",
        "How do you explore?",
        QuestionType::SingleChoice,
        vec![Choice::new("Q5_2", "Self-guided exploration")],
    )];
    let index = SchemaIndex::build(&questions);

    let expected = Some(("Q5".to_string(), "Q5_2".to_string()));
    assert_eq!(target(&index, "self-guided exploration"), expected);
    assert_eq!(target(&index, "selfguidedexploration"), expected);
    assert_eq!(
        target(&index, "how do you explore?self-guided exploration"),
        expected
    );
    assert_eq!(index.len(), 3);
}

#[test]
fn later_questions_win_key_collisions() {
    let index = SchemaIndex::build(&travel_questions());

    // Q6 and Q7 share their likelihood labels.
    assert_eq!(
        target(&index, "very likely"),
        Some(("Q7".to_string(), "Q7_1".to_string()))
    );
}

#[test]
fn rebuilding_is_deterministic() {
    let a = SchemaIndex::build(&travel_questions());
    let b = SchemaIndex::build(&travel_questions());
    assert!(a.keys().eq(b.keys()));
}

#[test]
fn extraction_is_case_insensitive_and_one_choice_per_question() {
    let index = SchemaIndex::build(&travel_questions());

    let criteria = index.extract_criteria("CITY BREAK or Cruise for International Only folks?");
    let pairs: Vec<(&str, &str)> = criteria
        .iter()
        .map(|c| (c.question_id.as_str(), c.choice_id.as_str()))
        .collect();

    // Q2_2 and Q2_4 both match; the later key overwrites in place.
    assert_eq!(pairs, vec![("Q1", "Q1_2"), ("Q2", "Q2_4")]);
    assert_eq!(criteria.get("Q2"), Some("Q2_4"));
}

#[test]
fn keys_shorter_than_three_characters_are_ignored() {
    let index = SchemaIndex::build(&travel_questions());

    assert!(index.lookup("no").is_some());
    assert!(index.extract_criteria("no").is_empty());
    assert_eq!(
        index.extract_criteria("yes").first(),
        Some(&Criterion {
            question_id: "Q8".into(),
            choice_id: "Q8_1".into(),
        })
    );
}

#[test]
fn unrelated_text_resolves_nothing() {
    let index = SchemaIndex::build(&travel_questions());
    assert!(index.extract_criteria("how's the weather today").is_empty());
}
