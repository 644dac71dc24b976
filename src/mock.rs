//! Synthetic travel survey for demos and tests.
//!
//! Single-choice answers are drawn from skewed distributions so charts look realistic; weights
//! are uniform in `[1.0, 1.5)`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::survey::{
    Answer, Choice, Demographics, Question, QuestionType, Response, SurveyData,
};

const AGE_GROUPS: &[&str] = &["18-24", "25-34", "35-44", "45-54", "55-64", "65+"];
const GENDERS: &[&str] = &["Male", "Female", "Non-binary", "Prefer not to say"];
const FAMILY_COMPOSITIONS: &[&str] = &[
    "Single",
    "Couple, no children",
    "Family with young children",
    "Family with older children",
    "Empty nester",
];
const INCOME_RANGES: &[&str] = &[
    "Under $30k",
    "$30k-$60k",
    "$60k-$100k",
    "$100k-$150k",
    "Over $150k",
];
const REGIONS: &[&str] = &[
    "Northeast",
    "Southeast",
    "Midwest",
    "Southwest",
    "West",
    "Outside US",
];

// Cumulative thresholds; the last choice takes the remainder.
const Q1_SPLIT: &[(&str, f64)] = &[("Q1_1", 0.53), ("Q1_2", 0.69), ("Q1_3", 0.85)];
const Q2_SPLIT: &[(&str, f64)] = &[
    ("Q2_1", 0.29),
    ("Q2_2", 0.57),
    ("Q2_3", 0.78),
    ("Q2_4", 0.89),
];
const Q6_SPLIT: &[(&str, f64)] = &[("Q6_1", 0.25), ("Q6_2", 0.55), ("Q6_3", 0.80)];
const Q7_SPLIT: &[(&str, f64)] = &[("Q7_1", 0.30), ("Q7_2", 0.60), ("Q7_3", 0.85)];

fn choices(question_id: &str, texts: &[&str]) -> Vec<Choice> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| Choice::new(format!("{question_id}_{}", i + 1), *text))
        .collect()
}

/// The eight-question travel survey schema.
pub fn travel_questions() -> Vec<Question> {
    const LIKELIHOOD: &[&str] = &[
        "Very likely",
        "Somewhat likely",
        "Not very likely",
        "Not at all likely",
    ];

    vec![
        Question::new(
            "Q1",
            "Do you plan on traveling domestically or internationally in the next 12 months?",
            QuestionType::SingleChoice,
            choices(
                "Q1",
                &[
                    "Domestic only",
                    "International only",
                    "Both domestic and international",
                    "No travel plans",
                ],
            ),
        ),
        Question::new(
            "Q2",
            "What type of trip are you planning next for travel in the coming 12 months?",
            QuestionType::SingleChoice,
            choices(
                "Q2",
                &[
                    "Beach vacation",
                    "City break",
                    "Adventure trip",
                    "Cruise",
                    "Cultural tour",
                ],
            ),
        ),
        Question::new(
            "Q3",
            "Which of the following resources would you use the most during listed phases of a travel booking journey?",
            QuestionType::MultipleChoice,
            choices(
                "Q3",
                &[
                    "Travel websites",
                    "Social media",
                    "Travel agents",
                    "Friends and family recommendations",
                    "Review sites",
                ],
            ),
        ),
        Question::new(
            "Q4",
            "How likely are you to agree with the following statements?",
            QuestionType::Scale,
            choices(
                "Q4",
                &[
                    "I prefer to book all-inclusive packages",
                    "I like to plan my own itinerary",
                    "Price is more important than destination",
                    "I prefer luxury travel experiences",
                ],
            ),
        ),
        Question::new(
            "Q5",
            "Considering your potential trip in the next 12 months, how best do you like to travel and explore the destination and various experiences?",
            QuestionType::SingleChoice,
            choices(
                "Q5",
                &[
                    "Guided tours",
                    "Self-guided exploration",
                    "Mix of guided and self-guided",
                    "Resort/hotel stay with limited exploration",
                ],
            ),
        ),
        Question::new(
            "Q6",
            "Once you have decided your destination and travel dates, How likely are you to change your destination if you find a cheaper flight?",
            QuestionType::SingleChoice,
            choices("Q6", LIKELIHOOD),
        ),
        Question::new(
            "Q7",
            "Once you have decided your destination and travel dates, How likely are you to change your destination if you find a cheaper packed holiday deal?",
            QuestionType::SingleChoice,
            choices("Q7", LIKELIHOOD),
        ),
        Question::new(
            "Q8",
            "Have you recently booked any trip in the last 6 months?",
            QuestionType::SingleChoice,
            vec![Choice::new("Q8_1", "Yes"), Choice::new("Q8_2", "No")],
        ),
    ]
}

fn pick_weighted(rng: &mut impl Rng, split: &[(&str, f64)], rest: &str) -> String {
    let roll: f64 = rng.gen_range(0.0..1.0);
    split
        .iter()
        .find(|(_, threshold)| roll < *threshold)
        .map(|(id, _)| *id)
        .unwrap_or(rest)
        .to_string()
}

fn pick<'a>(rng: &mut impl Rng, values: &[&'a str]) -> &'a str {
    values[rng.gen_range(0..values.len())]
}

fn mock_response(rng: &mut impl Rng, index: usize) -> Response {
    let demographics = Demographics {
        age_group: pick(rng, AGE_GROUPS).to_string(),
        gender: pick(rng, GENDERS).to_string(),
        family_composition: pick(rng, FAMILY_COMPOSITIONS).to_string(),
        income_range: pick(rng, INCOME_RANGES).to_string(),
        region: pick(rng, REGIONS).to_string(),
    };

    let mut resources: Vec<String> = (1..=5).map(|i| format!("Q3_{i}")).collect();
    resources.shuffle(rng);
    resources.truncate(rng.gen_range(1..=3));

    let agreement = (1..=4)
        .map(|i| (format!("Q4_{i}"), rng.gen_range(1..=5) as f64))
        .collect();

    Response::new(format!("resp_{index}"), demographics)
        .with_answer("Q1", Answer::Single(pick_weighted(rng, Q1_SPLIT, "Q1_4")))
        .with_answer("Q2", Answer::Single(pick_weighted(rng, Q2_SPLIT, "Q2_5")))
        .with_answer("Q3", Answer::Multi(resources))
        .with_answer("Q4", Answer::Scale(agreement))
        .with_answer(
            "Q5",
            Answer::Single(format!("Q5_{}", rng.gen_range(1..=4))),
        )
        .with_answer("Q6", Answer::Single(pick_weighted(rng, Q6_SPLIT, "Q6_4")))
        .with_answer("Q7", Answer::Single(pick_weighted(rng, Q7_SPLIT, "Q7_4")))
        .with_answer(
            "Q8",
            Answer::Single(if rng.gen_bool(0.65) { "Q8_1" } else { "Q8_2" }.to_string()),
        )
        .with_weight(rng.gen_range(1.0..1.5))
}

/// Generate `count` responses for the travel survey. The same seed yields the same data.
pub fn travel_survey(count: usize, seed: u64) -> SurveyData {
    let mut rng = StdRng::seed_from_u64(seed);
    SurveyData {
        title: "Travel Survey 2025".to_string(),
        description: "Annual travel habits and preferences survey".to_string(),
        questions: travel_questions(),
        responses: (0..count).map(|i| mock_response(&mut rng, i)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_survey() {
        assert_eq!(travel_survey(20, 7), travel_survey(20, 7));
    }

    #[test]
    fn multi_select_picks_one_to_three_distinct_resources() {
        let survey = travel_survey(100, 1);
        for r in &survey.responses {
            let Some(Answer::Multi(ids)) = r.answer("Q3") else {
                panic!("Q3 should be multi-select");
            };
            assert!((1..=3).contains(&ids.len()));
            let mut sorted = ids.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), ids.len());
            assert!((1.0..1.5).contains(&r.weight));
        }
    }
}
