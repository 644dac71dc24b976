use survey_insights::filter::{apply, FilterParseError, FilterSet, FilterSpec};
use survey_insights::mock;
use survey_insights::survey::{DemographicField, Demographics, Response};

fn person(id: &str, age: &str, gender: &str) -> Response {
    Response::new(
        id,
        Demographics {
            age_group: age.to_string(),
            gender: gender.to_string(),
            ..Demographics::default()
        },
    )
}

fn people() -> Vec<Response> {
    vec![
        person("r1", "25-34", "Female"),
        person("r2", "18-24", "Female"),
        person("r3", "25-34", "Male"),
        person("r4", "35-44", "Female"),
        person("r5", "25-34", "Female"),
    ]
}

fn ids(responses: &[Response]) -> Vec<&str> {
    responses.iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn empty_filter_keeps_everything_in_order() {
    let all = people();
    let out = apply(&all, &FilterSet::new());
    assert_eq!(out, all);
}

#[test]
fn or_within_field_and_across_fields() {
    let filters = FilterSet::new()
        .with(DemographicField::AgeGroup, ["25-34", "35-44"])
        .with(DemographicField::Gender, ["Female"]);

    let out = apply(&people(), &filters);
    assert_eq!(ids(&out), vec!["r1", "r4", "r5"]);
}

#[test]
fn applying_twice_is_the_same_as_once() {
    let survey = mock::travel_survey(300, 11);
    let filters = FilterSet::new()
        .with(DemographicField::Region, ["West", "Midwest"])
        .with(DemographicField::IncomeRange, ["$60k-$100k"]);

    let once = apply(&survey.responses, &filters);
    let twice = apply(&once, &filters);
    assert_eq!(once, twice);
}

#[test]
fn merged_filters_equal_sequential_application() {
    let gender = FilterSet::new().with(DemographicField::Gender, ["Female"]);
    let age = FilterSet::new().with(DemographicField::AgeGroup, ["25-34"]);

    let sequential = apply(&apply(&people(), &gender), &age);
    let combined = apply(&people(), &gender.merged(&age));

    assert_eq!(sequential, combined);
    assert_eq!(ids(&combined), vec!["r1", "r5"]);
}

#[test]
fn empty_selection_and_unknown_field_impose_nothing() {
    let mut filters = FilterSet::new();
    filters.select(DemographicField::Gender, Vec::<String>::new());
    filters.select_named("favouriteColour", ["Blue"]);

    assert!(!filters.is_unconstrained());
    assert_eq!(apply(&people(), &filters).len(), 5);
}

#[test]
fn clearing_restores_the_full_view() {
    let mut filters = FilterSet::new().with(DemographicField::AgeGroup, ["18-24"]);
    assert_eq!(apply(&people(), &filters).len(), 1);

    filters.clear();
    assert!(filters.is_unconstrained());
    assert_eq!(apply(&people(), &filters).len(), 5);
}

#[test]
fn filter_specs_parse_from_cli_syntax() {
    let spec: FilterSpec = "ageGroup=18-24, 25-34".parse().unwrap();
    assert_eq!(spec.field, DemographicField::AgeGroup);
    assert_eq!(spec.values, vec!["18-24", "25-34"]);

    assert!(matches!(
        "gender".parse::<FilterSpec>(),
        Err(FilterParseError::Malformed(_))
    ));
    assert!(matches!(
        "shoeSize=42".parse::<FilterSpec>(),
        Err(FilterParseError::UnknownField(_))
    ));

    let filters: FilterSet = vec![spec].into_iter().collect();
    assert_eq!(ids(&apply(&people(), &filters)), vec!["r1", "r2", "r3", "r5"]);
}
