//! Demographic filtering: the "current view" of a survey.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::survey::{DemographicField, Response};

/// Selected values per demographic field.
///
/// Keys are field names as supplied by the caller (`ageGroup`, `gender`, ...). An empty
/// selection leaves the field unconstrained and names that don't parse as a demographic field
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    selections: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSet::select`].
    pub fn with<I, S>(mut self, field: DemographicField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select(field, values);
        self
    }

    /// Add values to a field's selection.
    pub fn select<I, S>(&mut self, field: DemographicField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_named(field.as_str(), values);
    }

    /// Add values under a raw field name.
    pub fn select_named<I, S>(&mut self, field: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .entry(field.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Drop a field's selection, making it unconstrained.
    pub fn unselect(&mut self, field: DemographicField) {
        self.selections.remove(field.as_str());
    }

    /// Reset every selection.
    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn selected(&self, field: DemographicField) -> Option<&BTreeSet<String>> {
        self.selections.get(field.as_str())
    }

    /// True when no field carries a constraint.
    pub fn is_unconstrained(&self) -> bool {
        self.selections.values().all(BTreeSet::is_empty)
    }

    /// Union of both selections, field by field.
    pub fn merged(&self, other: &FilterSet) -> FilterSet {
        let mut merged = self.clone();
        for (field, values) in &other.selections {
            merged.select_named(field, values.iter().cloned());
        }
        merged
    }

    fn constraints(&self) -> Vec<(DemographicField, &BTreeSet<String>)> {
        self.selections
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .filter_map(|(name, values)| match name.parse::<DemographicField>() {
                Ok(field) => Some((field, values)),
                Err(e) => {
                    debug!(error = %e, "ignoring filter on unknown field");
                    None
                }
            })
            .collect()
    }

    /// Whether a single response passes: AND across fields, OR within a field.
    pub fn matches(&self, response: &Response) -> bool {
        matches_constraints(&self.constraints(), response)
    }
}

fn matches_constraints(
    constraints: &[(DemographicField, &BTreeSet<String>)],
    response: &Response,
) -> bool {
    constraints
        .iter()
        .all(|(field, values)| values.contains(response.demographics.get(*field)))
}

/// Responses passing `filters`, in original order. The input is left untouched.
pub fn apply(responses: &[Response], filters: &FilterSet) -> Vec<Response> {
    let constraints = filters.constraints();
    if constraints.is_empty() {
        return responses.to_vec();
    }
    responses
        .iter()
        .filter(|r| matches_constraints(&constraints, r))
        .cloned()
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("expected field=value[,value...], got {0:?}")]
    Malformed(String),
    #[error(transparent)]
    UnknownField(#[from] crate::survey::UnknownFieldError),
}

/// One `field=v1,v2` selection, as accepted on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: DemographicField,
    pub values: Vec<String>,
}

impl FromStr for FilterSpec {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, values) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::Malformed(s.to_string()))?;
        let field: DemographicField = field.parse()?;
        let values: Vec<String> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return Err(FilterParseError::Malformed(s.to_string()));
        }
        Ok(Self { field, values })
    }
}

impl FromIterator<FilterSpec> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterSpec>>(iter: I) -> Self {
        let mut filters = FilterSet::new();
        for spec in iter {
            filters.select(spec.field, spec.values);
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_spec_parses_multiple_values() {
        let spec: FilterSpec = "ageGroup=18-24, 25-34".parse().unwrap();
        assert_eq!(spec.field, DemographicField::AgeGroup);
        assert_eq!(spec.values, vec!["18-24", "25-34"]);
    }

    #[test]
    fn filter_spec_rejects_missing_values() {
        assert!(matches!(
            "gender=".parse::<FilterSpec>(),
            Err(FilterParseError::Malformed(_))
        ));
        assert!(matches!(
            "height=tall".parse::<FilterSpec>(),
            Err(FilterParseError::UnknownField(_))
        ));
    }

    #[test]
    fn empty_selection_is_unconstrained() {
        let mut filters = FilterSet::new();
        filters.select(DemographicField::Gender, Vec::<String>::new());
        assert!(filters.is_unconstrained());
    }
}
