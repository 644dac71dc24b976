//! Keyword lookup from free text to `(question, choice)` pairs.
//!
//! The index is a substring heuristic: every choice registers a handful of normalized keys and
//! a query resolves to whatever keys it contains. Consumers only see the [`CriteriaResolver`]
//! trait so a stricter matcher can be dropped in later.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::survey::Question;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("Invalid non-alphanumeric regex"));

/// Keys this short are never matched; they hit too much unrelated text.
const MIN_KEY_LEN: usize = 3;

/// A resolved `(question, choice)` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub question_id: String,
    pub choice_id: String,
}

/// Ordered question → choice mapping with at most one choice per question.
///
/// Re-inserting a question replaces its choice but keeps the position of the first insert, so
/// "first criterion" stays stable while later matches refine the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Criteria {
    entries: Vec<Criterion>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question_id: impl Into<String>, choice_id: impl Into<String>) {
        let question_id = question_id.into();
        let choice_id = choice_id.into();
        match self.entries.iter_mut().find(|c| c.question_id == question_id) {
            Some(existing) => existing.choice_id = choice_id,
            None => self.entries.push(Criterion {
                question_id,
                choice_id,
            }),
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.question_id == question_id)
            .map(|c| c.choice_id.as_str())
    }

    /// Number of distinct questions resolved.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&Criterion> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.entries.iter()
    }
}

impl<Q: Into<String>, C: Into<String>> FromIterator<(Q, C)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (Q, C)>>(iter: I) -> Self {
        let mut criteria = Criteria::new();
        for (q, c) in iter {
            criteria.insert(q, c);
        }
        criteria
    }
}

/// Resolves free text into criteria.
pub trait CriteriaResolver {
    fn extract_criteria(&self, text: &str) -> Criteria;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    key: String,
    target: Criterion,
}

/// Keyword table built from question and choice text.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}

impl SchemaIndex {
    /// Register three keys per choice: the lowercased choice text, the same with everything
    /// outside `[a-z0-9]` stripped, and the lowercased question text followed by choice text.
    ///
    /// Colliding keys resolve to the last registration in schema order.
    pub fn build(questions: &[Question]) -> Self {
        let mut index = Self::default();
        for question in questions {
            for choice in &question.choices {
                let label = choice.text.to_lowercase();
                let stripped = NON_ALPHANUMERIC.replace_all(&label, "").into_owned();
                let qualified = format!("{}{}", question.text, choice.text).to_lowercase();

                for key in [label, stripped, qualified] {
                    index.register(key, &question.id, &choice.id);
                }
            }
        }
        index
    }

    fn register(&mut self, key: String, question_id: &str, choice_id: &str) {
        let target = Criterion {
            question_id: question_id.to_string(),
            choice_id: choice_id.to_string(),
        };
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].target = target,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push(IndexEntry { key, target });
            }
        }
    }

    /// Look up the target of an exact key.
    pub fn lookup(&self, key: &str) -> Option<&Criterion> {
        self.positions.get(key).map(|&pos| &self.entries[pos].target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }
}

impl CriteriaResolver for SchemaIndex {
    fn extract_criteria(&self, text: &str) -> Criteria {
        let haystack = text.to_lowercase();
        let mut criteria = Criteria::new();
        for entry in &self.entries {
            if entry.key.chars().count() < MIN_KEY_LEN {
                continue;
            }
            if haystack.contains(entry.key.as_str()) {
                criteria.insert(
                    entry.target.question_id.as_str(),
                    entry.target.choice_id.as_str(),
                );
            }
        }
        criteria
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_reinsert_keeps_first_position() {
        let mut criteria = Criteria::new();
        criteria.insert("Q1", "Q1_1");
        criteria.insert("Q2", "Q2_1");
        criteria.insert("Q1", "Q1_3");

        let pairs: Vec<_> = criteria
            .iter()
            .map(|c| (c.question_id.as_str(), c.choice_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Q1", "Q1_3"), ("Q2", "Q2_1")]);
    }

    #[test]
    fn stripped_key_removes_spaces_and_punctuation() {
        let stripped = NON_ALPHANUMERIC.replace_all("resort/hotel stay", "");
        assert_eq!(stripped, "resorthotelstay");
    }
}
