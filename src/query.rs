//! Routing a free-text query through the local engines.

use serde::Serialize;
use tracing::debug;

use crate::crosstab::{self, CrossTabResult};
use crate::demographic_split::{DemographicSplitEngine, DemographicSplitResult};
use crate::schema_index::CriteriaResolver;
use crate::survey::{Response, SurveyData};

/// What the local engines made of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    CrossTab(CrossTabResult),
    DemographicSplit(DemographicSplitResult),
    /// Neither engine activated; the caller should fall back to the completion endpoint.
    Unresolved,
}

impl QueryOutcome {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, QueryOutcome::Unresolved)
    }

    pub fn to_markdown(&self) -> Option<String> {
        match self {
            QueryOutcome::CrossTab(r) => Some(r.to_markdown()),
            QueryOutcome::DemographicSplit(r) => Some(r.to_markdown()),
            QueryOutcome::Unresolved => None,
        }
    }
}

/// Cross-tab first, then demographic split, else unresolved.
pub fn resolve_query<R: CriteriaResolver + ?Sized>(
    resolver: &R,
    splitter: &DemographicSplitEngine,
    survey: &SurveyData,
    responses: &[Response],
    query: &str,
) -> QueryOutcome {
    if let Some(result) = crosstab::resolve(resolver, &survey.questions, responses, query) {
        debug!(base = %result.base_label, "query resolved as cross-tab");
        return QueryOutcome::CrossTab(result);
    }
    if let Some(result) = splitter.resolve(resolver, survey, responses, query) {
        debug!(field = %result.field, "query resolved as demographic split");
        return QueryOutcome::DemographicSplit(result);
    }
    debug!("query unresolved");
    QueryOutcome::Unresolved
}
