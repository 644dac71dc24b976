#![forbid(unsafe_code)]

//! # survey-insights
//!
//! Analytics over a survey's responses: weighted per-question aggregates, demographic
//! filtering, and a free-text query surface.
//!
//! Queries are resolved locally where possible. Naming two answer choices yields a cross-tab
//! ("of people who chose A, how many also chose B?"); naming a demographic dimension plus an
//! answer yields a demographic split. Anything else is forwarded to a chat-completion endpoint
//! together with a compact rendering of the current aggregates.

pub mod aggregate;
pub mod conversation;
pub mod crosstab;
pub mod demographic_split;
pub mod filter;
pub mod gateway;
pub mod mock;
pub mod prompts;
pub mod query;
pub mod schema_index;
pub mod session;
pub mod summary;
pub mod survey;

pub use aggregate::{aggregate, aggregate_all, AggregateResult, AggregateRow};
pub use crosstab::{cross_tab, CrossTabResult};
pub use demographic_split::{split, DemographicSplitEngine, DemographicSplitResult};
pub use filter::{FilterSet, FilterSpec};
pub use gateway::{ChatGateway, CompletionError, CompletionGateway};
pub use query::{resolve_query, QueryOutcome};
pub use schema_index::{Criteria, CriteriaResolver, Criterion, SchemaIndex};
pub use session::{Reply, Session};
pub use survey::{
    Answer, Choice, DemographicField, Demographics, Question, QuestionType, Response, SurveyData,
};
