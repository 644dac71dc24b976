//! One analysis session over a loaded survey.
//!
//! SurveyData and FilterSet are replaced, never edited in place; every replacement recomputes
//! the filtered view and (for data) the schema index in full.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::aggregate::{aggregate, aggregate_all, AggregateResult};
use crate::conversation::{ChatEntry, ConversationLog, Ticket};
use crate::crosstab::CrossTabResult;
use crate::demographic_split::{DemographicSplitEngine, DemographicSplitResult};
use crate::filter::{self, FilterSet};
use crate::gateway::{ChatGateway, ChatRequest, Role};
use crate::prompts::{build_messages, render_survey_context};
use crate::query::{resolve_query, QueryOutcome};
use crate::schema_index::SchemaIndex;
use crate::summary::{summarize, SurveySummary};
use crate::survey::{DemographicField, FilterOptions, Response, SurveyData};

/// Inline message shown when the completion endpoint fails.
pub const COMPLETION_FAILED: &str = "Failed to get response. Please try again.";

/// Inline message left in the log when an `ask` is dropped before its reply arrives.
pub const REQUEST_CANCELLED: &str = "Request cancelled.";

/// Answer to one query as shown on the query surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    CrossTab(CrossTabResult),
    DemographicSplit(DemographicSplitResult),
    /// Text from the completion endpoint.
    Completion(String),
    /// Completion failed; the message is what the user sees.
    Failed(String),
}

impl Reply {
    pub fn to_markdown(&self) -> String {
        match self {
            Reply::CrossTab(r) => r.to_markdown(),
            Reply::DemographicSplit(r) => r.to_markdown(),
            Reply::Completion(text) | Reply::Failed(text) => text.clone(),
        }
    }

    fn into_entry(self) -> ChatEntry {
        match self {
            Reply::Failed(text) => ChatEntry::error(text),
            other => ChatEntry::new(Role::Assistant, other.to_markdown()),
        }
    }
}

fn lock_log(log: &Mutex<ConversationLog>) -> MutexGuard<'_, ConversationLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reserved reply slot. Dropping it unfinished fills the slot with an inline error so later
/// replies are not held back forever.
struct PendingReply<'a> {
    log: &'a Mutex<ConversationLog>,
    ticket: Ticket,
    done: bool,
}

impl PendingReply<'_> {
    fn finish(mut self, entry: ChatEntry) {
        lock_log(self.log).complete(self.ticket, entry);
        self.done = true;
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.done {
            debug!(ticket = ?self.ticket, "query dropped before its reply");
            lock_log(self.log).complete(self.ticket, ChatEntry::error(REQUEST_CANCELLED));
        }
    }
}

pub struct Session {
    data: Arc<SurveyData>,
    filters: FilterSet,
    filtered: Vec<Response>,
    index: SchemaIndex,
    splitter: DemographicSplitEngine,
    log: Mutex<ConversationLog>,
}

impl Session {
    pub fn new(data: SurveyData) -> Self {
        let index = SchemaIndex::build(&data.questions);
        let filtered = data.responses.clone();
        Self {
            data: Arc::new(data),
            filters: FilterSet::new(),
            filtered,
            index,
            splitter: DemographicSplitEngine::default(),
            log: Mutex::new(ConversationLog::new()),
        }
    }

    pub fn with_splitter(mut self, splitter: DemographicSplitEngine) -> Self {
        self.splitter = splitter;
        self
    }

    /// Swap in newly uploaded data. Current filters are kept and re-applied.
    pub fn replace_data(&mut self, data: SurveyData) {
        self.index = SchemaIndex::build(&data.questions);
        self.data = Arc::new(data);
        self.refilter();
    }

    pub fn set_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
        self.refilter();
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(FilterSet::new());
    }

    fn refilter(&mut self) {
        self.filtered = filter::apply(&self.data.responses, &self.filters);
        debug!(
            total = self.data.responses.len(),
            filtered = self.filtered.len(),
            "recomputed filtered view"
        );
    }

    pub fn data(&self) -> &SurveyData {
        &self.data
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn filtered_responses(&self) -> &[Response] {
        &self.filtered
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn filter_options(&self) -> FilterOptions {
        self.data.filter_options()
    }

    /// Aggregate one question over the filtered view.
    pub fn aggregate(&self, question_id: &str) -> Option<AggregateResult> {
        self.data
            .question(question_id)
            .map(|q| aggregate(q, &self.filtered))
    }

    pub fn aggregate_all(&self) -> Vec<AggregateResult> {
        aggregate_all(&self.data.questions, &self.filtered)
    }

    pub fn summary(&self) -> SurveySummary {
        summarize(&self.data, &self.filtered)
    }

    /// Resolve a query locally, without touching the chat log.
    pub fn resolve(&self, query: &str) -> QueryOutcome {
        resolve_query(&self.index, &self.splitter, &self.data, &self.filtered, query)
    }

    /// Context block sent to the completion endpoint for `query`.
    pub fn survey_context(&self, query: &str) -> String {
        render_survey_context(
            &self.data.questions,
            &self.filtered,
            DemographicField::detect(query),
        )
    }

    fn log(&self) -> MutexGuard<'_, ConversationLog> {
        lock_log(&self.log)
    }

    pub fn chat_log(&self) -> Vec<ChatEntry> {
        self.log().entries().to_vec()
    }

    /// Answer a query, falling back to the completion endpoint when the local engines can't.
    ///
    /// The reply is appended to the chat log in submission order. Failures become an inline
    /// error entry and never affect the survey state. If the returned future is dropped early,
    /// its slot is filled with [`REQUEST_CANCELLED`].
    pub async fn ask<G: ChatGateway + ?Sized>(&self, gateway: &G, query: &str) -> Reply {
        let (history, pending) = {
            let mut log = self.log();
            let history = log.history();
            let pending = PendingReply {
                log: &self.log,
                ticket: log.submit(query),
                done: false,
            };
            (history, pending)
        };

        let reply = match self.resolve(query) {
            QueryOutcome::CrossTab(r) => Reply::CrossTab(r),
            QueryOutcome::DemographicSplit(r) => Reply::DemographicSplit(r),
            QueryOutcome::Unresolved => {
                let context = self.survey_context(query);
                let request = ChatRequest::new(build_messages(&context, &history, query));
                match gateway.chat(request).await {
                    Ok(resp) => Reply::Completion(resp.content),
                    Err(e) => {
                        warn!(code = e.code(), error = %e, "completion request failed");
                        Reply::Failed(COMPLETION_FAILED.to_string())
                    }
                }
            }
        };

        pending.finish(reply.clone().into_entry());
        reply
    }
}
