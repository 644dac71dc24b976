//! Chat log for the query surface.
//!
//! Replies are appended in submission order: each query takes a ticket when it is submitted
//! and its reply is held back until every earlier ticket has completed, so a fast answer to a
//! later query never lands above a slow answer to an earlier one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::gateway::{Message, Role};
use crate::prompts::GREETING;

/// One visible entry of the chat log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Inline error shown in place of an answer; never forwarded as history.
    pub is_error: bool,
}

impl ChatEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Assistant, content)
        }
    }
}

/// Position reserved for a reply that hasn't arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct ConversationLog {
    entries: Vec<ChatEntry>,
    next_ticket: u64,
    next_to_flush: u64,
    pending: BTreeMap<u64, ChatEntry>,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLog {
    /// Empty log seeded with the assistant greeting.
    pub fn new() -> Self {
        Self {
            entries: vec![ChatEntry::new(Role::Assistant, GREETING)],
            next_ticket: 0,
            next_to_flush: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Record a user query and reserve the slot for its reply.
    pub fn submit(&mut self, query: &str) -> Ticket {
        self.entries.push(ChatEntry::new(Role::User, query));
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Deliver the reply for `ticket`. It becomes visible once all earlier tickets have.
    pub fn complete(&mut self, ticket: Ticket, entry: ChatEntry) {
        if ticket.0 < self.next_to_flush {
            return;
        }
        self.pending.insert(ticket.0, entry);
        while let Some(entry) = self.pending.remove(&self.next_to_flush) {
            self.entries.push(entry);
            self.next_to_flush += 1;
        }
    }

    /// Number of replies still outstanding or held back.
    pub fn in_flight(&self) -> usize {
        (self.next_ticket - self.next_to_flush) as usize
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Visible turns as completion history, inline errors excluded.
    pub fn history(&self) -> Vec<Message> {
        self.entries
            .iter()
            .filter(|e| !e.is_error && e.role != Role::System)
            .map(|e| Message {
                role: e.role,
                content: e.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_completion_is_held_back() {
        let mut log = ConversationLog::new();
        let first = log.submit("first?");
        let second = log.submit("second?");

        log.complete(second, ChatEntry::new(Role::Assistant, "second!"));
        assert_eq!(log.in_flight(), 2);
        assert_eq!(log.entries().last().unwrap().content, "second?");

        log.complete(first, ChatEntry::new(Role::Assistant, "first!"));
        assert_eq!(log.in_flight(), 0);
        let contents: Vec<&str> = log.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec![GREETING, "first?", "second?", "first!", "second!"]);
    }

    #[test]
    fn history_skips_inline_errors() {
        let mut log = ConversationLog::new();
        let t = log.submit("q");
        log.complete(t, ChatEntry::error("Failed to get response. Please try again."));
        let history = log.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], Message::user("q"));
    }
}
