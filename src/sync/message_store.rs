use std::collections::HashSet;

use chrono::Local;

use crate::common::Message;

use super::day_groups::{DayGroup, group_by_day};

/// Result of feeding one message into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted { index: usize },
    /// Id already present. Expected for push echoes of our own sends and
    /// for redeliveries after reconnect.
    DuplicateIgnored,
}

/// Ordered, duplicate-free view of every message visible to a session.
///
/// Entries are sorted by `created_at`; equal timestamps keep arrival order.
/// Nothing is ever removed.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    ids: HashSet<String>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a bulk-load result.
    pub fn load_initial(&mut self, messages: Vec<Message>) {
        self.messages.clear();
        self.ids.clear();

        for message in messages {
            if self.ids.insert(message.id.clone()) {
                self.messages.push(message);
            } else {
                log::debug!("Bulk load contained duplicate id {}", message.id);
            }
        }
        // sort_by_key is stable, so equal timestamps keep backend order
        self.messages.sort_by_key(|message| message.created_at);
    }

    /// Push-channel handler.
    pub fn ingest(&mut self, message: Message) -> IngestOutcome {
        if self.ids.contains(&message.id) {
            log::debug!("Ignoring duplicate delivery of message {}", message.id);
            return IngestOutcome::DuplicateIgnored;
        }

        let index = self
            .messages
            .partition_point(|existing| existing.created_at <= message.created_at);
        self.ids.insert(message.id.clone());
        self.messages.insert(index, message);
        IngestOutcome::Inserted { index }
    }

    /// Optimistic local insert. Same idempotency rule as [`ingest`](Self::ingest),
    /// so the authoritative echo carrying the same id is suppressed later.
    pub fn append(&mut self, message: Message) -> IngestOutcome {
        self.ingest(message)
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Day groups in local time, recomputed on every call.
    pub fn day_groups(&self) -> Vec<DayGroup<'_>> {
        group_by_day(&self.messages, &Local)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        if !self.ids.contains(id) {
            return None;
        }
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
