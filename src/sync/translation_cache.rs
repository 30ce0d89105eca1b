use std::collections::HashMap;

use crate::error::TranslationError;

/// Short label presentation shows for an entry in the `Error` state.
pub const ERROR_LABEL: &str = "Translation failed";

/// Per-message translation overlay.
///
/// `text` only exists once a translation has been fetched; it is kept for the
/// lifetime of the entry and re-shown without another fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TranslationEntry {
    #[default]
    Absent,
    Loading {
        ticket: u64,
    },
    Ready {
        text: String,
    },
    Hidden {
        text: String,
    },
    Error {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationState {
    Absent,
    Loading,
    Ready,
    Hidden,
    Error,
}

impl TranslationEntry {
    pub fn state(&self) -> TranslationState {
        match self {
            Self::Absent => TranslationState::Absent,
            Self::Loading { .. } => TranslationState::Loading,
            Self::Ready { .. } => TranslationState::Ready,
            Self::Hidden { .. } => TranslationState::Hidden,
            Self::Error { .. } => TranslationState::Error,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ready { text } | Self::Hidden { text } => Some(text),
            _ => None,
        }
    }

    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Self::Error { reason } => Some(reason),
            _ => None,
        }
    }

    /// Translated text currently on screen.
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            Self::Ready { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Button caption.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "Hide",
            _ => "Translate",
        }
    }
}

/// Work the caller has to hand to the translator. Exactly one job exists per
/// `Loading` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub message_id: String,
    pub ticket: u64,
    pub text: String,
    pub target_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAction {
    /// Entry moved to `Loading`; dispatch the job.
    Fetch(TranslationJob),
    /// Cached translation shown or hidden, no network access.
    Toggled { visible: bool },
    /// A fetch for this id is already in flight.
    Pending,
}

/// Translation state per message id. Holds no entries for the current user's
/// own messages because callers never request them.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<String, TranslationEntry>,
    next_ticket: u64,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, message_id: &str) -> Option<&TranslationEntry> {
        self.entries.get(message_id)
    }

    pub fn entry(&self, message_id: &str) -> TranslationEntry {
        self.entries.get(message_id).cloned().unwrap_or_default()
    }

    pub fn state(&self, message_id: &str) -> TranslationState {
        self.entries
            .get(message_id)
            .map_or(TranslationState::Absent, TranslationEntry::state)
    }

    /// Request a translation, or flip visibility if one is cached.
    ///
    /// `target_language` is only read when a fetch starts; a cached
    /// translation is never invalidated by a different language.
    pub fn request(
        &mut self,
        message_id: &str,
        content: &str,
        target_language: &str,
    ) -> RequestAction {
        match self.state(message_id) {
            TranslationState::Loading => RequestAction::Pending,
            TranslationState::Ready | TranslationState::Hidden => RequestAction::Toggled {
                visible: self.toggle(message_id).unwrap_or(false),
            },
            TranslationState::Absent | TranslationState::Error => {
                self.next_ticket += 1;
                let ticket = self.next_ticket;
                self.entries
                    .insert(message_id.to_string(), TranslationEntry::Loading { ticket });

                RequestAction::Fetch(TranslationJob {
                    message_id: message_id.to_string(),
                    ticket,
                    text: content.to_string(),
                    target_language: target_language.to_string(),
                })
            }
        }
    }

    /// Apply the outcome of a job. Returns `false` when the entry is no longer
    /// waiting for that ticket.
    pub fn resolve(
        &mut self,
        message_id: &str,
        ticket: u64,
        result: Result<String, TranslationError>,
    ) -> bool {
        match self.entries.get(message_id) {
            Some(TranslationEntry::Loading { ticket: pending }) if *pending == ticket => {}
            _ => {
                log::debug!("Dropping stale translation outcome for {message_id} (ticket {ticket})");
                return false;
            }
        }

        let entry = match result {
            Ok(text) => TranslationEntry::Ready { text },
            Err(err) => {
                log::warn!("Translation of {message_id} failed: {err}");
                TranslationEntry::Error {
                    reason: err.to_string(),
                }
            }
        };
        self.entries.insert(message_id.to_string(), entry);
        true
    }

    /// Flip a cached translation between shown and hidden. Returns the new
    /// visibility, or `None` if nothing is cached.
    pub fn toggle(&mut self, message_id: &str) -> Option<bool> {
        let entry = self.entries.get_mut(message_id)?;
        let next = match std::mem::take(entry) {
            TranslationEntry::Ready { text } => TranslationEntry::Hidden { text },
            TranslationEntry::Hidden { text } => TranslationEntry::Ready { text },
            other => {
                *entry = other;
                return None;
            }
        };
        let visible = matches!(next, TranslationEntry::Ready { .. });
        *entry = next;
        Some(visible)
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.is_loading())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
