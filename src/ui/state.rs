use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::common::{Message, Notice, SessionEvent};
use crate::sync::TranslationEntry;

const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Trạng thái cục bộ của UI, dựng lại từ các SessionEvent.
pub struct AppState {
    pub messages: Vec<Message>,
    pub translations: HashMap<String, TranslationEntry>,
    pub input_text: String,
    pub is_loading: bool,
    pub notices: Vec<(Instant, Notice)>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            translations: HashMap::new(),
            input_text: String::new(),
            is_loading: true,
            notices: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Loaded => self.is_loading = false,
            SessionEvent::MessagesChanged(messages) => self.messages = messages,
            SessionEvent::TranslationChanged { message_id, entry } => {
                self.translations.insert(message_id, entry);
            }
            SessionEvent::Notice(notice) => self.notices.push((Instant::now(), notice)),
        }
    }

    pub fn translation(&self, message_id: &str) -> TranslationEntry {
        self.translations
            .get(message_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn expire_notices(&mut self, now: Instant) {
        self.notices
            .retain(|(shown_at, _)| now.duration_since(*shown_at) < NOTICE_TTL);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Login form fields.
#[derive(Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub show_password: bool,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn with_username(username: Option<String>) -> Self {
        Self {
            username: username.unwrap_or_default(),
            ..Self::default()
        }
    }
}
