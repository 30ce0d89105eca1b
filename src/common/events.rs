use crate::sync::TranslationEntry;

use super::types::{Message, Notice};

/// Sự kiện từ chat session gửi lên UI.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Bulk load finished (successfully or not).
    Loaded,
    /// Ordered snapshot after a store mutation.
    MessagesChanged(Vec<Message>),
    TranslationChanged {
        message_id: String,
        entry: TranslationEntry,
    },
    Notice(Notice),
}
