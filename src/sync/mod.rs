pub mod day_groups;
pub mod message_store;
pub mod session;
pub mod translation_cache;

pub use day_groups::{DayGroup, day_header, group_by_day};
pub use message_store::{IngestOutcome, MessageStore};
pub use session::{ChatSession, Completion, TranslationRejected};
pub use translation_cache::{
    ERROR_LABEL, RequestAction, TranslationCache, TranslationEntry, TranslationJob,
    TranslationState,
};
