pub mod auth;
pub mod common;
pub mod config;
pub mod error;
pub mod network;
pub mod storage;
pub mod sync;
pub mod ui;

pub use common::{Identity, Message, Notice, SessionCommand, SessionEvent};
pub use error::{BackendError, TranslationError};
pub use sync::{ChatSession, MessageStore, TranslationCache, TranslationEntry};
