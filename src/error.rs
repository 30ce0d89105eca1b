use thiserror::Error;

/// Bulk fetch, insert or subscription failure.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend task failed: {0}")]
    Task(String),
}

/// Translation call failure. Captured into the entry's `error` state, never
/// propagated to the caller of a translation request.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translate service responded with status {0}")]
    Status(u16),

    #[error("translate service error: {0}")]
    Service(String),

    #[error("translate service returned no text")]
    MissingText,

    #[error("no translate service configured")]
    Unavailable,
}
