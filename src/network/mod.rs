pub mod local;
pub mod rest;
pub mod subscription;
pub mod translator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::Message;
use crate::config::{AppConfig, BackendConfig};
use crate::error::{BackendError, TranslationError};

pub use local::LocalBackend;
pub use rest::RestBackend;
pub use subscription::Subscription;
pub use translator::{HttpTranslator, UnavailableTranslator};

/// Append-only message log with a push channel.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// Full history, ascending by `created_at`.
    async fn fetch_all_messages(&self) -> Result<Vec<Message>, BackendError>;

    /// The stored row comes back through every open subscription, this
    /// caller's included.
    async fn insert_message(&self, sender: &str, content: &str) -> Result<(), BackendError>;

    /// Open a push channel delivering messages inserted from now on. The
    /// same message may be delivered more than once.
    async fn subscribe_to_new_messages(&self) -> Result<Subscription, BackendError>;
}

#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn translate(&self, text: &str, target_language: &str)
    -> Result<String, TranslationError>;
}

/// Build the configured message backend.
pub fn backend_from_config(config: &BackendConfig) -> Result<Arc<dyn ChatBackend>, BackendError> {
    match config {
        BackendConfig::Local {
            database_path,
            poll_interval_ms,
        } => {
            log::info!("Using local message log at {database_path}");
            let backend = LocalBackend::open(database_path, Duration::from_millis(*poll_interval_ms))?;
            Ok(Arc::new(backend))
        }
        BackendConfig::Rest {
            url,
            api_key,
            poll_interval_ms,
        } => {
            log::info!("Using REST backend at {url}");
            Ok(Arc::new(RestBackend::new(
                url,
                api_key.clone(),
                Duration::from_millis(*poll_interval_ms),
            )))
        }
    }
}

pub fn translator_from_config(config: &AppConfig) -> Arc<dyn Translator> {
    match &config.translate_url {
        Some(url) => Arc::new(HttpTranslator::new(url.clone(), config.translate_api_key.clone())),
        None => {
            log::warn!("No translate_url configured; translations will fail");
            Arc::new(UnavailableTranslator)
        }
    }
}
