use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::TranslationError;

use super::Translator;

/// Calls a translate function over HTTP.
///
/// Request body `{"text", "targetLanguage"}`; the reply carries either
/// `translatedText` or `error`.
pub struct HttpTranslator {
    client: Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

impl HttpTranslator {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

impl TranslateResponse {
    fn into_text(self) -> Result<String, TranslationError> {
        if let Some(error) = self.error {
            return Err(TranslationError::Service(error));
        }
        match self.translated_text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(TranslationError::MissingText),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        let mut request = self.client.post(&self.url).json(&TranslateRequest {
            text,
            target_language,
        });
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }

        response.json::<TranslateResponse>().await?.into_text()
    }
}

/// Stand-in when no translate endpoint is configured.
pub struct UnavailableTranslator;

#[async_trait]
impl Translator for UnavailableTranslator {
    async fn translate(
        &self,
        _text: &str,
        _target_language: &str,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Unavailable)
    }
}
