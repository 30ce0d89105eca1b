use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::common::Message;
use crate::error::BackendError;

use super::{ChatBackend, Subscription};

/// How far behind the newest delivered row each poll looks. Rows can commit
/// out of `created_at` order; anything committed within this window of the
/// newest row is still picked up.
const LOOKBACK_SECS: i64 = 30;

/// PostgREST-style HTTP backend over a `messages` table.
pub struct RestBackend {
    endpoint: Endpoint,
    poll_interval: Duration,
}

#[derive(Clone)]
struct Endpoint {
    client: Client,
    messages_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    sender: &'a str,
    content: &'a str,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: Option<String>, poll_interval: Duration) -> Self {
        Self {
            endpoint: Endpoint {
                client: Client::new(),
                messages_url: format!("{}/rest/v1/messages", base_url.trim_end_matches('/')),
                api_key,
            },
            poll_interval,
        }
    }

    /// Start polling after the newest stored row. When that lookup fails the
    /// poller starts from the beginning of the table instead; the session
    /// drops rows it already has.
    async fn seed_cursor(&self) -> Cursor {
        let newest = self
            .endpoint
            .select(&[
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .await;
        match newest {
            Ok(rows) => Cursor::seeded(rows.first()),
            Err(err) => {
                log::warn!("Could not read newest message, polling from the start: {err}");
                Cursor::default()
            }
        }
    }
}

impl Endpoint {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn select(&self, filters: &[(&str, String)]) -> Result<Vec<Message>, BackendError> {
        let request = self
            .client
            .get(&self.messages_url)
            .query(&[("select", "*")])
            .query(filters);
        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.json::<Vec<Message>>().await?)
    }
}

#[async_trait]
impl ChatBackend for RestBackend {
    async fn fetch_all_messages(&self) -> Result<Vec<Message>, BackendError> {
        self.endpoint
            .select(&[("order", "created_at.asc".to_string())])
            .await
    }

    async fn insert_message(&self, sender: &str, content: &str) -> Result<(), BackendError> {
        let request = self
            .endpoint
            .client
            .post(&self.endpoint.messages_url)
            .header("Prefer", "return=minimal")
            .json(&NewMessage { sender, content });
        check_status(self.endpoint.authorize(request).send().await?).await?;
        Ok(())
    }

    async fn subscribe_to_new_messages(&self) -> Result<Subscription, BackendError> {
        let mut cursor = self.seed_cursor().await;

        let (tx, rx) = mpsc::unbounded_channel();
        let endpoint = self.endpoint.clone();
        let interval = self.poll_interval;

        let producer = tokio::spawn(async move {
            log::info!("REST push channel opened");
            loop {
                tokio::time::sleep(interval).await;

                let mut filters = vec![("order", "created_at.asc".to_string())];
                if let Some(floor) = cursor.query_from() {
                    filters.push((
                        "created_at",
                        format!("gte.{}", floor.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                    ));
                }

                let rows = match endpoint.select(&filters).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        log::warn!("Polling messages failed: {err}");
                        continue;
                    }
                };

                for message in rows {
                    if !cursor.advance(&message) {
                        continue;
                    }
                    if tx.send(message).is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Subscription::new(rx, Some(producer)))
    }
}

/// Poll position. Each query re-reads a window behind the newest delivered
/// row; `seen` holds the ids inside that window so they go out once.
#[derive(Debug, Default)]
struct Cursor {
    newest: Option<DateTime<Utc>>,
    seen: HashMap<String, DateTime<Utc>>,
}

impl Cursor {
    fn seeded(newest: Option<&Message>) -> Self {
        let mut cursor = Self::default();
        if let Some(message) = newest {
            cursor.advance(message);
        }
        cursor
    }

    fn lookback() -> TimeDelta {
        TimeDelta::seconds(LOOKBACK_SECS)
    }

    /// Lower bound for the next poll, `None` before anything was seen.
    fn query_from(&self) -> Option<DateTime<Utc>> {
        self.newest.map(|newest| newest - Self::lookback())
    }

    /// Returns true if `message` has not been delivered yet.
    fn advance(&mut self, message: &Message) -> bool {
        if self.seen.contains_key(&message.id) {
            return false;
        }
        self.seen.insert(message.id.clone(), message.created_at);

        if self.newest.is_none_or(|newest| message.created_at > newest) {
            self.newest = Some(message.created_at);
            let floor = message.created_at - Self::lookback();
            self.seen.retain(|_, created_at| *created_at >= floor);
        }
        true
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}
