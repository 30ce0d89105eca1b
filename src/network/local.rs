use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use crate::common::Message;
use crate::error::BackendError;
use crate::storage::{MessageDatabase, ensure_parent_dir};

use super::{ChatBackend, Subscription};

/// Backend over a SQLite file. Processes sharing the file see each other's
/// messages through the rowid poller; local inserts wake it immediately.
pub struct LocalBackend {
    db: Arc<Mutex<MessageDatabase>>,
    wake: Arc<Notify>,
    poll_interval: Duration,
}

impl LocalBackend {
    pub fn open<P: AsRef<Path>>(path: P, poll_interval: Duration) -> Result<Self, BackendError> {
        ensure_parent_dir(&path).map_err(|err| BackendError::Task(err.to_string()))?;
        let db = MessageDatabase::with_path(path)?;
        Ok(Self::from_database(db, poll_interval))
    }

    pub fn in_memory(poll_interval: Duration) -> Result<Self, BackendError> {
        Ok(Self::from_database(MessageDatabase::in_memory()?, poll_interval))
    }

    fn from_database(db: MessageDatabase, poll_interval: Duration) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            wake: Arc::new(Notify::new()),
            poll_interval,
        }
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    async fn fetch_all_messages(&self) -> Result<Vec<Message>, BackendError> {
        with_db(&self.db, |db| db.all_messages()).await
    }

    async fn insert_message(&self, sender: &str, content: &str) -> Result<(), BackendError> {
        let sender = sender.to_string();
        let content = content.to_string();
        let stored = with_db(&self.db, move |db| db.insert_message(&sender, &content)).await?;
        log::debug!("Stored message {} from {}", stored.id, stored.sender);
        self.wake.notify_waiters();
        Ok(())
    }

    async fn subscribe_to_new_messages(&self) -> Result<Subscription, BackendError> {
        let mut cursor = with_db(&self.db, |db| db.last_rowid()).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let db = Arc::clone(&self.db);
        let wake = Arc::clone(&self.wake);
        let interval = self.poll_interval;

        let producer = tokio::spawn(async move {
            log::info!("Local push channel opened at rowid {cursor}");
            loop {
                tokio::select! {
                    _ = wake.notified() => {}
                    _ = tokio::time::sleep(interval) => {}
                }

                let rows = match with_db(&db, move |db| db.messages_after(cursor)).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        log::warn!("Polling message log failed: {err}");
                        continue;
                    }
                };

                for (rowid, message) in rows {
                    cursor = rowid;
                    if tx.send(message).is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Subscription::new(rx, Some(producer)))
    }
}

async fn with_db<T, F>(db: &Arc<Mutex<MessageDatabase>>, f: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce(&MessageDatabase) -> rusqlite::Result<T> + Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || {
        let guard = db
            .lock()
            .map_err(|_| BackendError::Task("message database lock poisoned".to_string()))?;
        f(&*guard).map_err(BackendError::from)
    })
    .await
    .map_err(|err| BackendError::Task(err.to_string()))?
}
