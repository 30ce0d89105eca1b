use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::Message;

/// Live push channel. Messages are produced by a background task and buffered
/// until the owner polls [`next`](Self::next). Closing (or dropping) stops the
/// producer.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Message>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<Message>, producer: Option<JoinHandle<()>>) -> Self {
        Self { receiver, producer }
    }

    /// Channel fed by the caller, with no background task attached.
    pub fn channel() -> (mpsc::UnboundedSender<Message>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, None))
    }

    /// Next delivery, or `None` once the producer is gone and the buffer is drained.
    pub async fn next(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    pub fn close(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
