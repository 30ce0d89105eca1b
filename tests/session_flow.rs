//! End-to-end behaviour of a chat session against in-memory collaborators:
//! bulk load + push reconciliation, sending, and the translation overlay.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use duo_chat::network::{ChatBackend, Subscription, Translator};
use duo_chat::sync::{RequestAction, TranslationRejected, TranslationState};
use duo_chat::{
    BackendError, ChatSession, Identity, Message, SessionCommand, SessionEvent, TranslationEntry,
    TranslationError,
};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn message(id: &str, sender: &str, content: &str, secs: i64) -> Message {
    Message {
        id: id.to_string(),
        sender: sender.to_string(),
        content: content.to_string(),
        created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

fn hana() -> Identity {
    Identity {
        current: "Hana".to_string(),
        peer: "Joffreyg".to_string(),
    }
}

#[derive(Default)]
struct FakeBackend {
    history: Vec<Message>,
    fail_fetch: bool,
    fail_insert: bool,
    /// Delivered on the push channel from inside `fetch_all_messages`.
    push_during_fetch: Vec<Message>,
    pushed_during_fetch: AtomicUsize,
    push: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    inserted: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    fn with_history(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    fn push(&self, message: Message) -> bool {
        match self.push.lock().unwrap().as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    fn inserted(&self) -> Vec<(String, String)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn fetch_all_messages(&self) -> Result<Vec<Message>, BackendError> {
        if self.fail_fetch {
            return Err(BackendError::Task("offline".to_string()));
        }
        for message in &self.push_during_fetch {
            if self.push(message.clone()) {
                self.pushed_during_fetch.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(self.history.clone())
    }

    async fn insert_message(&self, sender: &str, content: &str) -> Result<(), BackendError> {
        if self.fail_insert {
            return Err(BackendError::Status {
                status: 500,
                body: "insert failed".to_string(),
            });
        }
        let mut inserted = self.inserted.lock().unwrap();
        inserted.push((sender.to_string(), content.to_string()));
        let echo = message(
            &format!("sent-{}", inserted.len()),
            sender,
            content,
            1_000 + inserted.len() as i64,
        );
        drop(inserted);
        self.push(echo);
        Ok(())
    }

    async fn subscribe_to_new_messages(&self) -> Result<Subscription, BackendError> {
        let (tx, subscription) = Subscription::channel();
        *self.push.lock().unwrap() = Some(tx);
        Ok(subscription)
    }
}

/// Translator whose calls block until the test releases them.
struct FakeTranslator {
    calls: AtomicUsize,
    gate: Semaphore,
    replies: Mutex<VecDeque<Result<String, TranslationError>>>,
}

impl FakeTranslator {
    fn new(replies: Vec<Result<String, TranslationError>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            replies: Mutex::new(replies.into()),
        }
    }

    fn open(replies: Vec<Result<String, TranslationError>>) -> Self {
        let translator = Self::new(replies);
        translator.gate.add_permits(Semaphore::MAX_PERMITS);
        translator
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        _text: &str,
        _target_language: &str,
    ) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TranslationError::Unavailable)?;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TranslationError::MissingText))
    }
}

fn session_with(
    backend: &Arc<FakeBackend>,
    translator: &Arc<FakeTranslator>,
) -> (ChatSession, mpsc::UnboundedReceiver<SessionEvent>) {
    let mut session = ChatSession::new(hana(), backend.clone(), translator.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    session.register_observer(tx);
    (session, rx)
}

fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn ids(session: &ChatSession) -> Vec<String> {
    session
        .ordered_messages()
        .iter()
        .map(|m| m.id.clone())
        .collect()
}

#[tokio::test]
async fn push_echo_of_bulk_loaded_message_is_ignored() {
    let backend = Arc::new(FakeBackend::with_history(vec![message("1", "A", "hi", 0)]));
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, mut events) = session_with(&backend, &translator);

    session.activate().await;
    assert!(session.is_subscribed());
    assert!(backend.push(message("1", "A", "hi", 0)));
    timeout(WAIT, session.handle_next_event()).await.unwrap();

    assert_eq!(ids(&session), vec!["1"]);
    let changes = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, SessionEvent::MessagesChanged(_)))
        .count();
    assert_eq!(changes, 1, "only the bulk load changes the timeline");
}

#[tokio::test]
async fn late_push_with_earlier_timestamp_is_placed_first() {
    let backend = Arc::new(FakeBackend::default());
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, _events) = session_with(&backend, &translator);
    session.activate().await;

    backend.push(message("2", "Joffreyg", "second", 20));
    backend.push(message("1", "Joffreyg", "first", 10));
    timeout(WAIT, session.handle_next_event()).await.unwrap();
    timeout(WAIT, session.handle_next_event()).await.unwrap();

    assert_eq!(ids(&session), vec!["1", "2"]);
}

#[tokio::test]
async fn pushes_during_bulk_load_are_reconciled() {
    let backend = Arc::new(FakeBackend {
        history: vec![
            message("1", "Joffreyg", "a", 0),
            message("2", "Hana", "b", 2),
        ],
        push_during_fetch: vec![
            message("2", "Hana", "b", 2),
            message("3", "Joffreyg", "c", 1),
        ],
        ..FakeBackend::default()
    });
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, _events) = session_with(&backend, &translator);

    session.activate().await;
    assert_eq!(
        backend.pushed_during_fetch.load(Ordering::SeqCst),
        2,
        "push channel must be open before the bulk fetch runs"
    );
    timeout(WAIT, session.handle_next_event()).await.unwrap();
    timeout(WAIT, session.handle_next_event()).await.unwrap();

    assert_eq!(ids(&session), vec!["1", "3", "2"]);
}

#[tokio::test]
async fn session_exposes_identity_and_day_groups() {
    let backend = Arc::new(FakeBackend::with_history(vec![
        message("1", "Joffreyg", "a", 0),
        message("2", "Hana", "b", 1),
        message("3", "Joffreyg", "c", 3 * 86_400),
    ]));
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, _events) = session_with(&backend, &translator);
    session.activate().await;

    assert_eq!(session.identity(), &hana());
    let sizes: Vec<usize> = session
        .day_groups()
        .iter()
        .map(|group| group.messages.len())
        .collect();
    assert_eq!(sizes, vec![2, 1]);
}

#[tokio::test]
async fn failed_bulk_load_leaves_empty_timeline_and_notifies() {
    let backend = Arc::new(FakeBackend {
        fail_fetch: true,
        ..FakeBackend::default()
    });
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, mut events) = session_with(&backend, &translator);

    session.activate().await;

    assert!(session.ordered_messages().is_empty());
    let events = drain(&mut events);
    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::Notice(notice) if notice.description == "Failed to load messages"
    )));
    assert!(matches!(events.last(), Some(SessionEvent::Loaded)));

    // Push ingestion still works after a failed load
    backend.push(message("9", "Joffreyg", "still here", 0));
    timeout(WAIT, session.handle_next_event()).await.unwrap();
    assert_eq!(ids(&session), vec!["9"]);
}

#[tokio::test]
async fn send_has_no_local_echo_until_the_push_arrives() {
    let backend = Arc::new(FakeBackend::default());
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, _events) = session_with(&backend, &translator);
    session.activate().await;

    assert!(!session.send_message("   "));
    assert!(session.send_message("  おはよう  "));
    assert!(session.ordered_messages().is_empty());

    while session.ordered_messages().is_empty() {
        timeout(WAIT, session.handle_next_event()).await.unwrap();
    }

    assert_eq!(backend.inserted(), vec![("Hana".to_string(), "おはよう".to_string())]);
    assert_eq!(session.ordered_messages()[0].content, "おはよう");
}

#[tokio::test]
async fn failed_send_becomes_a_notice() {
    let backend = Arc::new(FakeBackend {
        fail_insert: true,
        ..FakeBackend::default()
    });
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, mut events) = session_with(&backend, &translator);
    session.activate().await;
    drain(&mut events);

    session.send_message("hello");
    timeout(WAIT, session.handle_next_event()).await.unwrap();

    assert!(session.ordered_messages().is_empty());
    assert!(drain(&mut events).iter().any(|event| matches!(
        event,
        SessionEvent::Notice(notice) if notice.description == "Failed to send message"
    )));
}

#[tokio::test]
async fn concurrent_requests_for_one_message_make_one_call() {
    let backend = Arc::new(FakeBackend::with_history(vec![message(
        "5", "Joffreyg", "Bonjour", 0,
    )]));
    let translator = Arc::new(FakeTranslator::new(vec![Ok("Hello".to_string())]));
    let (mut session, mut events) = session_with(&backend, &translator);
    session.activate().await;
    drain(&mut events);

    let first = session
        .request_or_toggle_translation("5", "Bonjour", "English")
        .unwrap();
    assert!(matches!(first, RequestAction::Fetch(_)));
    let second = session
        .request_or_toggle_translation("5", "Bonjour", "English")
        .unwrap();
    assert_eq!(second, RequestAction::Pending);
    assert_eq!(session.translation_state("5").state(), TranslationState::Loading);

    translator.gate.add_permits(1);
    timeout(WAIT, session.handle_next_event()).await.unwrap();

    assert_eq!(translator.calls(), 1);
    assert_eq!(
        session.translation_state("5"),
        TranslationEntry::Ready {
            text: "Hello".to_string()
        }
    );
    let outcomes = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(
            event,
            SessionEvent::TranslationChanged { entry: TranslationEntry::Ready { .. }, .. }
        ))
        .count();
    assert_eq!(outcomes, 1);
}

#[tokio::test]
async fn toggling_a_cached_translation_makes_no_calls() {
    let backend = Arc::new(FakeBackend::with_history(vec![message(
        "5", "Joffreyg", "Bonjour", 0,
    )]));
    let translator = Arc::new(FakeTranslator::open(vec![Ok("Hello".to_string())]));
    let (mut session, _events) = session_with(&backend, &translator);
    session.activate().await;

    session
        .request_or_toggle_translation("5", "Bonjour", "English")
        .unwrap();
    timeout(WAIT, session.handle_next_event()).await.unwrap();

    assert_eq!(
        session
            .request_or_toggle_translation("5", "Bonjour", "English")
            .unwrap(),
        RequestAction::Toggled { visible: false }
    );
    // A different target language still reuses the cached text
    assert_eq!(
        session
            .request_or_toggle_translation("5", "Bonjour", "Korean")
            .unwrap(),
        RequestAction::Toggled { visible: true }
    );
    assert_eq!(session.translation_state("5").visible_text(), Some("Hello"));
    assert_eq!(translator.calls(), 1);
}

#[tokio::test]
async fn failed_translation_can_be_retried() {
    let backend = Arc::new(FakeBackend::with_history(vec![message(
        "5", "Joffreyg", "Bonjour", 0,
    )]));
    let translator = Arc::new(FakeTranslator::open(vec![
        Err(TranslationError::Status(502)),
        Ok("Hello".to_string()),
    ]));
    let (mut session, _events) = session_with(&backend, &translator);
    session.activate().await;

    session
        .request_or_toggle_translation("5", "Bonjour", "English")
        .unwrap();
    timeout(WAIT, session.handle_next_event()).await.unwrap();
    assert_eq!(session.translation_state("5").state(), TranslationState::Error);

    session
        .request_or_toggle_translation("5", "Bonjour", "English")
        .unwrap();
    timeout(WAIT, session.handle_next_event()).await.unwrap();
    assert_eq!(
        session.translation_state("5"),
        TranslationEntry::Ready {
            text: "Hello".to_string()
        }
    );
    assert_eq!(translator.calls(), 2);
}

#[tokio::test]
async fn own_and_unknown_messages_are_never_translated() {
    let backend = Arc::new(FakeBackend::with_history(vec![message("7", "Hana", "mine", 0)]));
    let translator = Arc::new(FakeTranslator::open(vec![]));
    let (mut session, _events) = session_with(&backend, &translator);
    session.activate().await;

    assert_eq!(
        session.request_or_toggle_translation("7", "mine", "English"),
        Err(TranslationRejected::OwnMessage("7".to_string()))
    );
    assert_eq!(
        session.request_or_toggle_translation("404", "?", "English"),
        Err(TranslationRejected::UnknownMessage("404".to_string()))
    );
    assert!(session.translations().is_empty());
    assert_eq!(translator.calls(), 0);
}

#[tokio::test]
async fn run_loop_serves_commands_until_close() {
    let backend = Arc::new(FakeBackend::with_history(vec![message(
        "5", "Joffreyg", "Bonjour", 0,
    )]));
    let translator = Arc::new(FakeTranslator::open(vec![Ok("Hello".to_string())]));
    let (session, mut events) = session_with(&backend, &translator);
    let (commands, command_rx) = mpsc::channel(8);
    let handle = tokio::spawn(session.run(command_rx));

    commands
        .send(SessionCommand::SendMessage("hi Joffreyg".to_string()))
        .await
        .unwrap();
    commands
        .send(SessionCommand::ToggleTranslation {
            message_id: "5".to_string(),
            content: "Bonjour".to_string(),
            target_language: "English".to_string(),
        })
        .await
        .unwrap();

    let mut saw_echo = false;
    let mut saw_translation = false;
    while !(saw_echo && saw_translation) {
        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            SessionEvent::MessagesChanged(messages) => {
                saw_echo |= messages.iter().any(|m| m.content == "hi Joffreyg");
            }
            SessionEvent::TranslationChanged { entry, .. } => {
                saw_translation |= entry.visible_text() == Some("Hello");
            }
            _ => {}
        }
    }

    commands.send(SessionCommand::Close).await.unwrap();
    timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(!backend.push(message("6", "Joffreyg", "after close", 9)));
}
