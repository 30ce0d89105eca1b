use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::common::{Identity, Message, Notice, SessionCommand, SessionEvent};
use crate::error::{BackendError, TranslationError};
use crate::network::{ChatBackend, Subscription, Translator};

use super::day_groups::DayGroup;
use super::message_store::{IngestOutcome, MessageStore};
use super::translation_cache::{RequestAction, TranslationCache, TranslationEntry, TranslationJob};

/// Why a translation intent was refused before touching the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationRejected {
    #[error("message {0} is not in the timeline")]
    UnknownMessage(String),
    #[error("message {0} was sent by the current user")]
    OwnMessage(String),
}

/// Result of a long-latency call, delivered back to the session loop as a
/// separate event.
#[derive(Debug)]
pub enum Completion {
    Translation {
        message_id: String,
        ticket: u64,
        result: Result<String, TranslationError>,
    },
    Insert(Result<(), BackendError>),
}

enum Input {
    Command(Option<SessionCommand>),
    Push(Option<Message>),
    Completion(Completion),
}

/// One active chat view. Sole owner of its message store and translation
/// cache; every mutation happens on the task driving the session, so neither
/// needs a lock.
pub struct ChatSession {
    identity: Identity,
    backend: Arc<dyn ChatBackend>,
    translator: Arc<dyn Translator>,
    store: MessageStore,
    translations: TranslationCache,
    subscription: Option<Subscription>,
    observers: Vec<mpsc::UnboundedSender<SessionEvent>>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ChatSession {
    pub fn new(
        identity: Identity,
        backend: Arc<dyn ChatBackend>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            identity,
            backend,
            translator,
            store: MessageStore::new(),
            translations: TranslationCache::new(),
            subscription: None,
            observers: Vec::new(),
            completion_tx,
            completion_rx,
        }
    }

    pub fn register_observer(&mut self, observer: mpsc::UnboundedSender<SessionEvent>) {
        self.observers.push(observer);
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn ordered_messages(&self) -> &[Message] {
        self.store.snapshot()
    }

    pub fn day_groups(&self) -> Vec<DayGroup<'_>> {
        self.store.day_groups()
    }

    pub fn translation_state(&self, message_id: &str) -> TranslationEntry {
        self.translations.entry(message_id)
    }

    pub fn translations(&self) -> &TranslationCache {
        &self.translations
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Open the push channel, then bulk-load history.
    ///
    /// Deliveries that arrive during the bulk fetch wait in the subscription
    /// and are ingested afterwards; duplicates of loaded rows are dropped.
    pub async fn activate(&mut self) {
        log::info!(
            "Activating chat session for {} (peer {})",
            self.identity.current,
            self.identity.peer
        );

        match self.backend.subscribe_to_new_messages().await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(err) => {
                log::warn!("Failed to open push channel: {err}");
                self.notify(Notice::error("Live updates are unavailable"));
            }
        }

        match self.backend.fetch_all_messages().await {
            Ok(messages) => {
                log::info!("Loaded {} messages", messages.len());
                self.store.load_initial(messages);
            }
            Err(err) => {
                log::warn!("Error loading messages: {err}");
                self.store.load_initial(Vec::new());
                self.notify(Notice::error("Failed to load messages"));
            }
        }

        self.emit_messages();
        self.emit(SessionEvent::Loaded);
    }

    pub fn deactivate(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
            log::info!("Chat session for {} closed", self.identity.current);
        }
    }

    /// Push-channel handler.
    pub fn ingest(&mut self, message: Message) -> IngestOutcome {
        let outcome = self.store.ingest(message);
        if let IngestOutcome::Inserted { .. } = outcome {
            self.emit_messages();
        }
        outcome
    }

    /// Insert on the backend. The message shows up once the push channel
    /// delivers the stored row. Returns `false` for blank input.
    pub fn send_message(&self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }

        let backend = Arc::clone(&self.backend);
        let sender = self.identity.current.clone();
        let content = content.to_string();
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = backend.insert_message(&sender, &content).await;
            // Receiver is gone once the session is discarded
            let _ = completions.send(Completion::Insert(result));
        });
        true
    }

    pub fn request_or_toggle_translation(
        &mut self,
        message_id: &str,
        content: &str,
        target_language: &str,
    ) -> Result<RequestAction, TranslationRejected> {
        let message = self
            .store
            .get(message_id)
            .ok_or_else(|| TranslationRejected::UnknownMessage(message_id.to_string()))?;
        if message.is_from(&self.identity.current) {
            return Err(TranslationRejected::OwnMessage(message_id.to_string()));
        }

        let action = self
            .translations
            .request(message_id, content, target_language);
        match &action {
            RequestAction::Fetch(job) => {
                self.dispatch(job.clone());
                self.emit_translation(message_id);
            }
            RequestAction::Toggled { .. } => self.emit_translation(message_id),
            RequestAction::Pending => {
                log::debug!("Translation of {message_id} already in flight");
            }
        }
        Ok(action)
    }

    fn dispatch(&self, job: TranslationJob) {
        let translator = Arc::clone(&self.translator);
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = translator.translate(&job.text, &job.target_language).await;
            let _ = completions.send(Completion::Translation {
                message_id: job.message_id,
                ticket: job.ticket,
                result,
            });
        });
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Translation {
                message_id,
                ticket,
                result,
            } => {
                if self.translations.resolve(&message_id, ticket, result) {
                    self.emit_translation(&message_id);
                }
            }
            Completion::Insert(Ok(())) => log::debug!("Message stored"),
            Completion::Insert(Err(err)) => {
                log::warn!("Error sending message: {err}");
                self.notify(Notice::error("Failed to send message"));
            }
        }
    }

    /// Wait for one push delivery or async completion and apply it.
    pub async fn handle_next_event(&mut self) {
        match self.next_input(None).await {
            Input::Push(Some(message)) => {
                self.ingest(message);
            }
            Input::Push(None) => self.push_channel_closed(),
            Input::Completion(completion) => self.handle_completion(completion),
            Input::Command(_) => {}
        }
    }

    /// Session event loop: activate, then serve commands, pushes and
    /// completions until `Close` or until the command channel is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        self.activate().await;

        loop {
            match self.next_input(Some(&mut commands)).await {
                Input::Command(Some(command)) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Input::Command(None) => break,
                Input::Push(Some(message)) => {
                    self.ingest(message);
                }
                Input::Push(None) => self.push_channel_closed(),
                Input::Completion(completion) => self.handle_completion(completion),
            }
        }

        self.deactivate();
    }

    fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::SendMessage(content) => {
                self.send_message(&content);
            }
            SessionCommand::ToggleTranslation {
                message_id,
                content,
                target_language,
            } => {
                if let Err(err) =
                    self.request_or_toggle_translation(&message_id, &content, &target_language)
                {
                    log::warn!("Translation request refused: {err}");
                }
            }
            SessionCommand::Close => return false,
        }
        true
    }

    async fn next_input(
        &mut self,
        commands: Option<&mut mpsc::Receiver<SessionCommand>>,
    ) -> Input {
        tokio::select! {
            command = next_command(commands) => Input::Command(command),
            message = next_push(&mut self.subscription) => Input::Push(message),
            Some(completion) = self.completion_rx.recv() => Input::Completion(completion),
        }
    }

    fn push_channel_closed(&mut self) {
        log::warn!("Push channel closed; keeping {} messages", self.store.len());
        self.subscription = None;
    }

    fn notify(&mut self, notice: Notice) {
        self.emit(SessionEvent::Notice(notice));
    }

    fn emit_messages(&mut self) {
        let snapshot = self.store.snapshot().to_vec();
        self.emit(SessionEvent::MessagesChanged(snapshot));
    }

    fn emit_translation(&mut self, message_id: &str) {
        let entry = self.translations.entry(message_id);
        self.emit(SessionEvent::TranslationChanged {
            message_id: message_id.to_string(),
            entry,
        });
    }

    fn emit(&mut self, event: SessionEvent) {
        self.observers
            .retain(|observer| observer.send(event.clone()).is_ok());
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn next_command(commands: Option<&mut mpsc::Receiver<SessionCommand>>) -> Option<SessionCommand> {
    match commands {
        Some(commands) => commands.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_push(subscription: &mut Option<Subscription>) -> Option<Message> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
