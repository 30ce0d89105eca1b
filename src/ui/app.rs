use std::time::Instant;

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::auth::{Credentials, LocalState};
use crate::common::{Identity, SessionCommand, SessionEvent};
use crate::config::AppConfig;
use crate::error::BackendError;
use crate::network::{backend_from_config, translator_from_config};
use crate::sync::ChatSession;

use super::components::{chat_area, header, input_bar, login};
use super::state::{AppState, LoginForm};

/// UI side of one running chat session.
struct ActiveChat {
    identity: Identity,
    state: AppState,
    command_sender: mpsc::Sender<SessionCommand>,
    event_receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

impl ActiveChat {
    fn handle_session_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply(event);
        }
        self.state.expire_notices(Instant::now());
    }

    fn send_command(&self, command: SessionCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to chat session: {err}");
        }
    }
}

enum Screen {
    Login(LoginForm),
    Chat(ActiveChat),
}

enum Transition {
    Login(Identity),
    Logout,
}

pub struct ChatApp {
    config: AppConfig,
    credentials: Credentials,
    local_state: LocalState,
    runtime: Handle,
    screen: Screen,
    dark_mode: bool,
}

impl ChatApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        runtime: Handle,
        preset_user: Option<String>,
    ) -> Self {
        let credentials = Credentials::new(config.users.clone());
        let local_state = LocalState::load(&config.state_path);
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let mut app = Self {
            config,
            credentials,
            local_state,
            runtime,
            screen: Screen::Login(LoginForm::with_username(preset_user)),
            dark_mode: true,
        };

        // Restore the remembered login
        let remembered = app
            .local_state
            .user
            .as_deref()
            .and_then(|user| app.credentials.identity_for(user));
        if let Some(identity) = remembered {
            app.enter_chat(identity);
        }
        app
    }

    fn start_session(&self, identity: Identity) -> Result<ActiveChat, BackendError> {
        let backend = backend_from_config(&self.config.backend)?;
        let translator = translator_from_config(&self.config);

        // UI -> Session
        let (command_sender, command_receiver) = mpsc::channel(100);
        // Session -> UI
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        let mut session = ChatSession::new(identity.clone(), backend, translator);
        session.register_observer(event_sender);
        self.runtime.spawn(session.run(command_receiver));

        Ok(ActiveChat {
            identity,
            state: AppState::new(),
            command_sender,
            event_receiver,
        })
    }

    fn enter_chat(&mut self, identity: Identity) {
        match self.start_session(identity.clone()) {
            Ok(chat) => {
                self.local_state.user = Some(identity.current.clone());
                self.local_state.persist(&self.config.state_path);
                self.screen = Screen::Chat(chat);
            }
            Err(err) => {
                log::error!("Failed to open chat backend: {err}");
                let mut form = LoginForm::with_username(Some(identity.current));
                form.error = Some(format!("Failed to connect: {err}"));
                self.screen = Screen::Login(form);
            }
        }
    }

    fn logout(&mut self) {
        if let Screen::Chat(chat) = &self.screen {
            chat.send_command(SessionCommand::Close);
        }
        self.local_state.user = None;
        self.local_state.persist(&self.config.state_path);
        self.screen = Screen::Login(LoginForm::default());
    }

    fn set_target_language(&mut self, language: String) {
        log::info!("Target language set to {language}");
        self.local_state.target_language = language;
        self.local_state.persist(&self.config.state_path);
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.screen {
            Screen::Login(form) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    if let Some((username, password)) = login::render(ui, form) {
                        match self.credentials.login(&username, &password) {
                            Some(identity) => transition = Some(Transition::Login(identity)),
                            None => form.error = Some("Invalid credentials".to_string()),
                        }
                    }
                });
            }
            Screen::Chat(chat) => {
                chat.handle_session_events();
                let mut header_actions = header::HeaderActions::default();

                egui::TopBottomPanel::top("chat_header").show(ctx, |ui| {
                    header_actions = header::render(
                        ui,
                        &chat.identity,
                        &self.local_state.target_language,
                        self.dark_mode,
                    );
                    for (_, notice) in &chat.state.notices {
                        ui.colored_label(
                            ui.visuals().error_fg_color,
                            format!("{}: {}", notice.title, notice.description),
                        );
                    }
                });

                egui::TopBottomPanel::bottom("input_bar").show(ctx, |ui| {
                    ui.add_space(6.0);
                    let enabled = !chat.state.is_loading;
                    if let Some(content) = input_bar::render(ui, &mut chat.state.input_text, enabled) {
                        chat.send_command(SessionCommand::SendMessage(content));
                    }
                    ui.add_space(6.0);
                });

                egui::CentralPanel::default().show(ctx, |ui| {
                    if let Some(click) = chat_area::render(ui, &chat.state, &chat.identity) {
                        chat.send_command(SessionCommand::ToggleTranslation {
                            message_id: click.message_id,
                            content: click.content,
                            target_language: self.local_state.target_language.clone(),
                        });
                    }
                });

                if header_actions.toggle_theme {
                    self.dark_mode = !self.dark_mode;
                    ctx.set_visuals(if self.dark_mode {
                        egui::Visuals::dark()
                    } else {
                        egui::Visuals::light()
                    });
                }
                if let Some(language) = header_actions.language {
                    self.set_target_language(language);
                }
                if header_actions.logout {
                    transition = Some(Transition::Logout);
                }
            }
        }

        match transition {
            Some(Transition::Login(identity)) => self.enter_chat(identity),
            Some(Transition::Logout) => self.logout(),
            None => {}
        }

        ctx.request_repaint();
    }
}
