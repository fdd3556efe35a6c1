//! TUI application state and main event loop

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::{mpsc, watch};

use super::compose::ComposeState;
use super::ui;
use crate::api::client::ApiClient;
use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::Delivery;
use crate::socket::{ClientEvent, Connector, OutboundEvent};
use crate::sync::{ChatStore, CommandGateway};

/// Input poll interval (~30 fps)
const FRAME_DURATION_MS: u64 = 33;

/// Active pane in the TUI
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

/// Application state
pub struct App {
    pub store: ChatStore,
    pub compose: ComposeState,
    pub active_pane: Pane,
    /// Cursor into the chat list.
    pub selected: usize,
    /// Last error or notice for the status bar.
    pub status_line: Option<String>,
    pub should_exit: bool,
    gateway: CommandGateway,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    /// Whether we have advertised "typing" for the current input.
    typing_signaled: bool,
}

impl App {
    /// Handle one batch of socket events and expire typing flags.
    async fn tick(&mut self) {
        let now = Instant::now();
        let mut read_ids = Vec::new();

        while let Ok(event) = self.events_rx.try_recv() {
            // Messages arriving in the viewed chat are read immediately.
            if let ClientEvent::MessageReceived(ref msg) = event {
                if self.store.active_chat_id() == Some(msg.chat_id.as_str())
                    && msg.user_id != self.store.current_user_id()
                {
                    read_ids.push(msg.id.clone());
                }
            }
            self.store.apply_event(event, now);
        }

        for id in read_ids {
            if let Err(e) = self.gateway.mark_read(&mut self.store, &id).await {
                tracing::debug!("mark_read failed: {}", e);
            }
        }

        self.store.sweep_typing(now);
    }

    /// Poll for one input event and dispatch it.
    async fn handle_events(&mut self) -> Result<()> {
        if !event::poll(Duration::from_millis(FRAME_DURATION_MS))? {
            return Ok(());
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.handle_key(key).await;
            }
            Event::Resize(_, _) => {
                // Picked up on the next draw.
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        // Global bindings first.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_exit = true;
            return;
        }
        if key.code == KeyCode::Tab {
            self.active_pane = match self.active_pane {
                Pane::Sidebar => Pane::Messages,
                Pane::Messages => Pane::Compose,
                Pane::Compose => Pane::Sidebar,
            };
            return;
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key).await,
            Pane::Messages => self.handle_messages_key(key).await,
            Pane::Compose => self.handle_compose_key(key).await,
        }
    }

    async fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_exit = true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.store.chats().len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('r') => {
                if let Err(e) = self.gateway.refresh_chats(&mut self.store).await {
                    self.status_line = Some(e.to_string());
                }
            }
            KeyCode::Enter => {
                let chat_id = self.store.chats().get(self.selected).map(|c| c.id.clone());
                if let Some(chat_id) = chat_id {
                    if let Err(e) = self.gateway.open_chat(&mut self.store, Some(chat_id)).await {
                        self.status_line = Some(e.to_string());
                    }
                    self.active_pane = Pane::Compose;
                }
            }
            _ => {}
        }
    }

    async fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::PageUp => match self.gateway.load_older_messages(&mut self.store).await {
                Ok(false) => self.status_line = Some("No older messages".to_string()),
                Ok(true) => {}
                Err(e) => self.status_line = Some(e.to_string()),
            },
            KeyCode::Char('d') => {
                // Delete the most recent own message.
                let own_id = self
                    .store
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| {
                        m.user_id == self.store.current_user_id()
                            && m.status == Delivery::Confirmed
                    })
                    .map(|m| m.id.clone());
                if let Some(id) = own_id {
                    if let Err(e) = self.gateway.delete_message(&mut self.store, &id).await {
                        self.status_line = Some(e.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    async fn handle_compose_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Enter => {
                if let Some(text) = self.compose.take() {
                    self.typing_signaled = false;
                    if let Err(e) = self.gateway.send_message(&mut self.store, &text).await {
                        self.status_line = Some(e.to_string());
                    }
                }
            }
            KeyCode::Backspace => {
                self.compose.backspace();
                self.maybe_signal_stopped_typing();
            }
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.clear();
                self.maybe_signal_stopped_typing();
            }
            KeyCode::Char(c) => {
                self.compose.insert_char(c);
                if !self.typing_signaled {
                    if let Some(chat_id) = self.store.active_chat_id() {
                        self.gateway.signal_typing(chat_id, true);
                        self.typing_signaled = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn maybe_signal_stopped_typing(&mut self) {
        if self.typing_signaled && self.compose.is_empty() {
            if let Some(chat_id) = self.store.active_chat_id() {
                self.gateway.signal_typing(chat_id, false);
            }
            self.typing_signaled = false;
        }
    }
}

/// Run the TUI application.
pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let user = config
        .get_user()
        .context("Not logged in. Run 'lokal-cli login <username>' first.")?;
    let token = config.get_access_token().map(|t| t.token);
    let socket_url = config.socket_url();

    let api = ApiClient::new().await?;

    // Socket plumbing: connector task feeds events in, outbound frames go out.
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEvent>();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut connector = Connector::new(socket_url);
        if let Err(e) = connector
            .run(token, events_tx, &mut outbound_rx, &mut shutdown_rx)
            .await
        {
            tracing::warn!("Socket stopped: {}", e);
        }
    });

    let mut app = App {
        store: ChatStore::new(user.id),
        compose: ComposeState::default(),
        active_pane: Pane::default(),
        selected: 0,
        status_line: None,
        should_exit: false,
        gateway: CommandGateway::new(api, Some(outbound_tx)),
        events_rx,
        typing_signaled: false,
    };

    // Seed the chat list before the first draw.
    if let Err(e) = app.gateway.refresh_chats(&mut app.store).await {
        app.status_line = Some(e.to_string());
    }

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, &mut app).await;
    ratatui::restore();

    // Explicit disconnect: tears the socket down and cancels any pending
    // reconnect timer.
    let _ = shutdown_tx.send(true);

    result
}

async fn run_app(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    while !app.should_exit {
        app.tick().await;
        terminal.draw(|frame| ui::render(frame, app))?;
        app.handle_events().await?;
    }
    Ok(())
}
