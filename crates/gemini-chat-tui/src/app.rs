use std::sync::Arc;

use anyhow::Result;
use gemini_chat_core::{ChatSession, Config, Credential, Relay, RelayError, RelayHost};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Asking for a Gemini API key before chat can start
    ApiKey,
    Chat,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,

    // Chat state
    pub session: ChatSession,
    relay: Option<Arc<dyn Relay>>,
    reply_task: Option<JoinHandle<Result<String, RelayError>>>,

    // Transcript viewport
    pub scroll: u16,
    pub follow_bottom: bool,
    pub animation_frame: u8,

    // API key prompt
    pub api_key_input: String,
    pub api_key_error: Option<String>,

    /// Settings for building a relay from a typed key. Never holds the key.
    config: Config,
}

impl App {
    pub fn new(config: Config, relay: Option<Arc<dyn Relay>>) -> Self {
        let screen = if relay.is_some() { Screen::Chat } else { Screen::ApiKey };
        Self {
            should_quit: false,
            screen,

            session: ChatSession::new(),
            relay,
            reply_task: None,

            scroll: 0,
            follow_bottom: true,
            animation_frame: 0,

            api_key_input: String::new(),
            api_key_error: None,

            config: Config {
                api_key: None,
                ..config
            },
        }
    }

    pub fn model_name(&self) -> &str {
        self.relay.as_ref().map(|r| r.model()).unwrap_or("")
    }

    /// Send the current input to the relay in a background task.
    pub fn submit(&mut self) {
        let Some(relay) = self.relay.clone() else {
            return;
        };

        if let Some(prompt) = self.session.begin_submit() {
            self.follow_bottom = true;
            self.reply_task = Some(tokio::spawn(async move { relay.answer(&prompt).await }));
        }
    }

    /// Move a finished reply task's result into the transcript.
    pub async fn poll_reply(&mut self) {
        let finished = self.reply_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.reply_task.take() {
            let result = task.await.unwrap_or_else(|err| {
                warn!(error = %err, "reply task did not complete");
                Err(RelayError::Transport(format!("request task failed: {}", err)))
            });
            self.session.complete(result);
            self.follow_bottom = true;
        }
    }

    /// Build the relay from the typed key and open the chat. The key lives
    /// only in the relay's credential for the rest of the run.
    pub fn submit_api_key(&mut self) {
        match self.connect_with_key() {
            Ok(relay) => {
                self.relay = Some(relay);
                self.screen = Screen::Chat;
                self.api_key_error = None;
            }
            Err(err) => {
                self.api_key_error = Some(err.to_string());
            }
        }
        self.api_key_input.clear();
    }

    fn connect_with_key(&self) -> Result<Arc<dyn Relay>> {
        let credential = Credential::new(self.api_key_input.as_str())?;
        let host = RelayHost::from_config(&self.config, credential)?;
        info!(model = host.model(), "relay ready with key from prompt");
        Ok(Arc::new(host))
    }

    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Clamped to the transcript height at render time.
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }
}
