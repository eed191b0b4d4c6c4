//! The privileged side of the chat: owns the credential and the outbound
//! model call. Display code only ever sees the [`Relay`] trait.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::credential::Credential;
use crate::error::RelayError;

pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Answers one prompt with one model reply.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn answer(&self, prompt: &str) -> Result<String, RelayError>;

    /// Model identifier, shown in the chat title.
    fn model(&self) -> &str;
}

/// Relay backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct RelayHost {
    client: GeminiClient,
    model: String,
}

impl RelayHost {
    pub fn new(credential: Credential) -> Self {
        Self {
            client: GeminiClient::new(credential),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn from_config(config: &Config, credential: Credential) -> Result<Self> {
        let mut client = GeminiClient::new(credential).with_base_url(config.base_url());
        if let Some(secs) = config.timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs))?;
        }
        Ok(Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl Relay for RelayHost {
    async fn answer(&self, prompt: &str) -> Result<String, RelayError> {
        if prompt.trim().is_empty() {
            return Err(RelayError::EmptyPrompt);
        }

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "sending prompt");
        match self.client.query(&self.model, prompt).await {
            Ok(text) => {
                debug!(reply_chars = text.chars().count(), "received reply");
                Ok(text)
            }
            Err(err) => {
                warn!(error = %err, "model call failed");
                Err(err)
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
