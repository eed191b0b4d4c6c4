use thiserror::Error;

/// Failure returned by a [`Relay`](crate::relay::Relay) call.
///
/// The `Display` text is what ends up in a system-error turn, so every
/// variant renders as a short human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("{0}")]
    Transport(String),

    #[error("{message} (HTTP {status})")]
    Service { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RelayError::MalformedResponse(err.to_string())
        } else {
            RelayError::Transport(err.to_string())
        }
    }
}
