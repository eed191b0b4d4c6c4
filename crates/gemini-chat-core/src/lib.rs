pub mod ai;
pub mod config;
pub mod credential;
pub mod error;
pub mod relay;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::GeminiClient;
pub use config::Config;
pub use credential::Credential;
pub use error::RelayError;
pub use relay::{Relay, RelayHost, DEFAULT_MODEL};
pub use session::ChatSession;
pub use state::{Speaker, Transcript, Turn};
