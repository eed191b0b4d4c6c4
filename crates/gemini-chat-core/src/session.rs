use tracing::{debug, warn};

use crate::error::RelayError;
use crate::relay::Relay;
use crate::state::{Transcript, Turn};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Display-side chat state: the input line, the transcript, and whether a
/// reply is outstanding.
///
/// Only one prompt is in flight at a time. While a reply is pending,
/// [`begin_submit`](Self::begin_submit) refuses new prompts and leaves the
/// input untouched, so every user turn is followed by its own outcome.
#[derive(Debug, Default)]
pub struct ChatSession {
    input: String,
    cursor: usize,
    transcript: Transcript,
    pending: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor = self.input.chars().count();
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Start a submission. Returns the prompt to send, or `None` when the
    /// trimmed input is empty or a reply is still pending.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.pending {
            debug!("submit ignored, reply pending");
            return None;
        }

        let prompt = self.input.trim();
        if prompt.is_empty() {
            return None;
        }
        let prompt = prompt.to_string();

        self.transcript.push(Turn::user(prompt.clone()));
        self.input.clear();
        self.cursor = 0;
        self.pending = true;
        debug!(turns = self.transcript.len(), "prompt submitted");

        Some(prompt)
    }

    /// Record the outcome of the pending prompt.
    pub fn complete(&mut self, result: Result<String, RelayError>) {
        if !self.pending {
            warn!("completion received with no prompt pending, dropping it");
            return;
        }

        let turn = match result {
            Ok(text) => Turn::model(text),
            Err(err) => Turn::error(err),
        };
        self.transcript.push(turn);
        self.pending = false;
        debug!(turns = self.transcript.len(), "reply recorded");
    }

    /// Submit the current input and wait for the relay's answer.
    pub async fn submit(&mut self, relay: &dyn Relay) {
        if let Some(prompt) = self.begin_submit() {
            let result = relay.answer(&prompt).await;
            self.complete(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Speaker;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Relay returning scripted results and recording the prompts it saw.
    struct ScriptedRelay {
        replies: Mutex<VecDeque<Result<String, RelayError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedRelay {
        fn new(replies: Vec<Result<String, RelayError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Relay for ScriptedRelay {
        async fn answer(&self, prompt: &str) -> Result<String, RelayError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RelayError::Transport("no scripted reply".to_string())))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn turns(session: &ChatSession) -> Vec<(Speaker, String)> {
        session
            .transcript()
            .iter()
            .map(|t| (t.speaker, t.text.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_hello_scenario() {
        let relay = ScriptedRelay::new(vec![Ok("Hi there".to_string())]);
        let mut session = ChatSession::new();
        session.set_input("Hello");

        session.submit(&relay).await;

        assert_eq!(
            turns(&session),
            vec![
                (Speaker::User, "Hello".to_string()),
                (Speaker::Model, "Hi there".to_string()),
            ]
        );
        assert_eq!(session.input(), "");
        assert!(!session.is_pending());
        assert_eq!(relay.prompts(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_whitespace_only_input_is_a_no_op() {
        let relay = ScriptedRelay::new(vec![]);
        let mut session = ChatSession::new();
        session.set_input("  ");

        session.submit(&relay).await;

        assert!(session.transcript().is_empty());
        assert!(relay.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_failure_becomes_error_turn() {
        let relay = ScriptedRelay::new(vec![Err(RelayError::Transport(
            "quota exceeded".to_string(),
        ))]);
        let mut session = ChatSession::new();
        session.set_input("Ping");

        session.submit(&relay).await;

        assert_eq!(
            turns(&session),
            vec![
                (Speaker::User, "Ping".to_string()),
                (Speaker::SystemError, "Erro: quota exceeded".to_string()),
            ]
        );

        // Still usable afterwards
        session.set_input("again");
        assert_eq!(session.begin_submit(), Some("again".to_string()));
    }

    #[tokio::test]
    async fn test_reply_text_is_kept_verbatim() {
        let reply = "  padded reply with trailing newline\n".to_string();
        let relay = ScriptedRelay::new(vec![Ok(reply.clone())]);
        let mut session = ChatSession::new();
        session.set_input("q");

        session.submit(&relay).await;

        assert_eq!(session.transcript().last(), Some(&Turn::model(reply)));
    }

    #[tokio::test]
    async fn test_prompt_is_trimmed() {
        let relay = ScriptedRelay::new(vec![Ok("ok".to_string())]);
        let mut session = ChatSession::new();
        session.set_input("  what time is it?\n");

        session.submit(&relay).await;

        assert_eq!(relay.prompts(), vec!["what time is it?".to_string()]);
        assert_eq!(session.transcript().turns()[0], Turn::user("what time is it?"));
    }

    #[tokio::test]
    async fn test_each_prompt_gets_exactly_one_outcome() {
        let relay = ScriptedRelay::new(vec![
            Ok("one".to_string()),
            Err(RelayError::EmptyPrompt),
            Ok("three".to_string()),
        ]);
        let mut session = ChatSession::new();

        for prompt in ["a", "b", "c"] {
            session.set_input(prompt);
            session.submit(&relay).await;
        }

        let speakers: Vec<Speaker> = session.transcript().iter().map(|t| t.speaker).collect();
        assert_eq!(
            speakers,
            vec![
                Speaker::User, Speaker::Model,
                Speaker::User, Speaker::SystemError,
                Speaker::User, Speaker::Model,
            ]
        );
    }

    #[test]
    fn test_second_submit_rejected_while_pending() {
        let mut session = ChatSession::new();
        session.set_input("first");
        assert_eq!(session.begin_submit(), Some("first".to_string()));

        session.set_input("second");
        assert_eq!(session.begin_submit(), None);
        assert_eq!(session.input(), "second");
        assert_eq!(session.transcript().len(), 1);

        session.complete(Ok("reply".to_string()));
        assert_eq!(session.begin_submit(), Some("second".to_string()));
    }

    #[test]
    fn test_stray_completion_is_ignored() {
        let mut session = ChatSession::new();
        session.complete(Ok("unexpected".to_string()));
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_user_turn_stands_before_reply() {
        let mut session = ChatSession::new();
        session.set_input("Hello");
        session.begin_submit();

        assert!(session.is_pending());
        assert_eq!(turns(&session), vec![(Speaker::User, "Hello".to_string())]);
    }

    #[test]
    fn test_utf8_editing() {
        let mut session = ChatSession::new();
        for c in "olá".chars() {
            session.insert_char(c);
        }
        session.cursor_left();
        session.insert_char('x');
        assert_eq!(session.input(), "olxá");

        session.cursor_end();
        session.backspace();
        assert_eq!(session.input(), "olx");

        session.cursor_home();
        session.delete();
        assert_eq!(session.input(), "lx");
        assert_eq!(session.cursor(), 0);

        session.cursor_right();
        session.cursor_right();
        session.cursor_right();
        assert_eq!(session.cursor(), 2);
    }
}
