use crate::error::ChatError;
use crate::llm::{ChatMessage, LlmClient, Role};
use tracing::debug;

const INPUT_HISTORY_LIMIT: usize = 50;

/// Conversation state: the message list, the input buffer and the loading flag.
pub struct Conversation {
    messages: Vec<ChatMessage>,

    // Input state
    input: String,
    input_history: Vec<String>,
    input_history_index: usize,

    // Loading state
    is_loading: bool,

    /// Lines scrolled up from the newest message.
    scroll_back: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            input_history: Vec::new(),
            input_history_index: 0,
            is_loading: false,
            scroll_back: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    /// The newest model reply, if any.
    pub fn last_model_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|msg| msg.role == Role::Model)
    }

    pub fn handle_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Replaces the whole input, e.g. with a live speech transcript.
    pub fn set_input(&mut self, text: String) {
        self.input = text;
    }

    /// Go to the previous input in history
    pub fn previous_input(&mut self) {
        if self.input_history.is_empty() {
            return;
        }

        if self.input_history_index > 0 {
            self.input_history_index -= 1;
            self.input = self.input_history[self.input_history_index].clone();
        }
    }

    /// Go to the next input in history
    pub fn next_input(&mut self) {
        if self.input_history.is_empty() {
            return;
        }

        if self.input_history_index + 1 < self.input_history.len() {
            self.input_history_index += 1;
            self.input = self.input_history[self.input_history_index].clone();
        } else {
            self.input_history_index = self.input_history.len();
            self.input.clear();
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn scroll_to_latest(&mut self) {
        self.scroll_back = 0;
    }

    /// Starts a turn with the current input.
    ///
    /// Returns the conversation to send, or `None` when the input is blank
    /// or a request is already running. The user message is appended right
    /// away so it shows before the reply arrives.
    pub fn begin_submit(&mut self) -> Option<Vec<ChatMessage>> {
        if self.input.trim().is_empty() {
            return None;
        }
        if self.is_loading {
            debug!("submission ignored while a response is pending");
            return None;
        }

        let content = std::mem::take(&mut self.input);
        self.input_history.push(content.clone());
        if self.input_history.len() > INPUT_HISTORY_LIMIT {
            self.input_history.remove(0);
        }
        self.input_history_index = self.input_history.len();

        self.messages.push(ChatMessage::user(content));
        self.is_loading = true;
        self.scroll_to_latest();

        Some(self.messages.clone())
    }

    /// Completes the turn started by [`begin_submit`](Self::begin_submit).
    ///
    /// A reply is appended on success; on failure the list is left as it is
    /// and the error is handed back for display.
    pub fn finish_submit(&mut self, result: Result<String, ChatError>) -> Result<(), ChatError> {
        self.is_loading = false;
        self.scroll_to_latest();

        let text = result?;
        self.messages.push(ChatMessage::model(text));
        Ok(())
    }

    /// Runs a whole turn against `client`. Returns `Ok(false)` when nothing
    /// was sent.
    pub async fn submit(&mut self, client: &dyn LlmClient) -> Result<bool, ChatError> {
        let Some(history) = self.begin_submit() else {
            return Ok(false);
        };

        let result = client.generate_response(&history).await;
        self.finish_submit(result)?;
        Ok(true)
    }
}
