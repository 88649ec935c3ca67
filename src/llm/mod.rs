mod gemini;
mod models;

pub use gemini::GeminiClient;
pub use models::{ChatMessage, Role};

use crate::error::ChatError;
use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produces the model's reply to the conversation so far.
    async fn generate_response(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;

    fn model_name(&self) -> &str;
}
