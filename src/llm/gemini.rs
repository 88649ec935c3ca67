use super::models::{
    ApiErrorBody, ChatMessage, Content, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, Role,
};
use super::LlmClient;
use crate::config::{GeminiConfig, HistoryMode};
use crate::error::ChatError;
use async_trait::async_trait;
use tracing::{debug, warn};

const FALLBACK_ERROR: &str = "Failed to generate response";

pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            generation: GenerationConfig::default(),
        }
    }

    /// Builds the request contents according to the configured history mode.
    fn build_contents(&self, messages: &[ChatMessage]) -> Result<Vec<Content>, ChatError> {
        match self.config.history {
            HistoryMode::LastUserMessage => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|msg| msg.role == Role::User)
                    .ok_or(ChatError::NoUserMessage)?;
                Ok(vec![Content::text(None, &last_user.content)])
            }
            HistoryMode::Full => {
                if !messages.iter().any(|msg| msg.role == Role::User) {
                    return Err(ChatError::NoUserMessage);
                }
                Ok(messages
                    .iter()
                    .map(|msg| Content::text(Some(msg.role), &msg.content))
                    .collect())
            }
        }
    }

    async fn send_request(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ChatError> {
        debug!(model = %self.config.model, contents = request.contents.len(), "sending generateContent request");

        let response = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| FALLBACK_ERROR.to_string());
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ChatError::MalformedResponse(e.to_string()))
    }
}

fn first_candidate_text(response: GenerateContentResponse) -> Result<String, ChatError> {
    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or(ChatError::EmptyCandidates)?;

    candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| ChatError::MalformedResponse("candidate has no text part".to_string()))
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate_response(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let request = GenerateContentRequest {
            contents: self.build_contents(messages)?,
            generation_config: self.generation.clone(),
        };

        let result = self.send_request(&request).await.and_then(first_candidate_text);
        if let Err(err) = &result {
            warn!(error = %err, "error generating response");
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/models/gemini-test:generateContent";

    fn client_for(server: &MockServer, history: HistoryMode) -> GeminiClient {
        let config = GeminiConfig::new("test-key")
            .with_base_url(&server.uri())
            .with_model("gemini-test")
            .with_history(history);
        GeminiClient::new(config)
    }

    fn reply(text: &str) -> Value {
        json!({
            "candidates": [
                { "content": { "role": "model", "parts": [ { "text": text } ] } }
            ]
        })
    }

    async fn last_request_body(server: &MockServer) -> anyhow::Result<Value> {
        let requests = server
            .received_requests()
            .await
            .ok_or_else(|| anyhow::anyhow!("request recording disabled"))?;
        let request = requests
            .last()
            .ok_or_else(|| anyhow::anyhow!("no request received"))?;
        Ok(request.body_json::<Value>()?)
    }

    #[tokio::test]
    async fn test_sends_only_latest_user_message() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let messages = vec![
            ChatMessage::user("first question".to_string()),
            ChatMessage::model("first answer".to_string()),
            ChatMessage::user("second question".to_string()),
        ];

        let text = client.generate_response(&messages).await?;
        assert_eq!(text, "Hi there");

        let body = last_request_body(&server).await?;
        assert_eq!(
            body["contents"],
            json!([{ "parts": [{ "text": "second question" }] }])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sends_fixed_generation_config() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        client
            .generate_response(&[ChatMessage::user("hello".to_string())])
            .await?;

        let body = last_request_body(&server).await?;
        let config = &body["generationConfig"];
        assert_eq!(config["topK"], json!(40));
        assert_eq!(config["maxOutputTokens"], json!(1024));
        assert!((config["temperature"].as_f64().unwrap_or_default() - 0.7).abs() < 1e-6);
        assert!((config["topP"].as_f64().unwrap_or_default() - 0.95).abs() < 1e-6);
        Ok(())
    }

    #[tokio::test]
    async fn test_full_history_sends_every_message_with_roles() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::Full);
        let messages = vec![
            ChatMessage::user("one".to_string()),
            ChatMessage::model("two".to_string()),
            ChatMessage::user("three".to_string()),
        ];
        client.generate_response(&messages).await?;

        let body = last_request_body(&server).await?;
        assert_eq!(
            body["contents"],
            json!([
                { "role": "user", "parts": [{ "text": "one" }] },
                { "role": "model", "parts": [{ "text": "two" }] },
                { "role": "user", "parts": [{ "text": "three" }] }
            ])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_api_error_uses_message_from_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let err = client
            .generate_response(&[ChatMessage::user("hello".to_string())])
            .await
            .unwrap_err();

        match err {
            ChatError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_without_body_uses_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let err = client
            .generate_response(&[ChatMessage::user("hello".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ChatError::Api { status: 503, ref message } if message == FALLBACK_ERROR
        ));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let err = client
            .generate_response(&[ChatMessage::user("hello".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::EmptyCandidates));
        assert_eq!(err.to_string(), "No response generated");
    }

    #[tokio::test]
    async fn test_missing_candidates_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "promptFeedback": {} })))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let err = client
            .generate_response(&[ChatMessage::user("hello".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::EmptyCandidates));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let err = client
            .generate_response(&[ChatMessage::user("hello".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_no_user_message_is_rejected_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("never")))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, HistoryMode::LastUserMessage);
        let err = client
            .generate_response(&[ChatMessage::model("orphan".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::NoUserMessage));
    }
}
