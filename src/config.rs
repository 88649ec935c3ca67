use crate::error::ChatError;
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.0-pro-latest";

/// How much of the conversation goes out with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Only the most recent user message.
    #[default]
    LastUserMessage,
    /// Every message, tagged with its role.
    Full,
}

impl HistoryMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last" | "last-user" => Some(HistoryMode::LastUserMessage),
            "full" => Some(HistoryMode::Full),
            _ => None,
        }
    }
}

/// Connection settings for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub history: HistoryMode,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            history: HistoryMode::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_history(mut self, history: HistoryMode) -> Self {
        self.history = history;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Everything read from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    /// Program and arguments used to speak text aloud.
    pub tts_command: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ChatError::MissingConfig("GEMINI_API_KEY"))?;

        let mut gemini = GeminiConfig::new(api_key);
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            gemini = gemini.with_base_url(&base_url);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            gemini = gemini.with_model(&model);
        }
        if let Some(value) = lookup("GEMCHAT_HISTORY") {
            match HistoryMode::parse(&value) {
                Some(history) => gemini = gemini.with_history(history),
                None => tracing::warn!(%value, "unknown GEMCHAT_HISTORY value, sending last message only"),
            }
        }

        let tts_command = lookup("GEMCHAT_TTS_COMMAND")
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());

        Ok(Self {
            gemini,
            tts_command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ChatError::MissingConfig("GEMINI_API_KEY"))));

        let result = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "secret")]))?;

        assert_eq!(config.gemini.api_key, "secret");
        assert_eq!(config.gemini.history, HistoryMode::LastUserMessage);
        assert_eq!(
            config.gemini.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.0-pro-latest:generateContent"
        );
        assert!(config.tts_command.is_none());
        Ok(())
    }

    #[test]
    fn test_overrides() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_BASE_URL", "http://localhost:8080/"),
            ("GEMINI_MODEL", "gemini-test"),
            ("GEMCHAT_HISTORY", "FULL"),
            ("GEMCHAT_TTS_COMMAND", "espeak -s 160"),
        ]))?;

        assert_eq!(
            config.gemini.endpoint(),
            "http://localhost:8080/models/gemini-test:generateContent"
        );
        assert_eq!(config.gemini.history, HistoryMode::Full);
        assert_eq!(
            config.tts_command,
            Some(vec!["espeak".to_string(), "-s".to_string(), "160".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_unknown_history_mode_keeps_default() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMCHAT_HISTORY", "everything"),
        ]))?;
        assert_eq!(config.gemini.history, HistoryMode::LastUserMessage);
        Ok(())
    }
}
