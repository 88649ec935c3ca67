use thiserror::Error;

/// Everything that can go wrong while chatting.
///
/// None of these are fatal: the front end turns them into notifications and
/// the conversation stays usable.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A speech capability is not available in this environment.
    #[error("{0} is not supported in this terminal.")]
    Unsupported(&'static str),

    /// The API answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("No response generated")]
    EmptyCandidates,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to reach the language model: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("No user message to send")]
    NoUserMessage,

    #[error("{0} must be set")]
    MissingConfig(&'static str),

    #[error("Speech playback failed: {0}")]
    Speech(String),
}
