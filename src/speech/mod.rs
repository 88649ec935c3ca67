//! Speech capabilities behind small traits, so the chat front end only
//! starts and stops them.

mod command;

pub use command::CommandSynthesizer;

use crate::error::ChatError;
use crate::markdown::strip_markdown;
use tracing::{info, warn};

/// Something a recognizer reports between polls.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Every transcript of the session so far, interim ones included.
    Results(Vec<String>),
    Error(String),
}

/// Continuous speech-to-text capture.
pub trait SpeechRecognizer: Send {
    fn start(&mut self) -> Result<(), ChatError>;
    fn stop(&mut self);
    fn poll_event(&mut self) -> Option<RecognitionEvent>;
}

/// Text-to-speech output.
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, text: &str) -> Result<(), ChatError>;
    fn cancel(&mut self);
    fn is_speaking(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Listening,
    Stopped,
}

/// What a poll of the voice input produced.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceUpdate {
    /// New content for the input field.
    Transcript(String),
    /// Recognition failed and listening has stopped.
    Failed(String),
}

/// Speech input toggled from the chat.
pub struct VoiceInput {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    listening: bool,
}

impl VoiceInput {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            listening: false,
        }
    }

    /// Voice input for an environment without speech recognition.
    pub fn unsupported() -> Self {
        Self::new(None)
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn toggle(&mut self) -> Result<ListeningState, ChatError> {
        let recognizer = self
            .recognizer
            .as_mut()
            .ok_or(ChatError::Unsupported("Speech recognition"))?;

        if self.listening {
            recognizer.stop();
            self.listening = false;
            Ok(ListeningState::Stopped)
        } else {
            recognizer.start()?;
            self.listening = true;
            info!("listening for speech");
            Ok(ListeningState::Listening)
        }
    }

    /// Stops capture if it is running. Called before every send.
    pub fn stop(&mut self) {
        if !self.listening {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.listening = false;
    }

    pub fn poll(&mut self) -> Option<VoiceUpdate> {
        let recognizer = self.recognizer.as_mut()?;
        match recognizer.poll_event()? {
            RecognitionEvent::Results(transcripts) => Some(VoiceUpdate::Transcript(transcripts.concat())),
            RecognitionEvent::Error(error) => {
                warn!(%error, "speech recognition error");
                self.listening = false;
                Some(VoiceUpdate::Failed(error))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Speaking,
    Stopped,
}

/// Reads model replies aloud, one utterance at a time.
pub struct VoicePlayback {
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
}

impl VoicePlayback {
    pub fn new(synthesizer: Option<Box<dyn SpeechSynthesizer>>) -> Self {
        Self { synthesizer }
    }

    pub fn is_speaking(&mut self) -> bool {
        self.synthesizer
            .as_mut()
            .map(|synth| synth.is_speaking())
            .unwrap_or(false)
    }

    /// Stops the active utterance, or starts reading `markdown` when idle.
    pub fn toggle(&mut self, markdown: &str) -> Result<PlaybackState, ChatError> {
        let synthesizer = self
            .synthesizer
            .as_mut()
            .ok_or(ChatError::Unsupported("Speech synthesis"))?;

        if synthesizer.is_speaking() {
            synthesizer.cancel();
            return Ok(PlaybackState::Stopped);
        }

        synthesizer.speak(&strip_markdown(markdown))?;
        Ok(PlaybackState::Speaking)
    }

    pub fn cancel(&mut self) {
        if let Some(synthesizer) = self.synthesizer.as_mut() {
            if synthesizer.is_speaking() {
                synthesizer.cancel();
            }
        }
    }
}

impl Drop for VoicePlayback {
    fn drop(&mut self) {
        self.cancel();
    }
}
