use std::process::Stdio;

use tokio::process::{Child, Command as TokioCommand};
use tracing::{debug, warn};

use super::SpeechSynthesizer;
use crate::error::ChatError;

/// Speaks by running an external text-to-speech program such as `espeak`,
/// with the text as its last argument.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl CommandSynthesizer {
    /// Builds a synthesizer from `program arg...`. Returns `None` for an
    /// empty command line.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            child: None,
        })
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&mut self, text: &str) -> Result<(), ChatError> {
        self.cancel();

        let child = TokioCommand::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ChatError::Speech(format!("failed to run {}: {}", self.program, e)))?;

        debug!(program = %self.program, pid = ?child.id(), "speaking");
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to stop speech process");
            }
        }
    }

    fn is_speaking(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                self.child = None;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert!(CommandSynthesizer::from_parts(&[]).is_none());

        let synth = CommandSynthesizer::from_parts(&["espeak".to_string(), "-s".to_string(), "160".to_string()])
            .expect("non-empty command");
        assert_eq!(synth.program, "espeak");
        assert_eq!(synth.args, vec!["-s", "160"]);
    }

    #[tokio::test]
    async fn test_missing_program_reports_speech_error() {
        let mut synth = CommandSynthesizer::from_parts(&["gemchat-no-such-tts-binary".to_string()])
            .expect("non-empty command");

        let err = synth.speak("hello").unwrap_err();
        assert!(matches!(err, ChatError::Speech(_)));
        assert!(!synth.is_speaking());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_stops_running_process() -> anyhow::Result<()> {
        // `sleep` stands in for a speech program; the text becomes its duration.
        let mut synth = CommandSynthesizer::from_parts(&["sleep".to_string()]).expect("non-empty command");

        synth.speak("5")?;
        assert!(synth.is_speaking());

        synth.cancel();
        assert!(!synth.is_speaking());
        Ok(())
    }
}
