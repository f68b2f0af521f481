use std::env;
use std::process::Command;

use async_trait::async_trait;
use eyre::{Result, eyre};
use tracing::debug;

/// Capability seam for voice dictation. The chat loop treats the
/// transcriber as an external collaborator: it asks for one utterance and
/// feeds the transcript into the normal submit path.
#[async_trait]
pub trait SpeechInput: Send {
    /// Capture one utterance. `None` means dictation is not configured.
    async fn transcribe(&mut self) -> Result<Option<String>>;
}

/// Dictation via an external transcriber command named in
/// `UNA_DICTATION_CMD`. The command is expected to block while recording
/// and print the transcript to stdout.
pub struct CommandDictation {
    command: Option<String>,
}

impl CommandDictation {
    pub fn from_env() -> Self {
        Self {
            command: env::var("UNA_DICTATION_CMD").ok(),
        }
    }
}

#[async_trait]
impl SpeechInput for CommandDictation {
    async fn transcribe(&mut self) -> Result<Option<String>> {
        let Some(command) = &self.command else {
            return Ok(None);
        };

        debug!("running dictation command: {}", command);

        let output = Command::new("bash")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| eyre!("failed to run dictation command: {}", e))?;

        if !output.status.success() {
            return Err(eyre!("dictation command exited with {}", output.status));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!transcript.is_empty()).then_some(transcript))
    }
}
