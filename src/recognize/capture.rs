use std::sync::Arc;
use tracing::{info, warn};

use crate::error::RecognitionError;
use super::SpeechRecognizer;

/// What the presentation layer should do after a capture attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Recognized text, ready to submit
    Text(String),
    /// Recognition failed; ask the user to type instead
    PromptForText(RecognitionError),
}

/// Turns captured audio into text through a `SpeechRecognizer`
#[derive(Clone)]
pub struct SpeechCapture {
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl SpeechCapture {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Recognize `sample`, trimming the result. Blank transcripts count as no speech.
    pub async fn capture(&self, sample: &[u8], lang: &str) -> Result<String, RecognitionError> {
        let text = self.recognizer.recognize(sample, lang).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RecognitionError::NoSpeechDetected);
        }
        Ok(text.to_string())
    }

    /// Like `capture`, but every failure kind becomes a text prompt
    pub async fn capture_or_prompt(&self, sample: &[u8], lang: &str) -> CaptureOutcome {
        match self.capture(sample, lang).await {
            Ok(text) => {
                info!("Recognized speech: {}", text);
                CaptureOutcome::Text(text)
            }
            Err(e) => {
                warn!("Speech capture failed, falling back to typed input: {}", e);
                CaptureOutcome::PromptForText(e)
            }
        }
    }
}
