// Speech recognition gateways
//
// - WhisperCpp: runs the whisper.cpp command line tool on a captured sample
// - SpeechCapture: thin adapter the presentation layer uses to turn a sample
//   into typed text, falling back to a text prompt on any failure

pub mod capture;
pub mod whisper_cpp;

use async_trait::async_trait;

pub use capture::*;
use crate::config::RecognizerConfig;
use crate::error::RecognitionError;

/// Transcribe a captured audio sample
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio_sample: &[u8], lang: &str) -> Result<String, RecognitionError>;
}

/// Factory for creating recognizer instances
pub struct RecognizerFactory;

impl RecognizerFactory {
    pub fn create_default(config: RecognizerConfig) -> Box<dyn SpeechRecognizer> {
        Box::new(whisper_cpp::WhisperCppRecognizer::new(config))
    }
}
