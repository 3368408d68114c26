// Speech synthesis gateways
//
// The session asks a `SpeechSynthesizer` for encoded audio of a translation.
// - GoogleTts: the Google Translate text-to-speech endpoint (MP3)

pub mod google_tts;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::SpeechConfig;
use crate::error::{Result, ServiceError};

/// Turn text into encoded audio bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &str) -> std::result::Result<Vec<u8>, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }
}

/// Synthesized audio attached to an exchange. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Arc<[u8]>,
    pub format: AudioFormat,
}

impl AudioClip {
    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
            format: AudioFormat::Mp3,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    pub fn create_default(config: SpeechConfig) -> Result<Box<dyn SpeechSynthesizer>> {
        Ok(Box::new(google_tts::GoogleTts::new(config)?))
    }
}
