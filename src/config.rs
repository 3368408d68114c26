use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, TsuyakuError};

// Default values for optional fields
fn default_timeout_secs() -> u64 {
    30
}

fn default_max_chunk_chars() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub translate: TranslateConfig,
    pub speech: SpeechConfig,
    pub recognizer: RecognizerConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Which translation service to use
    pub mode: TranslationMode,
    /// Service endpoint URL
    pub endpoint: String,
    /// LLM model to use (Ollama mode only)
    pub model: String,
    /// Maximum retries for failed translations
    pub max_retries: u32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationMode {
    /// Google web translation endpoint
    Google,
    /// Local LLM served by Ollama
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Synthesize speech for translations by default
    pub enabled: bool,
    /// Google TTS endpoint URL
    pub endpoint: String,
    /// Slow speaking rate
    pub slow: bool,
    /// Maximum characters per TTS request
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Path to whisper.cpp binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Path to the ggml model file
    pub model_path: PathBuf,
    /// Number of decoding threads
    pub threads: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// External player binary (e.g., mpv, afplay). None disables playback.
    pub player: Option<String>,
    /// Extra arguments passed before the audio file path
    /// Common options: ["--no-video", "--really-quiet"] for mpv
    pub player_args: Vec<String>,
    /// Directory to write synthesized audio into when no player is configured
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translate: TranslateConfig {
                mode: TranslationMode::Google,
                endpoint: "https://translate.googleapis.com".to_string(),
                model: "llama3.2:3b".to_string(),
                max_retries: 2,
                timeout_secs: default_timeout_secs(),
            },
            speech: SpeechConfig {
                enabled: false,
                endpoint: "https://translate.google.com".to_string(),
                slow: false,
                max_chunk_chars: default_max_chunk_chars(),
                timeout_secs: default_timeout_secs(),
            },
            recognizer: RecognizerConfig {
                binary_path: "whisper-cli".to_string(),
                model_path: PathBuf::from(".tsuyaku/models/ggml-base.bin"),
                threads: 4,
            },
            playback: PlaybackConfig {
                player: None,
                player_args: vec![],
                output_dir: None,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TsuyakuError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| TsuyakuError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TsuyakuError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TsuyakuError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Whether a command should synthesize speech, given its `--speak` flag
    pub fn wants_speech(&self, speak_flag: bool) -> bool {
        speak_flag || self.speech.enabled
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.timeout_secs == 0 {
            return Err(TsuyakuError::Config("translate.timeout_secs must be greater than 0".to_string()));
        }
        if self.speech.timeout_secs == 0 {
            return Err(TsuyakuError::Config("speech.timeout_secs must be greater than 0".to_string()));
        }
        if self.speech.max_chunk_chars == 0 {
            return Err(TsuyakuError::Config("speech.max_chunk_chars must be greater than 0".to_string()));
        }
        Ok(())
    }
}
