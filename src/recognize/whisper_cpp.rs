use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RecognizerConfig;
use crate::error::RecognitionError;
use crate::language::base_code;
use super::SpeechRecognizer;

/// whisper.cpp `-oj` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: Option<WhisperCppResult>,
    #[serde(default)]
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub timestamps: Option<WhisperCppTimestamps>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppTimestamps {
    pub from: String,
    pub to: String,
}

/// Recognizer that shells out to whisper.cpp
pub struct WhisperCppRecognizer {
    config: RecognizerConfig,
}

impl WhisperCppRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCppRecognizer {
    async fn recognize(&self, audio_sample: &[u8], lang: &str) -> Result<String, RecognitionError> {
        if audio_sample.is_empty() {
            return Err(RecognitionError::NoSpeechDetected);
        }

        let temp_dir = tempfile::tempdir()
            .map_err(|e| RecognitionError::ServiceUnavailable(format!("Failed to create temp directory: {}", e)))?;
        let audio_path = temp_dir.path().join("sample.wav");
        let output_prefix = temp_dir.path().join("sample");

        std::fs::File::create(&audio_path)
            .and_then(|mut file| file.write_all(audio_sample))
            .map_err(|e| RecognitionError::ServiceUnavailable(format!("Failed to write audio sample: {}", e)))?;

        info!("Recognizing {} bytes of audio ({})", audio_sample.len(), lang);

        let output = Command::new(&self.config.binary_path)
            .arg("-m").arg(&self.config.model_path)
            .arg("-l").arg(base_code(lang))
            .arg("-t").arg(self.config.threads.to_string())
            .arg("-f").arg(&audio_path)
            .arg("-oj")
            .arg("-of").arg(&output_prefix)
            .arg("-np")
            .output()
            .await
            .map_err(|e| RecognitionError::ServiceUnavailable(format!(
                "Failed to execute {}: {}", self.config.binary_path, e
            )))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::ServiceUnavailable(format!("whisper.cpp failed: {}", stderr.trim())));
        }

        let json_file = output_prefix.with_extension("json");
        let json_content = tokio::fs::read_to_string(&json_file).await
            .map_err(|e| RecognitionError::ServiceUnavailable(format!("Failed to read output: {}", e)))?;

        let whisper_output: WhisperCppOutput = serde_json::from_str(&json_content)
            .map_err(|e| RecognitionError::ServiceUnavailable(format!("Failed to parse whisper.cpp JSON: {}", e)))?;

        debug!("whisper.cpp returned {} segment(s)", whisper_output.transcription.len());
        transcript_text(&whisper_output)
    }
}

/// Join the spoken segments, classifying empty and non-speech output
pub fn transcript_text(output: &WhisperCppOutput) -> Result<String, RecognitionError> {
    let segments: Vec<&str> = output.transcription
        .iter()
        .map(|seg| seg.text.trim())
        .filter(|text| !text.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(RecognitionError::NoSpeechDetected);
    }

    let spoken: Vec<&str> = segments
        .into_iter()
        .filter(|text| !is_non_speech_marker(text))
        .collect();

    if spoken.is_empty() {
        return Err(RecognitionError::Unintelligible);
    }

    Ok(spoken.join(" "))
}

/// Annotations such as `[BLANK_AUDIO]`, `(music)` or `*inaudible*`
fn is_non_speech_marker(text: &str) -> bool {
    let bracketed = |open: char, close: char| text.starts_with(open) && text.ends_with(close);
    bracketed('[', ']') || bracketed('(', ')') || bracketed('*', '*') || text.chars().all(|c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn output(texts: &[&str]) -> WhisperCppOutput {
        WhisperCppOutput {
            result: Some(WhisperCppResult { language: "en".to_string() }),
            transcription: texts
                .iter()
                .map(|text| WhisperCppSegment { timestamps: None, text: text.to_string() })
                .collect(),
        }
    }

    #[test]
    fn test_transcript_joins_segments() {
        assert_eq!(transcript_text(&output(&[" Hello", " world. "])), Ok("Hello world.".to_string()));
    }

    #[test]
    fn test_transcript_classifies_failures() {
        assert_eq!(transcript_text(&output(&[])), Err(RecognitionError::NoSpeechDetected));
        assert_eq!(transcript_text(&output(&["  "])), Err(RecognitionError::NoSpeechDetected));
        assert_eq!(
            transcript_text(&output(&["[BLANK_AUDIO]", "(music)", "..."])),
            Err(RecognitionError::Unintelligible)
        );
        assert_eq!(transcript_text(&output(&["[MUSIC]", "Hi"])), Ok("Hi".to_string()));
    }

    #[test]
    fn test_parse_whisper_json() {
        let json = r#"{
            "result": {"language": "en"},
            "transcription": [
                {"timestamps": {"from": "00:00:00,000", "to": "00:00:02,000"}, "offsets": {"from": 0, "to": 2000}, "text": " Good morning"}
            ]
        }"#;
        let parsed: WhisperCppOutput = serde_json::from_str(json).unwrap();
        assert_eq!(transcript_text(&parsed), Ok("Good morning".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let mut config = Config::default().recognizer;
        config.binary_path = "/nonexistent/whisper-cli".to_string();
        let recognizer = WhisperCppRecognizer::new(config);

        let err = recognizer.recognize(b"RIFF....WAVE", "en").await.unwrap_err();
        assert!(matches!(err, RecognitionError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_empty_sample_is_no_speech() {
        let recognizer = WhisperCppRecognizer::new(Config::default().recognizer);
        let result = tokio_test::block_on(recognizer.recognize(&[], "en"));
        assert_eq!(result, Err(RecognitionError::NoSpeechDetected));
    }
}
