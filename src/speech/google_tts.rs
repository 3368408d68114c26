use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::{Result, ServiceError};
use crate::language::base_code;
use crate::translate::{http_client, http_error};
use super::SpeechSynthesizer;

const SERVICE: &str = "google-tts";

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', ';', '\u{3002}', '\u{ff01}', '\u{ff1f}', '\n'];

/// Text-to-speech through the Google Translate TTS endpoint.
///
/// The endpoint refuses long inputs, so text is sent in chunks and the MP3
/// frames of every chunk are concatenated.
pub struct GoogleTts {
    client: Client,
    config: SpeechConfig,
}

impl GoogleTts {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            config,
        })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> std::result::Result<Vec<u8>, ServiceError> {
        let url = format!("{}/translate_tts", self.config.endpoint.trim_end_matches('/'));
        let speed = if self.config.slow { "0.24" } else { "1" };
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();

        debug!("Requesting TTS chunk {}/{} from: {}", idx, total, url);

        let response = self.client
            .get(&url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", chunk),
                ("ttsspeed", speed),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| http_error(SERVICE, "HTTP request failed", e))?;

        if !response.status().is_success() {
            return Err(ServiceError::new(SERVICE, format!("TTS API error {}", response.status())));
        }

        let bytes = response.bytes().await
            .map_err(|e| http_error(SERVICE, "Failed to read audio", e))?;

        if bytes.is_empty() {
            return Err(ServiceError::new(SERVICE, "Empty audio received"));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, lang: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        let chunks = split_text(text, self.config.max_chunk_chars);
        if chunks.is_empty() {
            return Err(ServiceError::new(SERVICE, "No text to speak"));
        }

        let lang = base_code(lang);
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, lang, idx, chunks.len()).await?);
        }

        debug!("Synthesized {} bytes of audio in {} chunk(s)", audio.len(), chunks.len());
        Ok(audio)
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Each sentence starts a new chunk. Long sentences are packed word by word,
/// and words longer than the limit (e.g. unspaced CJK text) are cut hard.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    for sentence in split_sentences(text) {
        let mut current = String::new();
        let mut current_len = 0;

        for word in sentence.split_whitespace() {
            let word_len = word.chars().count();

            if word_len > max_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let chars: Vec<char> = word.chars().collect();
                for piece in chars.chunks(max_chars) {
                    chunks.push(piece.iter().collect());
                }
                continue;
            }

            let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
            if needed > max_chars {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }
    }

    chunks
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if SENTENCE_TERMINATORS.contains(&ch) {
            let end = idx + ch.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
