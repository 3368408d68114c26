use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, ServiceError};
use crate::language::LanguageCatalog;
use super::{Translator, common::{http_client, http_error, with_retries}};

const SERVICE: &str = "ollama";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Translator that prompts a local Ollama model
pub struct OllamaTranslator {
    client: Client,
    config: TranslateConfig,
    languages: LanguageCatalog,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            config,
            languages: LanguageCatalog::default(),
        })
    }

    async fn generate(&self, prompt: String) -> std::result::Result<String, ServiceError> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, "HTTP request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::new(SERVICE, format!("Ollama API error {}: {}", status, error_text)));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| http_error(SERVICE, "Failed to parse response", e))?;

        let raw_response = generated.response.trim();
        debug!("Raw Ollama response: {}", raw_response);

        extract_translation(raw_response)
            .ok_or_else(|| ServiceError::new(SERVICE, "Empty translation received"))
    }

    fn build_prompt(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        let source_name = self.languages.label_or_code(source_lang);
        let target_name = self.languages.label_or_code(target_lang);

        format!(
            "You are a professional translator.\n\
             \n\
             Translate the text from {} to {} ONLY. Do not translate to any other language.\n\
             The target language is: {} (language code: {})\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             [Text to translate]\n\
             {}\n",
            source_name, target_name, target_name, target_lang, target_name, text
        )
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, ServiceError> {
        let prompt = self.build_prompt(text, source_lang, target_lang);
        with_retries(SERVICE, self.config.max_retries, || self.generate(prompt.clone())).await
    }
}

/// Pull the translation out of a model response: the `{"text": ...}` object,
/// possibly wrapped in a code fence or preamble, otherwise the bare reply.
fn extract_translation(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let object = match (raw.find('{'), raw.rfind('}')) {
        (Some(open), Some(close)) if open < close => &raw[open..=close],
        _ => raw,
    };
    if let Ok(result) = serde_json::from_str::<TranslationResult>(object) {
        let text = result.text.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }

    let text = clean_translation_response(raw);
    (!text.is_empty()).then_some(text)
}

/// Reply that ignored the JSON format: drop fences and a "Here is ...:"
/// lead-in, then a `Translation:` label and surrounding quotes
fn clean_translation_response(response: &str) -> String {
    let line = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .find(|line| !(line.starts_with("Here") && line.ends_with(':')))
        .unwrap_or_default();

    let line = line.strip_prefix("Translation:").map(str::trim).unwrap_or(line);
    line.trim_matches('"').trim().to_string()
}
