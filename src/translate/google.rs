use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, ServiceError};
use crate::language::base_code;
use super::{Translator, common::{http_client, http_error, with_retries}};

const SERVICE: &str = "google-translate";

/// Translator backed by the Google web translation endpoint
pub struct GoogleTranslator {
    client: Client,
    config: TranslateConfig,
}

impl GoogleTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            config,
        })
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> std::result::Result<String, ServiceError> {
        let url = format!("{}/translate_a/single", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| http_error(SERVICE, "HTTP request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::new(SERVICE, format!("API error {}: {}", status, error_text)));
        }

        let body: Value = response.json().await
            .map_err(|e| http_error(SERVICE, "Failed to parse response", e))?;

        parse_translation(&body)
            .ok_or_else(|| ServiceError::new(SERVICE, "Unexpected response shape"))
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, ServiceError> {
        let source = base_code(source_lang);
        let target = base_code(target_lang);
        with_retries(SERVICE, self.config.max_retries, || self.request(text, source, target)).await
    }
}

/// Join the translated sentence fragments of a `translate_a/single` response.
///
/// The body looks like `[[["Hola ","Hello ",...],["mundo","world",...]],null,"en",...]`.
fn parse_translation(body: &Value) -> Option<String> {
    let sentences = body.get(0)?.as_array()?;
    let mut translated = String::new();
    for sentence in sentences {
        if let Some(fragment) = sentence.get(0).and_then(Value::as_str) {
            translated.push_str(fragment);
        }
    }

    let translated = translated.trim();
    if translated.is_empty() {
        None
    } else {
        Some(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_translation_joins_fragments() {
        let body = json!([
            [["Hola, ", "Hello, ", null, null, 10], ["mundo.", "world.", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_translation(&body).as_deref(), Some("Hola, mundo."));
    }

    #[test]
    fn test_parse_translation_rejects_empty() {
        assert_eq!(parse_translation(&json!([[], null, "en"])), None);
        assert_eq!(parse_translation(&json!({"error": "bad"})), None);
    }
}
