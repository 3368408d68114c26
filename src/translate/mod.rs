// Translation gateways
//
// The session only depends on the `Translator` trait. Concrete services:
// - Google: the public web translation endpoint
// - Ollama: a local LLM prompted to return JSON

pub mod common;
pub mod google;
pub mod ollama;

use async_trait::async_trait;

pub use common::*;
use crate::config::{TranslateConfig, TranslationMode};
use crate::error::{Result, ServiceError};

/// Translate text between two languages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<String, ServiceError>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a translator based on the translation mode
    pub fn create_translator(config: TranslateConfig) -> Result<Box<dyn Translator>> {
        match config.mode {
            TranslationMode::Google => Ok(Box::new(google::GoogleTranslator::new(config)?)),
            TranslationMode::Ollama => Ok(Box::new(ollama::OllamaTranslator::new(config)?)),
        }
    }
}
