//! Translation session: the ordered history of exchanges and the
//! translate-then-speak lifecycle of a single request.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, ServiceError, TsuyakuError};
use crate::language::LanguageCatalog;
use crate::speech::{AudioClip, SpeechSynthesizer};
use crate::translate::Translator;

/// Identifier of an exchange, unique for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeId(pub u64);

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Waiting on the translation service
    Pending,
    /// Translation returned, successfully or not
    Completed,
}

/// One translation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub id: ExchangeId,
    pub created_at: DateTime<Utc>,
    pub source_lang: String,
    pub target_lang: String,
    pub source_text: String,
    /// Only set when `success` is true
    pub translated_text: Option<String>,
    pub audio: Option<AudioClip>,
    pub success: bool,
    pub favorite: bool,
    pub state: ExchangeState,
}

impl Exchange {
    fn pending(id: ExchangeId, request: &TranslationRequest, source_text: &str) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            source_lang: request.source_lang.clone(),
            target_lang: request.target_lang.clone(),
            source_text: source_text.to_string(),
            translated_text: None,
            audio: None,
            success: false,
            favorite: false,
            state: ExchangeState::Pending,
        }
    }

    fn succeed(&mut self, translated_text: String) {
        self.translated_text = Some(translated_text);
        self.success = true;
        self.state = ExchangeState::Completed;
    }

    fn fail(&mut self) {
        self.translated_text = None;
        self.success = false;
        self.state = ExchangeState::Completed;
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// A user's request to translate some text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub want_speech: bool,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            want_speech: false,
        }
    }

    pub fn with_speech(mut self, want_speech: bool) -> Self {
        self.want_speech = want_speech;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    #[default]
    Chronological,
    MostRecentFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Attempts since the last clear, failed ones included
    pub total: u64,
    pub favorites: usize,
}

/// Point-in-time copy of the history. Later session changes do not affect it.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    items: std::vec::IntoIter<Exchange>,
    order: HistoryOrder,
}

impl Iterator for HistorySnapshot {
    type Item = Exchange;

    fn next(&mut self) -> Option<Exchange> {
        match self.order {
            HistoryOrder::Chronological => self.items.next(),
            HistoryOrder::MostRecentFirst => self.items.next_back(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl DoubleEndedIterator for HistorySnapshot {
    fn next_back(&mut self) -> Option<Exchange> {
        match self.order {
            HistoryOrder::Chronological => self.items.next_back(),
            HistoryOrder::MostRecentFirst => self.items.next(),
        }
    }
}

impl ExactSizeIterator for HistorySnapshot {}

impl FusedIterator for HistorySnapshot {}

#[derive(Debug, Default)]
struct SessionState {
    exchanges: Vec<Exchange>,
    favorites: BTreeSet<ExchangeId>,
    attempts: u64,
    /// Never reset, so identifiers are not reused after `clear`
    next_id: u64,
    pending: Option<Exchange>,
}

impl SessionState {
    fn allocate_id(&mut self) -> ExchangeId {
        self.next_id += 1;
        ExchangeId(self.next_id)
    }

    fn record(&mut self, exchange: Exchange) {
        self.pending = None;
        self.attempts += 1;
        self.exchanges.push(exchange);
    }
}

/// In-memory translation session.
///
/// Owns the exchange history; callers read through `list_history` and `stats`
/// and mutate only through `submit`, `toggle_favorite` and `clear`.
/// Concurrent `submit` calls are serialized.
pub struct Session {
    id: Uuid,
    catalog: LanguageCatalog,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    in_flight: AsyncMutex<()>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        catalog: LanguageCatalog,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Created session");
        Self {
            id,
            catalog,
            translator,
            synthesizer,
            in_flight: AsyncMutex::new(()),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    /// Translate `request.text`, optionally synthesize speech, and record the exchange.
    ///
    /// A failed translation is still recorded and returned inside
    /// `TsuyakuError::TranslationFailed`. Speech synthesis failures are absorbed.
    pub async fn submit(&self, request: TranslationRequest) -> Result<Exchange> {
        let source_text = request.text.trim();
        if source_text.is_empty() {
            return Err(TsuyakuError::InvalidRequest("source text is empty".to_string()));
        }
        for lang in [&request.source_lang, &request.target_lang] {
            if !self.catalog.contains(lang) {
                return Err(TsuyakuError::InvalidRequest(format!("unknown language code '{}'", lang)));
            }
        }

        let _in_flight = self.in_flight.lock().await;

        let mut exchange = {
            let mut state = self.state();
            let exchange = Exchange::pending(state.allocate_id(), &request, source_text);
            state.pending = Some(exchange.clone());
            exchange
        };
        let _pending = PendingGuard { session: self };

        info!(
            session = %self.id,
            "Translating exchange {} ({} -> {})",
            exchange.id, exchange.source_lang, exchange.target_lang
        );

        let outcome = self.translator
            .translate(&exchange.source_text, &exchange.source_lang, &exchange.target_lang)
            .await
            .and_then(|text| {
                let text = text.trim();
                if text.is_empty() {
                    Err(ServiceError::new("translator", "empty translation received"))
                } else {
                    Ok(text.to_string())
                }
            });

        let failure = match outcome {
            Ok(translated) => {
                exchange.succeed(translated.clone());
                if request.want_speech {
                    let speech = self.synthesize(&translated, &exchange.target_lang).await;
                    match speech {
                        Ok(clip) => exchange.audio = Some(clip),
                        Err(e) => warn!(session = %self.id, "Exchange {} has no audio: {}", exchange.id, e),
                    }
                }
                info!(session = %self.id, "Exchange {} completed", exchange.id);
                None
            }
            Err(e) => {
                exchange.fail();
                warn!(session = %self.id, "Exchange {} failed: {}", exchange.id, e);
                Some(e)
            }
        };

        self.state().record(exchange.clone());

        match failure {
            None => Ok(exchange),
            Some(source) => Err(TsuyakuError::TranslationFailed {
                exchange: Box::new(exchange),
                source,
            }),
        }
    }

    async fn synthesize(&self, text: &str, lang: &str) -> Result<AudioClip> {
        let bytes = self.synthesizer
            .synthesize(text, lang)
            .await
            .map_err(TsuyakuError::SpeechSynthesisFailed)?;
        if bytes.is_empty() {
            return Err(TsuyakuError::SpeechSynthesisFailed(ServiceError::new(
                "synthesizer",
                "empty audio received",
            )));
        }
        Ok(AudioClip::mp3(bytes))
    }

    /// Flip the favorite flag of an exchange, returning the new flag
    pub fn toggle_favorite(&self, id: ExchangeId) -> Result<bool> {
        let mut state = self.state();
        let SessionState { exchanges, favorites, .. } = &mut *state;

        let exchange = exchanges
            .iter_mut()
            .find(|exchange| exchange.id == id)
            .ok_or(TsuyakuError::NotFound(id))?;

        exchange.favorite = !favorites.remove(&id);
        if exchange.favorite {
            favorites.insert(id);
        }
        debug!(session = %self.id, "Exchange {} favorite: {}", id, exchange.favorite);
        Ok(exchange.favorite)
    }

    /// Drop every exchange and favorite and reset the attempt counter.
    ///
    /// Does not wait for a `submit` in flight; that exchange is recorded
    /// after the clear and counts toward the new total.
    pub fn clear(&self) {
        let mut state = self.state();
        state.exchanges.clear();
        state.favorites.clear();
        state.attempts = 0;
        info!(session = %self.id, "History cleared");
    }

    pub fn list_history(&self, order: HistoryOrder) -> HistorySnapshot {
        HistorySnapshot {
            items: self.state().exchanges.clone().into_iter(),
            order,
        }
    }

    /// Favorited exchanges, oldest first
    pub fn favorites(&self) -> Vec<Exchange> {
        self.state()
            .exchanges
            .iter()
            .filter(|exchange| exchange.favorite)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: ExchangeId) -> Option<Exchange> {
        self.state().exchanges.iter().find(|exchange| exchange.id == id).cloned()
    }

    /// The exchange currently waiting on the translator, if any
    pub fn in_flight(&self) -> Option<Exchange> {
        self.state().pending.clone()
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state();
        SessionStats {
            total: state.attempts,
            favorites: state.favorites.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.state().exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().exchanges.is_empty()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // State is always left consistent, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the pending slot if `submit` is dropped before recording
struct PendingGuard<'a> {
    session: &'a Session,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.session.state().pending = None;
    }
}
