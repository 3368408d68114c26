use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tsuyaku::error::{ServiceError, TsuyakuError};
use tsuyaku::language::LanguageCatalog;
use tsuyaku::session::{HistoryOrder, Session, TranslationRequest};
use tsuyaku::speech::SpeechSynthesizer;
use tsuyaku::translate::Translator;

/// Looks translations up in a phrase book; unknown phrases fail
struct PhraseBook {
    phrases: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl Translator for PhraseBook {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, ServiceError> {
        self.phrases
            .get(text)
            .map(|t| t.to_string())
            .ok_or_else(|| ServiceError::new("phrasebook", format!("no entry for '{}'", text)))
    }
}

struct FixedSpeech(Option<Vec<u8>>);

#[async_trait]
impl SpeechSynthesizer for FixedSpeech {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Result<Vec<u8>, ServiceError> {
        self.0.clone().ok_or_else(|| ServiceError::new("speech", "offline"))
    }
}

fn session_with(speech: Option<Vec<u8>>) -> Session {
    let phrases = HashMap::from([("Hola", "Hello"), ("Adiós", "Goodbye"), ("Gracias", "Thank you")]);
    Session::new(
        LanguageCatalog::default(),
        Arc::new(PhraseBook { phrases }),
        Arc::new(FixedSpeech(speech)),
    )
}

#[tokio::test]
async fn ids_strictly_increase_across_failures_and_clears() {
    let session = session_with(None);
    let mut ids = Vec::new();

    for text in ["Hola", "unknown", "Gracias"] {
        match session.submit(TranslationRequest::new(text, "es", "en")).await {
            Ok(exchange) => ids.push(exchange.id),
            Err(TsuyakuError::TranslationFailed { exchange, .. }) => ids.push(exchange.id),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    session.clear();
    ids.push(session.submit(TranslationRequest::new("Adiós", "es", "en")).await.unwrap().id);

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "ids not increasing: {ids:?}");
}

#[tokio::test]
async fn empty_text_is_rejected_without_history() {
    let session = session_with(None);
    let err = session.submit(TranslationRequest::new("", "en", "es")).await.unwrap_err();

    assert!(matches!(err, TsuyakuError::InvalidRequest(_)));
    assert!(!err.is_retryable());
    assert_eq!(session.len(), 0);
}

#[tokio::test]
async fn successful_submit_with_speech() {
    let session = session_with(Some(vec![0x49, 0x44, 0x33]));
    let before = session.stats().total;

    let exchange = session
        .submit(TranslationRequest::new("Hola", "es", "en").with_speech(true))
        .await
        .unwrap();

    assert!(exchange.success);
    assert_eq!(exchange.translated_text.as_deref(), Some("Hello"));
    assert!(exchange.audio.is_some());
    assert_eq!(session.len(), 1);
    assert_eq!(session.stats().total, before + 1);
}

#[tokio::test]
async fn speech_failure_does_not_fail_submit() {
    let session = session_with(None);
    let exchange = session
        .submit(TranslationRequest::new("Hola", "es", "en").with_speech(true))
        .await
        .unwrap();

    assert!(exchange.success);
    assert_eq!(exchange.translated_text.as_deref(), Some("Hello"));
    assert!(exchange.audio.is_none());
}

#[tokio::test]
async fn translation_failure_is_recorded_and_surfaced() {
    let session = session_with(Some(vec![1]));
    let err = session
        .submit(TranslationRequest::new("Buenas noches", "es", "en").with_speech(true))
        .await
        .unwrap_err();

    let TsuyakuError::TranslationFailed { exchange, source } = err else {
        panic!("expected TranslationFailed");
    };
    assert!(!exchange.success);
    assert!(exchange.translated_text.is_none());
    assert!(exchange.audio.is_none());
    assert_eq!(source.service, "phrasebook");

    let history: Vec<_> = session.list_history(HistoryOrder::Chronological).collect();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, exchange.id);
    assert_eq!(session.stats().total, 1);
}

#[tokio::test]
async fn favorite_toggles_in_pairs() {
    let session = session_with(None);
    let hola = session.submit(TranslationRequest::new("Hola", "es", "en")).await.unwrap();
    let adios = session.submit(TranslationRequest::new("Adiós", "es", "en")).await.unwrap();
    session.toggle_favorite(adios.id).unwrap();

    session.toggle_favorite(hola.id).unwrap();
    assert_eq!(session.stats().favorites, 2);

    session.toggle_favorite(hola.id).unwrap();
    let favorites: Vec<_> = session.favorites().into_iter().map(|e| e.id).collect();
    assert_eq!(favorites, vec![adios.id]);
}

#[tokio::test]
async fn clear_resets_session() {
    let session = session_with(None);
    let hola = session.submit(TranslationRequest::new("Hola", "es", "en")).await.unwrap();
    let _ = session.submit(TranslationRequest::new("???", "es", "en")).await;
    session.toggle_favorite(hola.id).unwrap();

    session.clear();

    assert_eq!(session.list_history(HistoryOrder::Chronological).count(), 0);
    assert_eq!(session.stats().total, 0);
    assert_eq!(session.stats().favorites, 0);
}

#[tokio::test]
async fn history_orders_are_snapshots() {
    let session = session_with(None);
    for text in ["Hola", "Adiós", "Gracias"] {
        session.submit(TranslationRequest::new(text, "es", "en")).await.unwrap();
    }

    let chronological = session.list_history(HistoryOrder::Chronological);
    let recent = session.list_history(HistoryOrder::MostRecentFirst);

    session.submit(TranslationRequest::new("Hola", "es", "en")).await.unwrap();
    session.clear();

    let chronological: Vec<_> = chronological.map(|e| e.source_text).collect();
    let recent: Vec<_> = recent.map(|e| e.source_text).collect();
    assert_eq!(chronological, vec!["Hola", "Adiós", "Gracias"]);
    assert_eq!(recent, vec!["Gracias", "Adiós", "Hola"]);
}

/// Fails the test if two translations ever overlap
struct SlowTranslator {
    busy: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for SlowTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, ServiceError> {
        assert!(!self.busy.swap(true, Ordering::SeqCst), "overlapping translate calls");
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_are_serialized() {
    let translator = Arc::new(SlowTranslator {
        busy: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let session = Arc::new(Session::new(
        LanguageCatalog::default(),
        translator.clone(),
        Arc::new(FixedSpeech(None)),
    ));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .submit(TranslationRequest::new(format!("line {i}"), "en", "de"))
                    .await
                    .unwrap()
                    .id
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 5);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 5);
    assert_eq!(session.stats().total, 5);
}
