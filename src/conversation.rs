//! Two-party conversation on top of a `Session`: each party speaks its own
//! language and every utterance is translated for the other party.

use std::sync::Arc;
use tracing::info;

use crate::error::{Result, TsuyakuError};
use crate::session::{Exchange, ExchangeId, Session, TranslationRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub name: String,
    pub language: String,
}

impl Party {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    A,
    B,
}

impl Speaker {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// One utterance in the conversation, tagged with who was speaking at the time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Party,
    pub exchange_id: ExchangeId,
}

pub struct Conversation {
    session: Arc<Session>,
    party_a: Party,
    party_b: Party,
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(session: Arc<Session>, party_a: Party, party_b: Party) -> Result<Self> {
        for party in [&party_a, &party_b] {
            if !session.catalog().contains(&party.language) {
                return Err(TsuyakuError::InvalidRequest(format!(
                    "unknown language code '{}' for {}",
                    party.language, party.name
                )));
            }
        }
        if party_a.language.eq_ignore_ascii_case(&party_b.language) {
            return Err(TsuyakuError::InvalidRequest(
                "both parties speak the same language".to_string(),
            ));
        }

        Ok(Self {
            session,
            party_a,
            party_b,
            turns: Vec::new(),
        })
    }

    pub fn party(&self, speaker: Speaker) -> &Party {
        match speaker {
            Speaker::A => &self.party_a,
            Speaker::B => &self.party_b,
        }
    }

    /// Translate what `speaker` said into the listener's language.
    ///
    /// Failed translations are still part of the transcript.
    pub async fn say(&mut self, speaker: Speaker, text: &str, want_speech: bool) -> Result<Exchange> {
        let party = self.party(speaker).clone();
        let to = self.party(speaker.other()).language.clone();
        info!("{} says ({} -> {})", party.name, party.language, to);

        let request = TranslationRequest::new(text, party.language.clone(), to).with_speech(want_speech);
        match self.session.submit(request).await {
            Ok(exchange) => {
                self.turns.push(Turn { speaker: party, exchange_id: exchange.id });
                Ok(exchange)
            }
            Err(TsuyakuError::TranslationFailed { exchange, source }) => {
                self.turns.push(Turn { speaker: party, exchange_id: exchange.id });
                Err(TsuyakuError::TranslationFailed { exchange, source })
            }
            Err(e) => Err(e),
        }
    }

    /// Swap the two parties; earlier turns keep the party that actually spoke
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.party_a, &mut self.party_b);
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.turns
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::language::LanguageCatalog;
    use crate::speech::MockSpeechSynthesizer;
    use crate::translate::MockTranslator;

    fn echo_session() -> Arc<Session> {
        let mut translator = MockTranslator::new();
        translator.expect_translate().returning(|text, source, target| {
            if text == "fail" {
                Err(ServiceError::new("stub", "boom"))
            } else {
                Ok(format!("{}>{}:{}", source, target, text))
            }
        });
        Arc::new(Session::new(
            LanguageCatalog::default(),
            Arc::new(translator),
            Arc::new(MockSpeechSynthesizer::new()),
        ))
    }

    #[tokio::test]
    async fn test_turns_translate_toward_listener() {
        let mut conversation = Conversation::new(
            echo_session(),
            Party::new("Ana", "es"),
            Party::new("Ken", "ja"),
        )
        .unwrap();

        let first = conversation.say(Speaker::A, "Hola", false).await.unwrap();
        let second = conversation.say(Speaker::B, "Konnichiwa", false).await.unwrap();

        assert_eq!(first.translated_text.as_deref(), Some("es>ja:Hola"));
        assert_eq!(second.translated_text.as_deref(), Some("ja>es:Konnichiwa"));
        assert_eq!(
            conversation.transcript(),
            &[
                Turn { speaker: Party::new("Ana", "es"), exchange_id: first.id },
                Turn { speaker: Party::new("Ken", "ja"), exchange_id: second.id },
            ]
        );
        assert_eq!(conversation.session().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_turn_is_kept() {
        let mut conversation = Conversation::new(
            echo_session(),
            Party::new("Ana", "es"),
            Party::new("Bob", "en"),
        )
        .unwrap();

        let err = conversation.say(Speaker::A, "fail", false).await.unwrap_err();
        assert!(matches!(err, TsuyakuError::TranslationFailed { .. }));
        assert_eq!(conversation.transcript().len(), 1);

        let err = conversation.say(Speaker::B, "  ", false).await.unwrap_err();
        assert!(matches!(err, TsuyakuError::InvalidRequest(_)));
        assert_eq!(conversation.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_swap_reverses_direction() {
        let mut conversation = Conversation::new(
            echo_session(),
            Party::new("Ana", "es"),
            Party::new("Bob", "en"),
        )
        .unwrap();
        conversation.swap();

        let exchange = conversation.say(Speaker::A, "Hi", false).await.unwrap();
        assert_eq!(exchange.source_lang, "en");
        assert_eq!(exchange.target_lang, "es");
    }

    #[tokio::test]
    async fn test_transcript_survives_swap() {
        let mut conversation = Conversation::new(
            echo_session(),
            Party::new("Ana", "es"),
            Party::new("Bob", "en"),
        )
        .unwrap();

        let before = conversation.say(Speaker::A, "Hola", false).await.unwrap();
        conversation.swap();
        let after = conversation.say(Speaker::A, "Hello", false).await.unwrap();

        let transcript = conversation.transcript();
        assert_eq!(transcript[0].speaker, Party::new("Ana", "es"));
        assert_eq!(transcript[0].speaker.language, before.source_lang);
        assert_eq!(transcript[1].speaker, Party::new("Bob", "en"));
        assert_eq!(transcript[1].speaker.language, after.source_lang);
        assert_eq!(conversation.party(Speaker::A).name, "Bob");
    }

    #[test]
    fn test_rejects_bad_parties() {
        let session = echo_session();
        assert!(Conversation::new(session.clone(), Party::new("A", "en"), Party::new("B", "EN")).is_err());
        assert!(Conversation::new(session, Party::new("A", "en"), Party::new("B", "xx")).is_err());
    }
}
