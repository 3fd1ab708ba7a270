//! Question sources the host can pull the next question from.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::session::{Difficulty, Question, RoundType, validate_question};

/// Question source failure.
#[derive(Debug, Clone, Display, Error)]
#[display("Question source error: {} at {}:{}", message, file, line)]
pub struct QuestionSourceError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl QuestionSourceError {
    /// Creates a new question source error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Produces questions on demand.
#[async_trait]
pub trait QuestionSource: Send + Sync + std::fmt::Debug {
    /// Returns a question for the given round type and difficulty.
    async fn fetch(
        &self,
        round_type: RoundType,
        difficulty: Difficulty,
    ) -> Result<Question, QuestionSourceError>;

    /// Takes back a fetched question that never reached the session.
    async fn release(&self, _question: &Question) {}
}

/// Request body sent to a remote question generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    /// Requested round type.
    pub round_type: RoundType,
    /// Requested difficulty.
    pub difficulty: Difficulty,
}

/// Asks a remote generator over HTTP.
///
/// POSTs a [`QuestionRequest`] as JSON and expects a [`Question`] back.
#[derive(Debug, Clone)]
pub struct HttpQuestionSource {
    url: String,
    client: reqwest::Client,
}

impl HttpQuestionSource {
    /// Creates a source that posts to `url`.
    #[instrument(skip(url), fields(url = %url))]
    pub fn new(url: String) -> Self {
        info!("Creating HTTP question source");
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(
        &self,
        round_type: RoundType,
        difficulty: Difficulty,
    ) -> Result<Question, QuestionSourceError> {
        debug!("Requesting question");
        let response = self
            .client
            .post(&self.url)
            .json(&QuestionRequest {
                round_type,
                difficulty,
            })
            .send()
            .await
            .map_err(|e| QuestionSourceError::new(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Question generator returned an error");
            return Err(QuestionSourceError::new(format!(
                "Question generator returned {}",
                status
            )));
        }

        let question: Question = response
            .json()
            .await
            .map_err(|e| QuestionSourceError::new(format!("Malformed question: {}", e)))?;

        if *question.round_type() != round_type {
            return Err(QuestionSourceError::new(format!(
                "Asked for a {} question, got {}",
                round_type,
                question.round_type()
            )));
        }
        validate_question(&question).map_err(|e| QuestionSourceError::new(e.to_string()))?;

        info!(question_id = %question.id(), "Question received");
        Ok(question)
    }
}

/// On-disk deck layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    /// Questions in play order.
    pub questions: Vec<Question>,
}

/// Serves questions from a prepared deck, each at most once.
#[derive(Debug)]
pub struct DeckQuestionSource {
    questions: Vec<Question>,
    served: Mutex<HashSet<String>>,
}

impl DeckQuestionSource {
    /// Creates a source from a list of questions.
    ///
    /// # Errors
    ///
    /// Returns [`QuestionSourceError`] if any question is unplayable.
    #[instrument(skip(questions), fields(count = questions.len()))]
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionSourceError> {
        for question in &questions {
            validate_question(question).map_err(|e| {
                QuestionSourceError::new(format!("Question '{}': {}", question.id(), e))
            })?;
        }
        info!("Question deck ready");
        Ok(Self {
            questions,
            served: Mutex::new(HashSet::new()),
        })
    }

    /// Loads a deck from a TOML file with a `[[questions]]` array.
    ///
    /// # Errors
    ///
    /// Returns [`QuestionSourceError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QuestionSourceError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| QuestionSourceError::new(format!("Failed to read deck: {}", e)))?;
        let deck: Deck = toml::from_str(&content)
            .map_err(|e| QuestionSourceError::new(format!("Failed to parse deck: {}", e)))?;
        Self::new(deck.questions)
    }

    /// Questions not yet served.
    pub fn remaining(&self) -> usize {
        let served = self.served.lock().unwrap_or_else(|e| e.into_inner());
        self.questions
            .iter()
            .filter(|q| !served.contains(q.id()))
            .count()
    }
}

#[async_trait]
impl QuestionSource for DeckQuestionSource {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        round_type: RoundType,
        difficulty: Difficulty,
    ) -> Result<Question, QuestionSourceError> {
        let mut served = self.served.lock().unwrap_or_else(|e| e.into_inner());
        let question = self
            .questions
            .iter()
            .find(|q| {
                *q.round_type() == round_type
                    && *q.difficulty() == difficulty
                    && !served.contains(q.id())
            })
            .cloned()
            .ok_or_else(|| {
                QuestionSourceError::new(format!(
                    "Deck has no unused {} question at {} difficulty",
                    round_type, difficulty
                ))
            })?;
        served.insert(question.id().clone());
        debug!(question_id = %question.id(), "Dealt question from deck");
        Ok(question)
    }

    #[instrument(skip(self, question), fields(question_id = %question.id()))]
    async fn release(&self, question: &Question) {
        let mut served = self.served.lock().unwrap_or_else(|e| e.into_inner());
        if served.remove(question.id()) {
            debug!("Returned question to deck");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, round: RoundType, difficulty: Difficulty) -> Question {
        Question::new(
            id.to_string(),
            format!("Question {id}"),
            vec!["yes".to_string(), "no".to_string()],
            0,
            None,
            None,
            100,
            30,
            round,
            difficulty,
        )
    }

    #[tokio::test]
    async fn test_deck_serves_matching_questions_once() {
        let deck = DeckQuestionSource::new(vec![
            question("s1", RoundType::Standard, Difficulty::Easy),
            question("b1", RoundType::Buzzer, Difficulty::Easy),
            question("s2", RoundType::Standard, Difficulty::Easy),
        ])
        .unwrap();

        let first = deck.fetch(RoundType::Standard, Difficulty::Easy).await.unwrap();
        let second = deck.fetch(RoundType::Standard, Difficulty::Easy).await.unwrap();
        assert_eq!(first.id(), "s1");
        assert_eq!(second.id(), "s2");
        assert!(deck.fetch(RoundType::Standard, Difficulty::Easy).await.is_err());
        assert_eq!(deck.remaining(), 1);
    }

    #[tokio::test]
    async fn test_deck_respects_difficulty() {
        let deck =
            DeckQuestionSource::new(vec![question("b1", RoundType::Buzzer, Difficulty::Hard)])
                .unwrap();
        assert!(deck.fetch(RoundType::Buzzer, Difficulty::Easy).await.is_err());
        assert!(deck.fetch(RoundType::Buzzer, Difficulty::Hard).await.is_ok());
    }

    #[test]
    fn test_deck_rejects_unplayable_question() {
        let bad = Question::new(
            "x".to_string(),
            "No options at all".to_string(),
            Vec::new(),
            0,
            None,
            None,
            100,
            30,
            RoundType::Standard,
            Difficulty::Easy,
        );
        assert!(DeckQuestionSource::new(vec![bad]).is_err());
    }

    #[tokio::test]
    async fn test_released_question_is_dealt_again() {
        let deck =
            DeckQuestionSource::new(vec![question("s1", RoundType::Standard, Difficulty::Easy)])
                .unwrap();

        let dealt = deck.fetch(RoundType::Standard, Difficulty::Easy).await.unwrap();
        assert_eq!(deck.remaining(), 0);

        deck.release(&dealt).await;
        assert_eq!(deck.remaining(), 1);
        let again = deck.fetch(RoundType::Standard, Difficulty::Easy).await.unwrap();
        assert_eq!(again.id(), "s1");
    }
}
