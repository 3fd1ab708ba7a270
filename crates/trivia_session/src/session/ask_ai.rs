//! The "challenge the AI" sub-machine.
//!
//! IDLE → LISTENING → PROCESSING → ANSWERING → COMPLETED. Every step is
//! driven explicitly by a caller; nothing advances on its own.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::error::CommandError;
use super::rules::SessionRules;
use super::scoring::{ScoreChange, ScoreReason};
use super::types::{AskAiState, AskAiVerdict, RoundType, Session};

/// A requested Ask-AI step, carrying the payload that step needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AskAiTransition {
    /// Abandon the flow.
    Idle,
    /// Start (or restart) capturing the team's question.
    Listening,
    /// The team's question has been captured.
    Processing {
        /// The team's question for the AI.
        question: String,
    },
    /// The AI has responded.
    Answering {
        /// The AI's response.
        response: String,
    },
}

impl AskAiTransition {
    /// Sub-state this transition moves to.
    pub fn target(&self) -> AskAiState {
        match self {
            AskAiTransition::Idle => AskAiState::Idle,
            AskAiTransition::Listening => AskAiState::Listening,
            AskAiTransition::Processing { .. } => AskAiState::Processing,
            AskAiTransition::Answering { .. } => AskAiState::Answering,
        }
    }

    fn allowed_from(&self, from: AskAiState) -> bool {
        match self {
            AskAiTransition::Idle | AskAiTransition::Listening => from != AskAiState::Completed,
            AskAiTransition::Processing { .. } => from == AskAiState::Listening,
            AskAiTransition::Answering { .. } => from == AskAiState::Processing,
        }
    }
}

fn non_blank(field: &'static str, text: &str) -> Result<String, CommandError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CommandError::BlankPayload(field));
    }
    Ok(trimmed.to_string())
}

impl Session {
    fn require_ask_ai_round(&self) -> Result<(), CommandError> {
        let round = self.current_round().ok_or(CommandError::NoCurrentQuestion)?;
        if round != RoundType::AskAi {
            return Err(CommandError::WrongRound {
                expected: RoundType::AskAi,
                actual: round,
            });
        }
        Ok(())
    }

    /// Moves the Ask-AI flow one step.
    #[instrument(skip(self), fields(session_id = %self.id, from = %self.ask_ai_state))]
    pub(crate) fn set_ask_ai_state(
        &mut self,
        transition: AskAiTransition,
    ) -> Result<(), CommandError> {
        self.require_ask_ai_round()?;

        let from = self.ask_ai_state;
        if !transition.allowed_from(from) {
            warn!(%from, to = %transition.target(), "Rejected Ask-AI transition");
            return Err(CommandError::InvalidAskAiTransition {
                from,
                to: transition.target(),
            });
        }

        match transition {
            AskAiTransition::Idle => self.clear_ask_ai(),
            AskAiTransition::Listening => {
                self.ask_ai_state = AskAiState::Listening;
                self.current_ask_ai_question = None;
                self.current_ask_ai_response = None;
                self.ask_ai_verdict = None;
            }
            AskAiTransition::Processing { question } => {
                self.current_ask_ai_question = Some(non_blank("question", &question)?);
                self.ask_ai_state = AskAiState::Processing;
            }
            AskAiTransition::Answering { response } => {
                self.current_ask_ai_response = Some(non_blank("response", &response)?);
                self.ask_ai_state = AskAiState::Answering;
            }
        }
        info!(to = %self.ask_ai_state, "Ask-AI state changed");
        Ok(())
    }

    /// Host rules on the AI's answer and closes the flow.
    ///
    /// Only valid while ANSWERING, so a verdict is awarded at most once.
    #[instrument(skip(self, rules), fields(session_id = %self.id, state = %self.ask_ai_state))]
    pub(crate) fn judge_ask_ai(
        &mut self,
        verdict: AskAiVerdict,
        rules: &SessionRules,
    ) -> Result<Vec<ScoreChange>, CommandError> {
        self.require_ask_ai_round()?;

        if self.ask_ai_state != AskAiState::Answering {
            return Err(CommandError::InvalidAskAiTransition {
                from: self.ask_ai_state,
                to: AskAiState::Completed,
            });
        }

        self.ask_ai_state = AskAiState::Completed;
        self.ask_ai_verdict = Some(verdict);

        let changes = match (verdict, self.active_team_id.clone()) {
            (AskAiVerdict::AiWrong, Some(team_id)) => vec![ScoreChange {
                team_id,
                delta: *rules.ask_ai_bonus(),
                reason: ScoreReason::AskAiBonus,
            }],
            (AskAiVerdict::AiWrong, None) => {
                warn!("AI stumped but no team is active, no bonus awarded");
                Vec::new()
            }
            (AskAiVerdict::AiCorrect, _) => Vec::new(),
        };
        self.apply_score_changes(&changes);

        info!(%verdict, "Ask-AI judged");
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{Difficulty, Question, Team};

    fn ask_ai_session() -> Session {
        let mut s = Session::new(
            "test".to_string(),
            vec![Team::new("a", "Alpha"), Team::new("b", "Beta")],
        );
        s.inject_question(Question::new(
            "q-ai".to_string(),
            "Stump the AI".to_string(),
            Vec::new(),
            0,
            None,
            None,
            0,
            60,
            RoundType::AskAi,
            Difficulty::Hard,
        ))
        .unwrap();
        s
    }

    fn drive_to_answering(s: &mut Session) {
        s.set_ask_ai_state(AskAiTransition::Listening).unwrap();
        s.set_ask_ai_state(AskAiTransition::Processing {
            question: "What did I eat for breakfast?".to_string(),
        })
        .unwrap();
        s.set_ask_ai_state(AskAiTransition::Answering {
            response: "Toast.".to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_full_flow_stores_payloads() {
        let mut s = ask_ai_session();
        drive_to_answering(&mut s);
        assert_eq!(s.ask_ai_state, AskAiState::Answering);
        assert_eq!(
            s.current_ask_ai_question.as_deref(),
            Some("What did I eat for breakfast?")
        );
        assert_eq!(s.current_ask_ai_response.as_deref(), Some("Toast."));
    }

    #[test]
    fn test_ai_wrong_awards_active_team_once() {
        let rules = SessionRules::default();
        let mut s = ask_ai_session();
        drive_to_answering(&mut s);

        s.judge_ask_ai(AskAiVerdict::AiWrong, &rules).unwrap();
        assert_eq!(*s.team("a").unwrap().score(), 200);
        assert_eq!(*s.team("b").unwrap().score(), 0);
        assert_eq!(s.ask_ai_state, AskAiState::Completed);

        assert!(s.judge_ask_ai(AskAiVerdict::AiWrong, &rules).is_err());
        assert_eq!(*s.team("a").unwrap().score(), 200);
    }

    #[test]
    fn test_ai_correct_changes_no_score() {
        let rules = SessionRules::default();
        let mut s = ask_ai_session();
        drive_to_answering(&mut s);
        let changes = s.judge_ask_ai(AskAiVerdict::AiCorrect, &rules).unwrap();
        assert!(changes.is_empty());
        assert!(s.teams.iter().all(|t| t.score == 0));
        assert_eq!(s.ask_ai_verdict, Some(AskAiVerdict::AiCorrect));
    }

    #[test]
    fn test_listening_clears_previous_exchange() {
        let mut s = ask_ai_session();
        drive_to_answering(&mut s);
        s.set_ask_ai_state(AskAiTransition::Listening).unwrap();
        assert_eq!(s.current_ask_ai_question, None);
        assert_eq!(s.current_ask_ai_response, None);
    }

    #[test]
    fn test_blank_payload_rejected_without_change() {
        let mut s = ask_ai_session();
        s.set_ask_ai_state(AskAiTransition::Listening).unwrap();
        let err = s
            .set_ask_ai_state(AskAiTransition::Processing {
                question: "   ".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, CommandError::BlankPayload("question"));
        assert_eq!(s.ask_ai_state, AskAiState::Listening);
    }

    #[test]
    fn test_skipping_steps_rejected() {
        let mut s = ask_ai_session();
        let err = s
            .set_ask_ai_state(AskAiTransition::Answering {
                response: "42".to_string(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidAskAiTransition {
                from: AskAiState::Idle,
                to: AskAiState::Answering,
            }
        );
    }

    #[test]
    fn test_ask_ai_requires_ask_ai_round() {
        let mut s = ask_ai_session();
        s.current_question = None;
        assert_eq!(
            s.set_ask_ai_state(AskAiTransition::Listening).unwrap_err(),
            CommandError::NoCurrentQuestion
        );
    }

    #[test]
    fn test_transition_payload_wire_format() {
        let t: AskAiTransition =
            serde_json::from_str(r#"{"state":"PROCESSING","question":"Why?"}"#).unwrap();
        assert_eq!(
            t,
            AskAiTransition::Processing {
                question: "Why?".to_string()
            }
        );
        assert!(serde_json::from_str::<AskAiTransition>(r#"{"state":"PROCESSING"}"#).is_err());
    }
}
