//! Team submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::error::CommandError;
use super::types::{RoundType, Session, SessionStatus, Submission, SubmissionKind};

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitOutcome {
    /// Answer recorded and graded.
    Recorded {
        /// Whether the selected option was right.
        correct: bool,
    },
    /// Turn given up and handed on.
    Passed,
    /// The team had already submitted for this question; nothing changed.
    Duplicate,
}

impl Session {
    /// Records a team's answer or pass for the current question.
    ///
    /// A team gets one submission per question; repeats are reported as
    /// [`SubmitOutcome::Duplicate`] without touching the session.
    #[instrument(skip(self), fields(session_id = %self.id, status = %self.status))]
    pub(crate) fn submit(
        &mut self,
        team_id: &str,
        question_id: &str,
        answer: Option<usize>,
        kind: SubmissionKind,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, CommandError> {
        let question = self
            .current_question
            .as_ref()
            .ok_or(CommandError::NoCurrentQuestion)?;

        if self.team(team_id).is_none() {
            return Err(CommandError::UnknownTeam(team_id.to_string()));
        }
        if question.id() != question_id {
            return Err(CommandError::StaleQuestion {
                expected: question.id().clone(),
                got: question_id.to_string(),
            });
        }
        if self.has_submitted(team_id, question_id) {
            debug!(team_id, "Duplicate submission ignored");
            return Ok(SubmitOutcome::Duplicate);
        }
        if self.status != SessionStatus::Live {
            return Err(CommandError::SubmissionsClosed(self.status));
        }

        let round = *question.round_type();
        match (round, kind) {
            (RoundType::AskAi, _) => Err(CommandError::WrongRound {
                expected: RoundType::Standard,
                actual: round,
            }),
            (RoundType::Buzzer, SubmissionKind::Pass) => Err(CommandError::WrongRound {
                expected: RoundType::Standard,
                actual: round,
            }),
            (RoundType::Standard, _) if self.active_team_id.as_deref() != Some(team_id) => {
                Err(CommandError::NotActiveTeam(team_id.to_string()))
            }
            (RoundType::Standard, SubmissionKind::Pass) => {
                let submission =
                    Submission::graded(team_id.to_string(), question, None, kind, now);
                self.submissions.push(submission);
                self.pass_turn(now);
                info!(team_id, "Team passed");
                Ok(SubmitOutcome::Passed)
            }
            (_, SubmissionKind::Answer) => {
                let index = answer.ok_or(CommandError::MissingAnswer)?;
                if index >= question.options().len() {
                    return Err(CommandError::AnswerOutOfRange {
                        index,
                        options: question.options().len(),
                    });
                }
                let submission =
                    Submission::graded(team_id.to_string(), question, Some(index), kind, now);
                let correct = submission.correct();
                self.submissions.push(submission);

                if round.is_turn_based() {
                    info!(team_id, correct, "Active team answered, locking question");
                    self.status = SessionStatus::Locked;
                } else {
                    info!(team_id, correct, "Buzzer answer recorded");
                }
                Ok(SubmitOutcome::Recorded { correct })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::rules::SessionRules;
    use crate::session::types::{Difficulty, Question, Team};

    fn live_session(round: RoundType) -> Session {
        let mut s = Session::new(
            "test".to_string(),
            vec![Team::new("a", "Alpha"), Team::new("b", "Beta"), Team::new("c", "Gamma")],
        );
        s.inject_question(Question::new(
            "q1".to_string(),
            "Boiling point of water in C?".to_string(),
            vec!["90".to_string(), "100".to_string(), "110".to_string()],
            1,
            None,
            None,
            100,
            30,
            round,
            Difficulty::Easy,
        ))
        .unwrap();
        s.set_status(SessionStatus::Live, Utc::now(), &SessionRules::default())
            .unwrap();
        s
    }

    #[test]
    fn test_active_team_answer_locks_standard_round() {
        let mut s = live_session(RoundType::Standard);
        let outcome = s
            .submit("a", "q1", Some(1), SubmissionKind::Answer, Utc::now())
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Recorded { correct: true });
        assert_eq!(s.status, SessionStatus::Locked);
    }

    #[test]
    fn test_inactive_team_cannot_answer_standard_round() {
        let mut s = live_session(RoundType::Standard);
        let err = s
            .submit("b", "q1", Some(1), SubmissionKind::Answer, Utc::now())
            .unwrap_err();
        assert_eq!(err, CommandError::NotActiveTeam("b".to_string()));
        assert!(s.submissions.is_empty());
    }

    #[test]
    fn test_pass_hands_turn_on_and_blocks_resubmission() {
        let mut s = live_session(RoundType::Standard);
        let outcome = s
            .submit("a", "q1", None, SubmissionKind::Pass, Utc::now())
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Passed);
        assert_eq!(s.active_team_id.as_deref(), Some("b"));

        let again = s
            .submit("a", "q1", Some(1), SubmissionKind::Answer, Utc::now())
            .unwrap();
        assert_eq!(again, SubmitOutcome::Duplicate);
        assert_eq!(s.submissions.len(), 1);
    }

    #[test]
    fn test_buzzer_accepts_every_team_once() {
        let mut s = live_session(RoundType::Buzzer);
        for team in ["a", "b", "c"] {
            s.submit(team, "q1", Some(0), SubmissionKind::Answer, Utc::now())
                .unwrap();
        }
        assert_eq!(s.status, SessionStatus::Live);
        assert_eq!(s.submissions.len(), 3);

        let dup = s
            .submit("b", "q1", Some(1), SubmissionKind::Answer, Utc::now())
            .unwrap();
        assert_eq!(dup, SubmitOutcome::Duplicate);
        assert_eq!(s.submissions[1].answer(), &Some(0));
    }

    #[test]
    fn test_stale_question_rejected() {
        let mut s = live_session(RoundType::Buzzer);
        let err = s
            .submit("a", "q0", Some(1), SubmissionKind::Answer, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CommandError::StaleQuestion { .. }));
    }

    #[test]
    fn test_answer_validation() {
        let mut s = live_session(RoundType::Buzzer);
        assert_eq!(
            s.submit("a", "q1", None, SubmissionKind::Answer, Utc::now())
                .unwrap_err(),
            CommandError::MissingAnswer
        );
        assert_eq!(
            s.submit("a", "q1", Some(7), SubmissionKind::Answer, Utc::now())
                .unwrap_err(),
            CommandError::AnswerOutOfRange { index: 7, options: 3 }
        );
        assert!(matches!(
            s.submit("a", "q1", None, SubmissionKind::Pass, Utc::now()),
            Err(CommandError::WrongRound { .. })
        ));
    }

    #[test]
    fn test_submissions_closed_outside_live() {
        let mut s = live_session(RoundType::Buzzer);
        s.status = SessionStatus::Locked;
        assert_eq!(
            s.submit("a", "q1", Some(1), SubmissionKind::Answer, Utc::now())
                .unwrap_err(),
            CommandError::SubmissionsClosed(SessionStatus::Locked)
        );
    }
}
