//! Status state machine: PREVIEW → LIVE → LOCKED → REVEALED → PREVIEW.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::error::CommandError;
use super::rules::SessionRules;
use super::scoring::{ScoreChange, score_question};
use super::types::{Question, RoundType, Session, SessionStatus};

impl Session {
    /// Host-driven status change.
    ///
    /// Setting the current status again is a no-op. REVEALED goes through
    /// [`Session::reveal_and_score`] so scores are always committed.
    #[instrument(skip(self, rules), fields(session_id = %self.id, from = %self.status))]
    pub(crate) fn set_status(
        &mut self,
        to: SessionStatus,
        now: DateTime<Utc>,
        rules: &SessionRules,
    ) -> Result<Vec<ScoreChange>, CommandError> {
        let from = self.status;
        if from == to {
            debug!("Status unchanged");
            return Ok(Vec::new());
        }

        match (from, to) {
            (SessionStatus::Preview, SessionStatus::Live) => {
                self.go_live(now)?;
                Ok(Vec::new())
            }
            (SessionStatus::Live, SessionStatus::Locked) => {
                info!("Host locked the question");
                self.status = SessionStatus::Locked;
                Ok(Vec::new())
            }
            (SessionStatus::Live | SessionStatus::Locked, SessionStatus::Revealed) => {
                self.reveal_and_score(rules)
            }
            _ => {
                warn!(%from, %to, "Rejected status transition");
                Err(CommandError::InvalidTransition { from, to })
            }
        }
    }

    fn go_live(&mut self, now: DateTime<Utc>) -> Result<(), CommandError> {
        if self.current_question.is_none() {
            return Err(CommandError::NoCurrentQuestion);
        }
        self.status = SessionStatus::Live;
        self.started_at = Some(now);
        self.turn_start_time = Some(now);
        self.is_reading = true;
        info!(active_team = ?self.active_team_id, "Question is live");
        Ok(())
    }

    /// Reveals the answer and commits the round's score changes.
    #[instrument(skip(self, rules), fields(session_id = %self.id, status = %self.status))]
    pub(crate) fn reveal_and_score(
        &mut self,
        rules: &SessionRules,
    ) -> Result<Vec<ScoreChange>, CommandError> {
        let question = self
            .current_question
            .as_ref()
            .ok_or(CommandError::NoCurrentQuestion)?;

        if !matches!(self.status, SessionStatus::Live | SessionStatus::Locked) {
            return Err(CommandError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Revealed,
            });
        }

        let changes = score_question(question, &self.submissions, rules);
        self.apply_score_changes(&changes);

        self.status = SessionStatus::Revealed;
        self.is_reading = false;
        self.explanation_visible = false;
        info!(changes = changes.len(), "Question revealed and scored");
        Ok(changes)
    }

    /// Loads a new question and returns the session to PREVIEW.
    ///
    /// Refused while a question is LIVE or LOCKED, since its submissions
    /// would be dropped unscored.
    #[instrument(skip(self, question), fields(session_id = %self.id, question_id = %question.id()))]
    pub(crate) fn inject_question(&mut self, question: Question) -> Result<(), CommandError> {
        validate_question(&question)?;
        self.ensure_can_inject()?;

        let round = *question.round_type();
        self.clear_question_state();
        self.active_team_id = match round {
            RoundType::Standard | RoundType::AskAi => self.teams.first().map(|t| t.id().clone()),
            RoundType::Buzzer => None,
        };
        self.next_round_type = round.next();
        self.status = SessionStatus::Preview;
        self.current_question = Some(question);

        info!(
            %round,
            next_round = %self.next_round_type,
            active_team = ?self.active_team_id,
            "Question injected"
        );
        Ok(())
    }

    /// Fails while a question is LIVE or LOCKED.
    pub(crate) fn ensure_can_inject(&self) -> Result<(), CommandError> {
        if self.current_question.is_some()
            && matches!(self.status, SessionStatus::Live | SessionStatus::Locked)
        {
            return Err(CommandError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Preview,
            });
        }
        Ok(())
    }

    /// Host picks the round type of the next question to fetch.
    pub(crate) fn set_next_round_type(&mut self, round: RoundType) {
        debug!(%round, "Next round type set");
        self.next_round_type = round;
    }

    /// Narration finished; the turn clock starts now.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn complete_reading(&mut self, now: DateTime<Utc>) {
        if !self.is_reading {
            debug!("Reading already complete");
            return;
        }
        self.is_reading = false;
        if self.status == SessionStatus::Live {
            self.turn_start_time = Some(now);
        }
        info!("Reading complete");
    }

    /// Shows the explanation once the answer is revealed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn reveal_explanation(&mut self) -> Result<(), CommandError> {
        if self.current_question.is_none() {
            return Err(CommandError::NoCurrentQuestion);
        }
        if self.status != SessionStatus::Revealed {
            return Err(CommandError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Revealed,
            });
        }
        self.explanation_visible = true;
        Ok(())
    }
}

/// Largest point value a question may carry.
pub const MAX_QUESTION_POINTS: i64 = 1_000_000;

/// Checks an incoming question is playable.
pub fn validate_question(question: &Question) -> Result<(), CommandError> {
    if question.id().trim().is_empty() {
        return Err(CommandError::InvalidQuestion("id is blank".to_string()));
    }
    if question.text().trim().is_empty() {
        return Err(CommandError::InvalidQuestion("text is blank".to_string()));
    }
    if !(0..=MAX_QUESTION_POINTS).contains(question.points()) {
        return Err(CommandError::InvalidQuestion(format!(
            "points {} outside 0..={}",
            question.points(),
            MAX_QUESTION_POINTS
        )));
    }
    // Ask-AI questions are open-ended prompts, everything else needs options
    if *question.round_type() != RoundType::AskAi {
        if *question.points() == 0 {
            return Err(CommandError::InvalidQuestion("points must be positive".to_string()));
        }
        if *question.time_limit_secs() == 0 {
            return Err(CommandError::InvalidQuestion(
                "time limit must be positive".to_string(),
            ));
        }
        if question.options().is_empty() {
            return Err(CommandError::InvalidQuestion("no options".to_string()));
        }
        if *question.correct_index() >= question.options().len() {
            return Err(CommandError::InvalidQuestion(format!(
                "correct index {} out of range for {} options",
                question.correct_index(),
                question.options().len()
            )));
        }
    }
    Ok(())
}
