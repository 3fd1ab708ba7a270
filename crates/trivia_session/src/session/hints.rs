//! Hint request and grant flow.

use tracing::{debug, info, instrument};

use super::error::CommandError;
use super::types::{RoundType, Session};

impl Session {
    /// A team asks the host for a hint.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn request_hint(&mut self, team_id: &str) -> Result<(), CommandError> {
        let round = self.current_round().ok_or(CommandError::NoCurrentQuestion)?;
        if self.team(team_id).is_none() {
            return Err(CommandError::UnknownTeam(team_id.to_string()));
        }
        if !round.is_turn_based() {
            return Err(CommandError::WrongRound {
                expected: RoundType::Standard,
                actual: round,
            });
        }
        self.requested_hint = true;
        info!(team_id, "Hint requested");
        Ok(())
    }

    /// Host shows or hides the hint. Showing it answers any pending request.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn toggle_hint(&mut self, visible: bool) -> Result<(), CommandError> {
        if self.current_question.is_none() {
            return Err(CommandError::NoCurrentQuestion);
        }
        self.hint_visible = visible;
        if visible {
            self.requested_hint = false;
        }
        debug!(visible, "Hint visibility set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{Difficulty, Question, Team};

    fn session(round: RoundType) -> Session {
        let mut s = Session::new("test".to_string(), vec![Team::new("a", "Alpha")]);
        s.inject_question(Question::new(
            "q1".to_string(),
            "Chemical symbol for gold?".to_string(),
            vec!["Ag".to_string(), "Au".to_string()],
            1,
            None,
            Some("Latin: aurum".to_string()),
            100,
            30,
            round,
            Difficulty::Medium,
        ))
        .unwrap();
        s
    }

    #[test]
    fn test_granting_hint_twice_matches_granting_once() {
        let mut s = session(RoundType::Standard);
        s.request_hint("a").unwrap();

        s.toggle_hint(true).unwrap();
        let once = s.clone();
        s.toggle_hint(true).unwrap();

        assert_eq!(s, once);
        assert!(s.hint_visible);
        assert!(!s.requested_hint);
    }

    #[test]
    fn test_hiding_hint_keeps_pending_request() {
        let mut s = session(RoundType::Standard);
        s.request_hint("a").unwrap();
        s.toggle_hint(false).unwrap();
        assert!(s.requested_hint);
        assert!(!s.hint_visible);
    }

    #[test]
    fn test_hint_request_rejected_in_buzzer_round() {
        let mut s = session(RoundType::Buzzer);
        assert!(matches!(
            s.request_hint("a"),
            Err(CommandError::WrongRound { .. })
        ));
        assert!(!s.requested_hint);
    }

    #[test]
    fn test_hint_request_from_unknown_team() {
        let mut s = session(RoundType::Standard);
        assert_eq!(
            s.request_hint("zzz").unwrap_err(),
            CommandError::UnknownTeam("zzz".to_string())
        );
    }
}
