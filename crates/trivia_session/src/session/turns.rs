//! Round-robin turn scheduling for turn-based rounds.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use super::types::{Session, SessionStatus};

impl Session {
    /// Gives up the active team's turn and hands it to the next unpassed team.
    ///
    /// Scans circularly from the slot after the active team (slot 0 when no
    /// team is active). Locks the question when every team has passed.
    #[instrument(skip(self), fields(session_id = %self.id, active = ?self.active_team_id))]
    pub(crate) fn pass_turn(&mut self, now: DateTime<Utc>) {
        if let Some(active) = self.active_team_id.clone() {
            self.passed_team_ids.insert(active);
        }

        let count = self.teams.len();
        let start = self
            .active_team_id
            .as_deref()
            .and_then(|id| self.teams.iter().position(|t| t.id() == id))
            .map_or(0, |i| i + 1);

        let next = (0..count)
            .map(|offset| &self.teams[(start + offset) % count])
            .find(|team| !self.passed_team_ids.contains(team.id()))
            .map(|team| team.id().clone());

        match next {
            Some(team_id) => {
                info!(team_id = %team_id, "Turn passed to next team");
                self.active_team_id = Some(team_id);
                self.turn_start_time = Some(now);
            }
            None => {
                info!("Every team has passed, locking question");
                self.active_team_id = None;
                self.status = SessionStatus::Locked;
            }
        }
    }

    /// When the active turn runs out, if it is currently running at all.
    pub fn turn_deadline(&self, window: Duration) -> Option<DateTime<Utc>> {
        let turn_based = self.current_round().is_some_and(|r| r.is_turn_based());
        if self.status != SessionStatus::Live || !turn_based || self.is_reading {
            return None;
        }
        self.active_team_id.as_ref()?;
        self.turn_start_time.map(|start| start + window)
    }

    /// Advances the turn if its window has elapsed. Returns whether it did.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn expire_turn_if_due(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.turn_deadline(window) {
            Some(deadline) if now >= deadline => {
                debug!(%deadline, %now, "Turn window elapsed");
                self.pass_turn(now);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{Difficulty, Question, RoundType, Team};

    fn session_with(teams: &[&str]) -> Session {
        let teams = teams.iter().map(|id| Team::new(*id, id.to_uppercase())).collect();
        let mut session = Session::new("test".to_string(), teams);
        session.current_question = Some(Question::new(
            "q1".to_string(),
            "Capital of France?".to_string(),
            vec!["Paris".to_string(), "Lyon".to_string()],
            0,
            None,
            None,
            100,
            30,
            RoundType::Standard,
            Difficulty::Easy,
        ));
        session.status = SessionStatus::Live;
        session
    }

    #[test]
    fn test_pass_visits_teams_in_order_then_locks() {
        let now = Utc::now();
        let mut session = session_with(&["a", "b", "c"]);
        session.active_team_id = Some("a".to_string());

        session.pass_turn(now);
        assert_eq!(session.active_team_id.as_deref(), Some("b"));
        session.pass_turn(now);
        assert_eq!(session.active_team_id.as_deref(), Some("c"));
        assert_eq!(session.status, SessionStatus::Live);
        session.pass_turn(now);
        assert_eq!(session.active_team_id, None);
        assert_eq!(session.status, SessionStatus::Locked);
        assert_eq!(session.passed_team_ids.len(), 3);
    }

    #[test]
    fn test_pass_wraps_around_skipping_passed_teams() {
        let now = Utc::now();
        let mut session = session_with(&["a", "b", "c", "d"]);
        session.passed_team_ids.insert("a".to_string());
        session.active_team_id = Some("c".to_string());

        session.pass_turn(now);
        assert_eq!(session.active_team_id.as_deref(), Some("d"));
        session.pass_turn(now);
        // wraps past "a" which already passed
        assert_eq!(session.active_team_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_pass_resets_turn_clock() {
        let start = Utc::now();
        let later = start + Duration::seconds(12);
        let mut session = session_with(&["a", "b"]);
        session.active_team_id = Some("a".to_string());
        session.turn_start_time = Some(start);

        session.pass_turn(later);
        assert_eq!(session.turn_start_time, Some(later));
    }

    #[test]
    fn test_pass_with_no_active_team_starts_at_first() {
        let mut session = session_with(&["a", "b"]);
        session.pass_turn(Utc::now());
        assert_eq!(session.active_team_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_expiry_waits_for_reading_to_finish() {
        let start = Utc::now();
        let window = Duration::seconds(30);
        let mut session = session_with(&["a", "b"]);
        session.active_team_id = Some("a".to_string());
        session.turn_start_time = Some(start);
        session.is_reading = true;

        assert!(!session.expire_turn_if_due(start + Duration::seconds(60), window));

        session.is_reading = false;
        assert!(!session.expire_turn_if_due(start + Duration::seconds(29), window));
        assert!(session.expire_turn_if_due(start + Duration::seconds(30), window));
        assert_eq!(session.active_team_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_no_deadline_outside_turn_based_live_rounds() {
        let window = Duration::seconds(30);
        let mut session = session_with(&["a"]);
        session.active_team_id = Some("a".to_string());
        session.turn_start_time = Some(Utc::now());
        assert!(session.turn_deadline(window).is_some());

        session.status = SessionStatus::Locked;
        assert!(session.turn_deadline(window).is_none());
    }
}
