//! Per-round scoring rules applied when a question is revealed.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, instrument, warn};

use super::rules::SessionRules;
use super::types::{Question, RoundType, Session, Submission, SubmissionKind, TeamId};

/// Why a team's score moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreReason {
    /// First correct buzzer answer.
    BuzzerWin,
    /// Wrong buzzer answer.
    BuzzerPenalty,
    /// Correct answer in a turn-based round.
    CorrectAnswer,
    /// The team stumped the AI.
    AskAiBonus,
}

/// A single change to a team's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreChange {
    /// Team whose score changes.
    pub team_id: TeamId,
    /// Signed points.
    pub delta: i64,
    /// Rule that produced the change.
    pub reason: ScoreReason,
}

/// Computes the score changes a reveal produces for `question`.
///
/// Only submissions for `question` are considered. ASK_AI questions are
/// scored by the verdict instead and produce nothing here.
#[instrument(skip_all, fields(question_id = %question.id(), round = %question.round_type()))]
pub fn score_question(
    question: &Question,
    submissions: &[Submission],
    rules: &SessionRules,
) -> Vec<ScoreChange> {
    let mut relevant: Vec<&Submission> = submissions
        .iter()
        .filter(|s| s.question_id() == question.id())
        .collect();

    match question.round_type() {
        RoundType::Buzzer => {
            relevant.sort_by_key(|s| *s.submitted_at());
            let mut winner_found = false;
            let mut changes = Vec::new();
            for submission in relevant {
                if submission.correct() && !winner_found {
                    winner_found = true;
                    changes.push(ScoreChange {
                        team_id: submission.team_id().clone(),
                        delta: *question.points(),
                        reason: ScoreReason::BuzzerWin,
                    });
                } else if submission.incorrect() {
                    changes.push(ScoreChange {
                        team_id: submission.team_id().clone(),
                        delta: rules.buzzer_penalty().saturating_neg(),
                        reason: ScoreReason::BuzzerPenalty,
                    });
                }
            }
            changes
        }
        RoundType::Standard => relevant
            .into_iter()
            .filter(|s| *s.kind() != SubmissionKind::Pass && s.correct())
            .map(|s| ScoreChange {
                team_id: s.team_id().clone(),
                delta: *question.points(),
                reason: ScoreReason::CorrectAnswer,
            })
            .collect(),
        RoundType::AskAi => Vec::new(),
    }
}

impl Session {
    /// Applies score changes to the matching teams.
    pub(crate) fn apply_score_changes(&mut self, changes: &[ScoreChange]) {
        for change in changes {
            match self.team_mut(&change.team_id) {
                Some(team) => {
                    team.score = team.score.saturating_add(change.delta);
                    debug!(
                        team_id = %change.team_id,
                        delta = change.delta,
                        reason = %change.reason,
                        score = team.score,
                        "Score updated"
                    );
                }
                None => warn!(team_id = %change.team_id, "Score change for unknown team ignored"),
            }
        }
    }
}
