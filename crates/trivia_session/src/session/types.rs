//! Core domain types for a trivia session.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info, instrument};

/// Unique identifier for a team.
pub type TeamId = String;

/// Unique identifier for a question.
pub type QuestionId = String;

/// Host-facing status of the current question.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SessionStatus {
    /// Question injected, not yet open to teams.
    #[default]
    Preview,
    /// Question open for submissions.
    Live,
    /// No more submissions accepted.
    Locked,
    /// Answer shown and scores committed.
    Revealed,
}

/// Scoring and interaction mode of a question.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RoundType {
    /// Turn-based: one active team at a time, others wait or pass.
    #[default]
    Standard,
    /// Every team may answer; earliest correct answer wins.
    Buzzer,
    /// The active team challenges the AI with its own question.
    AskAi,
}

impl RoundType {
    /// Returns the round type that follows this one.
    pub fn next(self) -> Self {
        match self {
            RoundType::Standard => RoundType::Buzzer,
            RoundType::Buzzer => RoundType::AskAi,
            RoundType::AskAi => RoundType::Standard,
        }
    }

    /// Whether teams take turns in this round.
    pub fn is_turn_based(self) -> bool {
        matches!(self, RoundType::Standard)
    }
}

/// Question difficulty requested from a question source.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Difficulty {
    /// Easy.
    Easy,
    /// Medium.
    #[default]
    Medium,
    /// Hard.
    Hard,
}

/// Kind of a team submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SubmissionKind {
    /// An answer selecting one of the options.
    Answer,
    /// Giving up the turn without answering.
    Pass,
}

/// State of the "challenge the AI" flow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AskAiState {
    /// Nothing happening.
    #[default]
    Idle,
    /// Capturing the team's question.
    Listening,
    /// Question captured, AI is thinking.
    Processing,
    /// AI response available for the host to judge.
    Answering,
    /// Host has judged the response.
    Completed,
}

/// Host judgement of the AI's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AskAiVerdict {
    /// The AI answered correctly.
    AiCorrect,
    /// The AI got it wrong; the team earns the bonus.
    AiWrong,
}

/// A question, owned by value once injected into the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    points: i64,
    time_limit_secs: u32,
    round_type: RoundType,
    #[serde(default)]
    difficulty: Difficulty,
}

impl Question {
    /// Whether `answer` is the correct option.
    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct_index
    }
}

/// A competing team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    id: TeamId,
    name: String,
    pub(crate) score: i64,
}

impl Team {
    /// Creates a team with a zero score.
    pub fn new(id: impl Into<TeamId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score: 0,
        }
    }
}

/// A team's response to the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    team_id: TeamId,
    question_id: QuestionId,
    answer: Option<usize>,
    kind: SubmissionKind,
    submitted_at: DateTime<Utc>,
    is_correct: Option<bool>,
}

impl Submission {
    /// Builds a submission, grading it against `question` once.
    pub(crate) fn graded(
        team_id: TeamId,
        question: &Question,
        answer: Option<usize>,
        kind: SubmissionKind,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let is_correct = match kind {
            SubmissionKind::Answer => answer.map(|a| question.is_correct(a)),
            SubmissionKind::Pass => None,
        };
        Self {
            team_id,
            question_id: question.id().clone(),
            answer,
            kind,
            submitted_at,
            is_correct,
        }
    }

    /// Whether this submission was graded correct.
    pub fn correct(&self) -> bool {
        self.is_correct == Some(true)
    }

    /// Whether this submission was graded incorrect.
    pub fn incorrect(&self) -> bool {
        self.is_correct == Some(false)
    }
}

/// The single shared session aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub(crate) id: String,
    pub(crate) current_question: Option<Question>,
    pub(crate) status: SessionStatus,
    pub(crate) teams: Vec<Team>,
    pub(crate) submissions: Vec<Submission>,
    pub(crate) passed_team_ids: BTreeSet<TeamId>,
    pub(crate) requested_hint: bool,
    pub(crate) hint_visible: bool,
    pub(crate) explanation_visible: bool,
    pub(crate) next_round_type: RoundType,
    pub(crate) active_team_id: Option<TeamId>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) turn_start_time: Option<DateTime<Utc>>,
    pub(crate) is_reading: bool,
    pub(crate) ask_ai_state: AskAiState,
    pub(crate) current_ask_ai_question: Option<String>,
    pub(crate) current_ask_ai_response: Option<String>,
    pub(crate) ask_ai_verdict: Option<AskAiVerdict>,
}

impl Session {
    /// Creates a session in PREVIEW with the given teams.
    #[instrument(skip(teams), fields(team_count = teams.len()))]
    pub fn new(id: String, teams: Vec<Team>) -> Self {
        info!(session_id = %id, "Creating new trivia session");
        Self {
            id,
            current_question: None,
            status: SessionStatus::Preview,
            teams,
            submissions: Vec::new(),
            passed_team_ids: BTreeSet::new(),
            requested_hint: false,
            hint_visible: false,
            explanation_visible: false,
            next_round_type: RoundType::default(),
            active_team_id: None,
            started_at: None,
            turn_start_time: None,
            is_reading: false,
            ask_ai_state: AskAiState::Idle,
            current_ask_ai_question: None,
            current_ask_ai_response: None,
            ask_ai_verdict: None,
        }
    }

    /// Returns the team with the given id.
    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    pub(crate) fn team_mut(&mut self, team_id: &str) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == team_id)
    }

    /// Round type of the current question, if any.
    pub fn current_round(&self) -> Option<RoundType> {
        self.current_question.as_ref().map(|q| *q.round_type())
    }

    /// Whether `team_id` already has a submission for `question_id`.
    pub fn has_submitted(&self, team_id: &str, question_id: &str) -> bool {
        self.submissions
            .iter()
            .any(|s| s.team_id == team_id && s.question_id == question_id)
    }

    /// Resets to defaults, keeping team identities with zeroed scores.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn reset(&mut self) {
        let teams = self
            .teams
            .iter()
            .map(|t| Team::new(t.id.clone(), t.name.clone()))
            .collect();
        *self = Session::new(self.id.clone(), teams);
        debug!("Session reset to defaults");
    }

    /// Clears all per-question state ahead of a new question.
    pub(crate) fn clear_question_state(&mut self) {
        self.submissions.clear();
        self.passed_team_ids.clear();
        self.requested_hint = false;
        self.hint_visible = false;
        self.explanation_visible = false;
        self.is_reading = false;
        self.turn_start_time = None;
        self.clear_ask_ai();
    }

    pub(crate) fn clear_ask_ai(&mut self) {
        self.ask_ai_state = AskAiState::Idle;
        self.current_ask_ai_question = None;
        self.current_ask_ai_response = None;
        self.ask_ai_verdict = None;
    }
}
