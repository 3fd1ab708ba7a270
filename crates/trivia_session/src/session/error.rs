//! Rejections raised by session commands.

use super::types::{AskAiState, QuestionId, RoundType, SessionStatus, TeamId};

/// A command that cannot be applied to the session in its current state.
///
/// Rejected commands never mutate the session.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CommandError {
    /// The command needs a current question and there is none.
    #[display("No question is currently loaded")]
    NoCurrentQuestion,

    /// The status machine does not allow this transition.
    #[display("Cannot move session from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },

    /// The team is not part of the session.
    #[display("Unknown team '{_0}'")]
    UnknownTeam(TeamId),

    /// The submission targets a question that is no longer current.
    #[display("Submission for question '{got}' but current question is '{expected}'")]
    StaleQuestion {
        /// Current question id.
        expected: QuestionId,
        /// Question id named by the caller.
        got: QuestionId,
    },

    /// Only the active team may act in a turn-based round.
    #[display("Team '{_0}' does not hold the turn")]
    NotActiveTeam(TeamId),

    /// Submissions are only taken while the question is live.
    #[display("Submissions are closed while the session is {_0}")]
    SubmissionsClosed(SessionStatus),

    /// The command does not apply to the current round type.
    #[display("Command requires a {expected} round but the current round is {actual}")]
    WrongRound {
        /// Round type the command needs.
        expected: RoundType,
        /// Round type of the current question.
        actual: RoundType,
    },

    /// An answer submission without a selected option.
    #[display("Answer submission has no selected option")]
    MissingAnswer,

    /// The selected option does not exist.
    #[display("Option {index} is out of range for {options} options")]
    AnswerOutOfRange {
        /// Selected option index.
        index: usize,
        /// Number of options on the question.
        options: usize,
    },

    /// The Ask-AI sub-machine does not allow this transition.
    #[display("Cannot move Ask-AI flow from {from} to {to}")]
    InvalidAskAiTransition {
        /// Current sub-state.
        from: AskAiState,
        /// Requested sub-state.
        to: AskAiState,
    },

    /// A required text payload was blank.
    #[display("Field '{_0}' must not be blank")]
    BlankPayload(&'static str),

    /// The session moved on while the next question was being fetched.
    #[display("Session changed while the next question was being fetched")]
    SessionChanged,

    /// The injected question is malformed.
    #[display("Invalid question: {_0}")]
    InvalidQuestion(String),
}

impl std::error::Error for CommandError {}
