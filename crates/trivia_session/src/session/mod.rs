//! Session aggregate and the rules that mutate it.

mod ask_ai;
mod clock;
mod error;
mod hints;
mod rules;
mod scoring;
mod status;
mod submit;
mod turns;
mod types;

pub use ask_ai::AskAiTransition;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CommandError;
pub use rules::SessionRules;
pub use scoring::{ScoreChange, ScoreReason, score_question};
pub use status::{MAX_QUESTION_POINTS, validate_question};
pub use submit::SubmitOutcome;
pub use types::{
    AskAiState, AskAiVerdict, Difficulty, Question, QuestionId, RoundType, Session, SessionStatus,
    Submission, SubmissionKind, Team, TeamId,
};
