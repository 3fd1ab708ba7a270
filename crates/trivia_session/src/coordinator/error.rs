//! Errors surfaced to callers of the session facade.

use derive_more::{Display, Error, From};
use serde::Serialize;

use crate::db::StoreError;
use crate::questions::QuestionSourceError;
use crate::session::CommandError;

/// Why a session command did not take effect.
///
/// In every case the session is left exactly as it was before the command.
#[derive(Debug, Display, Error, From)]
pub enum SessionError {
    /// The command is not valid in the current state.
    #[display("Command rejected: {_0}")]
    Rejected(CommandError),

    /// The new state could not be persisted, so it was discarded.
    #[display("Persistence failed: {_0}")]
    Persistence(StoreError),

    /// The question source could not supply a question.
    #[display("{_0}")]
    QuestionSource(QuestionSourceError),

    /// The coordinator task has stopped.
    #[display("Session coordinator is not running")]
    #[from(ignore)]
    Unavailable,
}

/// How the coordinator obtained its starting session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadOutcome {
    /// The stored session was loaded.
    Restored,
    /// Nothing was stored; a default session was created.
    Fresh,
    /// The stored record was unreadable and has been replaced by a default session.
    Recovered {
        /// What was wrong with the stored record.
        reason: String,
    },
}
