//! Trivia Session library - durable coordinator for host-driven trivia games
//!
//! One shared session record is mutated by a host, by teams submitting
//! answers, and by a turn timer. Every mutation goes through a single
//! coordinator task and is persisted before callers see it.
//!
//! # Architecture
//!
//! - **Session**: the aggregate and the pure rules that mutate it
//! - **Coordinator**: serializes commands and owns the turn timer
//! - **Store**: SQLite (diesel) or in-memory persistence of the record
//! - **Questions**: HTTP generator or TOML deck question sources
//! - **Server**: axum HTTP facade
//!
//! # Example
//!
//! ```no_run
//! use trivia_session::{CoordinatorOptions, MemorySessionStore, SessionHandle, Team};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let teams = vec![Team::new("red", "Red"), Team::new("blue", "Blue")];
//! let (handle, _outcome) =
//!     SessionHandle::spawn(MemorySessionStore::new(), CoordinatorOptions::new("main", teams))?;
//! let session = handle.get_session().await?;
//! assert_eq!(session.teams().len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod coordinator;
mod db;
mod questions;
mod server;
mod session;

// Crate-level exports - Configuration
pub use config::{AppConfig, ConfigError, DB_PATH_ENV, QUESTION_URL_ENV, QuestionSourceConfig, TeamConfig};

// Crate-level exports - Coordinator facade
pub use coordinator::{
    CoordinatorOptions, LoadOutcome, Scored, SessionError, SessionHandle, SubmitRequest, Submitted,
};

// Crate-level exports - Persistence
pub use db::{
    MemorySessionStore, NewSessionRecord, SESSION_RECORD_ID, SessionRecord, SessionStore,
    SqliteSessionStore, StoreError, StoreErrorKind,
};

// Crate-level exports - Question sources
pub use questions::{
    Deck, DeckQuestionSource, HttpQuestionSource, QuestionRequest, QuestionSource,
    QuestionSourceError,
};

// Crate-level exports - HTTP facade
pub use server::{
    ApiError, ErrorBody, HintRequest, JudgeRequest, NextQuestionRequest, RoundTypeRequest,
    StatusRequest, ToggleHintRequest, router, serve,
};

// Crate-level exports - Session domain
pub use session::{
    AskAiState, AskAiTransition, AskAiVerdict, Clock, CommandError, Difficulty, ManualClock,
    Question, QuestionId, RoundType, ScoreChange, ScoreReason, Session, SessionRules,
    SessionStatus, Submission, SubmissionKind, SubmitOutcome, SystemClock, Team, TeamId,
    score_question, validate_question,
};
