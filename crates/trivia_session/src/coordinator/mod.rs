//! Single-writer coordinator that serializes every session command.

mod error;
mod handle;
mod task;

pub use error::{LoadOutcome, SessionError};
pub use handle::{CoordinatorOptions, SessionHandle};
pub use task::{Scored, SubmitRequest, Submitted};
