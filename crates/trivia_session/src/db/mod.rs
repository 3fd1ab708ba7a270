//! Persistence layer for the session record.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only
mod store;

pub use error::{StoreError, StoreErrorKind};
pub use models::{NewSessionRecord, SESSION_RECORD_ID, SessionRecord};
pub use repository::SqliteSessionStore;
pub use store::{MemorySessionStore, SessionStore};
