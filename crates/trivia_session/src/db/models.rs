//! Database models for the persisted session record.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::{StoreError, schema};
use crate::session::Session;

/// Row id of the single session record.
pub const SESSION_RECORD_ID: i32 = 1;

/// Persisted session record.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::session_records)]
pub struct SessionRecord {
    id: i32,
    payload: String,
    updated_at: NaiveDateTime,
}

impl SessionRecord {
    /// Decodes the stored session.
    ///
    /// # Errors
    ///
    /// Returns a corrupt [`StoreError`] if the payload is not a valid session.
    #[instrument(skip(self), fields(id = self.id, updated_at = %self.updated_at))]
    pub fn decode(&self) -> Result<Session, StoreError> {
        decode_session(&self.payload)
    }
}

/// Insertable (or replaceable) session record.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::session_records)]
pub struct NewSessionRecord {
    id: i32,
    payload: String,
    updated_at: NaiveDateTime,
}

impl NewSessionRecord {
    /// Encodes a session into the single-row record.
    ///
    /// # Errors
    ///
    /// Returns a backend [`StoreError`] if serialization fails.
    #[instrument(skip(session), fields(session_id = %session.id()))]
    pub fn encode(session: &Session) -> Result<Self, StoreError> {
        Ok(Self::new(
            SESSION_RECORD_ID,
            encode_session(session)?,
            chrono::Utc::now().naive_utc(),
        ))
    }
}

/// Serializes a session to its JSON payload.
pub(crate) fn encode_session(session: &Session) -> Result<String, StoreError> {
    serde_json::to_string(session)
        .map_err(|e| StoreError::backend(format!("Failed to encode session: {}", e)))
}

/// Parses a JSON payload back into a session.
pub(crate) fn decode_session(payload: &str) -> Result<Session, StoreError> {
    serde_json::from_str(payload)
        .map_err(|e| StoreError::corrupt(format!("Failed to decode session: {}", e)))
}
