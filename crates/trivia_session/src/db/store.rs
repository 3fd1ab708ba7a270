//! The durable record provider seam and an in-process implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument, warn};

use crate::db::StoreError;
use crate::db::models::{decode_session, encode_session};
use crate::session::Session;

/// Loads and saves the single session record.
///
/// The coordinator is the only caller, so implementations need not
/// guard against concurrent use.
pub trait SessionStore: Send + std::fmt::Debug {
    /// Loads the stored session.
    ///
    /// # Errors
    ///
    /// [`StoreErrorKind::NotFound`](crate::StoreErrorKind::NotFound) when nothing
    /// was saved, `Corrupt` when the record cannot be decoded, `Backend` otherwise.
    fn load(&mut self) -> Result<Session, StoreError>;

    /// Persists the session, replacing any previous record.
    fn save(&mut self, session: &Session) -> Result<(), StoreError>;
}

/// Store that keeps the encoded record in memory.
///
/// Clones share the same record, so a test can hand one clone to the
/// coordinator and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    payload: Arc<Mutex<Option<String>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `payload`, valid or not.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        let store = Self::default();
        *store.lock() = Some(payload.into());
        store
    }

    /// Makes every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Decodes whatever is currently stored.
    pub fn snapshot(&self) -> Option<Session> {
        self.lock().as_deref().and_then(|p| decode_session(p).ok())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.payload.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    #[instrument(skip(self))]
    fn load(&mut self) -> Result<Session, StoreError> {
        match self.lock().as_deref() {
            Some(payload) => decode_session(payload),
            None => Err(StoreError::not_found("Memory store is empty")),
        }
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    fn save(&mut self, session: &Session) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            warn!("Simulated save failure");
            return Err(StoreError::backend("Simulated save failure"));
        }
        let payload = encode_session(session)?;
        *self.lock() = Some(payload);
        debug!("Session saved in memory");
        Ok(())
    }
}
