//! SQLite-backed session store.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{NewSessionRecord, SESSION_RECORD_ID, SessionRecord, SessionStore, StoreError, schema};
use crate::session::Session;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Durable session store keeping the session as a single JSON row.
pub struct SqliteSessionStore {
    db_path: String,
    conn: SqliteConnection,
}

impl std::fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSessionStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteSessionStore {
    /// Opens (creating if needed) the database at `db_path` and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns a backend [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, StoreError> {
        info!(path = %db_path, "Opening session store");
        let mut conn = SqliteConnection::establish(&db_path).map_err(|e| {
            StoreError::backend(format!("Failed to connect to '{}': {}", db_path, e))
        })?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::backend(format!("Migrations failed: {}", e)))?;
        debug!(count = applied.len(), "Migrations applied");

        Ok(Self { db_path, conn })
    }

    /// Path of the backing database.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self), fields(db_path = %self.db_path))]
    fn load(&mut self) -> Result<Session, StoreError> {
        debug!("Loading session record");
        let record = schema::session_records::table
            .find(SESSION_RECORD_ID)
            .select(SessionRecord::as_select())
            .first(&mut self.conn)
            .optional()?;

        match record {
            Some(record) => {
                let session = record.decode()?;
                info!(session_id = %session.id(), updated_at = %record.updated_at(), "Session loaded");
                Ok(session)
            }
            None => Err(StoreError::not_found("No session record saved yet")),
        }
    }

    #[instrument(skip(self, session), fields(db_path = %self.db_path, session_id = %session.id()))]
    fn save(&mut self, session: &Session) -> Result<(), StoreError> {
        let record = NewSessionRecord::encode(session)?;
        let rows = diesel::replace_into(schema::session_records::table)
            .values(&record)
            .execute(&mut self.conn)?;
        debug!(rows, "Session saved");
        Ok(())
    }
}
