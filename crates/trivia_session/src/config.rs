//! Application configuration for the trivia session service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::questions::{DeckQuestionSource, HttpQuestionSource, QuestionSource};
use crate::session::{SessionRules, Team};

/// Overrides [`AppConfig::db_path`].
pub const DB_PATH_ENV: &str = "TRIVIA_DB_PATH";

/// Overrides the question source with an HTTP generator at this URL.
pub const QUESTION_URL_ENV: &str = "TRIVIA_QUESTION_URL";

/// A team as listed in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Stable team identifier used in submissions.
    id: String,
    /// Display name.
    name: String,
}

impl TeamConfig {
    /// Creates a team entry.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Where the host's "next question" comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuestionSourceConfig {
    /// Remote generator reached over HTTP.
    Http {
        /// Endpoint that accepts question requests.
        url: String,
    },
    /// Prepared TOML deck on disk.
    Deck {
        /// Path to the deck file.
        path: PathBuf,
    },
}

/// Configuration for the session service.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct AppConfig {
    /// Identifier given to a freshly created session.
    #[serde(default = "default_session_id")]
    session_id: String,

    /// SQLite database file holding the session record.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Roster used when no session is stored yet.
    #[serde(default = "default_teams")]
    teams: Vec<TeamConfig>,

    /// Scoring and timing rules.
    #[serde(default)]
    rules: SessionRules,

    /// Optional question source for `fetch_next_question`.
    #[serde(default)]
    question_source: Option<QuestionSourceConfig>,
}

#[instrument]
fn default_session_id() -> String {
    "main".to_string()
}

#[instrument]
fn default_db_path() -> String {
    "trivia_session.db".to_string()
}

#[instrument]
fn default_teams() -> Vec<TeamConfig> {
    (1..=3)
        .map(|n| TeamConfig::new(format!("team-{n}"), format!("Team {n}")))
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            db_path: default_db_path(),
            teams: default_teams(),
            rules: SessionRules::default(),
            question_source: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(session_id = %config.session_id, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise starts from defaults, then
    /// applies environment overrides.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            warn!("Config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `TRIVIA_DB_PATH` and `TRIVIA_QUESTION_URL` as looked up by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db_path) = lookup(DB_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            debug!(%db_path, "Database path overridden from environment");
            self.db_path = db_path;
        }
        if let Some(url) = lookup(QUESTION_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!(%url, "Question source overridden from environment");
            self.question_source = Some(QuestionSourceConfig::Http { url });
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.teams.is_empty() {
            return Err(ConfigError::new("At least one team is required".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for team in &self.teams {
            if team.id.trim().is_empty() {
                return Err(ConfigError::new("Team ids must not be blank".to_string()));
            }
            if !seen.insert(team.id.as_str()) {
                return Err(ConfigError::new(format!("Duplicate team id '{}'", team.id)));
            }
        }
        Ok(())
    }

    /// Builds the starting roster.
    pub fn roster(&self) -> Vec<Team> {
        self.teams
            .iter()
            .map(|t| Team::new(t.id.clone(), t.name.clone()))
            .collect()
    }

    /// Builds the configured question source, if any.
    #[instrument(skip(self))]
    pub fn build_question_source(&self) -> Result<Option<Arc<dyn QuestionSource>>, ConfigError> {
        let source: Arc<dyn QuestionSource> = match &self.question_source {
            None => return Ok(None),
            Some(QuestionSourceConfig::Http { url }) => {
                Arc::new(HttpQuestionSource::new(url.clone()))
            }
            Some(QuestionSourceConfig::Deck { path }) => Arc::new(
                DeckQuestionSource::from_file(path)
                    .map_err(|e| ConfigError::new(format!("Failed to load deck: {}", e)))?,
            ),
        };
        Ok(Some(source))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
