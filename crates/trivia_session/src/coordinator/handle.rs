//! Cloneable facade over the coordinator task.

use std::sync::Arc;

use derive_getters::Getters;
use derive_setters::Setters;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{info, instrument, warn};

use crate::coordinator::task::{Command, CoordinatorTask, Reply, Scored, SubmitRequest, Submitted};
use crate::questions::QuestionSourceError;
use crate::coordinator::{LoadOutcome, SessionError};
use crate::db::SessionStore;
use crate::questions::QuestionSource;
use crate::session::{
    AskAiTransition, AskAiVerdict, Clock, Difficulty, Question, RoundType, Session, SessionRules,
    SessionStatus, SystemClock, Team,
};

const COMMAND_BUFFER: usize = 64;

/// Everything the coordinator needs besides its store.
#[derive(Debug, Clone, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct CoordinatorOptions {
    /// Identifier given to a freshly created session.
    session_id: String,
    /// Roster used when no session is stored.
    teams: Vec<Team>,
    /// Scoring and timing rules.
    rules: SessionRules,
    /// Time source for turn windows and timestamps.
    clock: Arc<dyn Clock>,
}

impl CoordinatorOptions {
    /// Options with default rules and the system clock.
    pub fn new(session_id: impl Into<String>, teams: Vec<Team>) -> Self {
        Self {
            session_id: session_id.into(),
            teams,
            rules: SessionRules::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Handle to the running session coordinator.
///
/// Every operation is serialized through the coordinator task, so callers
/// always observe a session that has been durably saved.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands_tx: mpsc::Sender<Command>,
    question_source: Option<Arc<dyn QuestionSource>>,
    /// Shared by every clone so only one fetch runs at a time.
    fetch_lock: Arc<Mutex<()>>,
}

impl SessionHandle {
    /// Loads the session from `store` and starts the coordinator task.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persistence`] when the store is unusable.
    #[instrument(skip_all, fields(session_id = %options.session_id()))]
    pub fn spawn(
        store: impl SessionStore + 'static,
        options: CoordinatorOptions,
    ) -> Result<(Self, LoadOutcome), SessionError> {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let CoordinatorOptions {
            session_id,
            teams,
            rules,
            clock,
        } = options;
        let (task, outcome) =
            CoordinatorTask::load(Box::new(store), session_id, teams, clock, rules, commands_rx)?;
        tokio::spawn(task.run());
        info!(?outcome, "Session coordinator started");

        Ok((
            Self {
                commands_tx,
                question_source: None,
                fetch_lock: Arc::new(Mutex::new(())),
            },
            outcome,
        ))
    }

    /// Attaches the source used by [`SessionHandle::fetch_next_question`].
    pub fn with_question_source(mut self, source: Arc<dyn QuestionSource>) -> Self {
        self.question_source = Some(source);
        self
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands_tx
            .send(build(reply))
            .await
            .map_err(|_| SessionError::Unavailable)?;
        rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Current session, with any expired turn already advanced.
    pub async fn get_session(&self) -> Result<Session, SessionError> {
        self.request(|reply| Command::GetSession { reply }).await
    }

    /// Moves the session to `status`.
    ///
    /// Moving to REVEALED scores the question; the applied changes are returned.
    #[instrument(skip(self))]
    pub async fn set_status(&self, status: SessionStatus) -> Result<Scored, SessionError> {
        self.request(|reply| Command::SetStatus { status, reply }).await
    }

    /// Chooses the round type the host wants next.
    #[instrument(skip(self))]
    pub async fn set_next_round_type(&self, round: RoundType) -> Result<Session, SessionError> {
        self.request(|reply| Command::SetNextRoundType { round, reply }).await
    }

    /// Makes `question` current, clearing the previous question's state.
    #[instrument(skip(self, question), fields(question_id = %question.id()))]
    pub async fn inject_question(&self, question: Question) -> Result<Session, SessionError> {
        self.request(|reply| Command::InjectQuestion { question, reply }).await
    }

    /// Records an answer or pass.
    #[instrument(skip(self, request), fields(team_id = %request.team_id))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submitted, SessionError> {
        self.request(|reply| Command::Submit { request, reply }).await
    }

    /// Records that `team_id` asked for the hint.
    #[instrument(skip(self))]
    pub async fn request_hint(&self, team_id: &str) -> Result<Session, SessionError> {
        let team_id = team_id.to_string();
        self.request(|reply| Command::RequestHint { team_id, reply }).await
    }

    /// Shows or hides the hint.
    #[instrument(skip(self))]
    pub async fn toggle_hint(&self, visible: bool) -> Result<Session, SessionError> {
        self.request(|reply| Command::ToggleHint { visible, reply }).await
    }

    /// Shows the explanation of a revealed question.
    #[instrument(skip(self))]
    pub async fn reveal_explanation(&self) -> Result<Session, SessionError> {
        self.request(|reply| Command::RevealExplanation { reply }).await
    }

    /// Reveals the answer and commits the question's score changes.
    #[instrument(skip(self))]
    pub async fn reveal_and_score(&self) -> Result<Scored, SessionError> {
        self.request(|reply| Command::RevealAndScore { reply }).await
    }

    /// Zeroes scores and clears the question, keeping the roster.
    #[instrument(skip(self))]
    pub async fn reset_session(&self) -> Result<Session, SessionError> {
        self.request(|reply| Command::ResetSession { reply }).await
    }

    /// Ends the reading phase and starts the turn clock.
    #[instrument(skip(self))]
    pub async fn complete_reading(&self) -> Result<Session, SessionError> {
        self.request(|reply| Command::CompleteReading { reply }).await
    }

    /// Advances the Ask-AI flow.
    #[instrument(skip(self, transition), fields(target = %transition.target()))]
    pub async fn set_ask_ai_state(
        &self,
        transition: AskAiTransition,
    ) -> Result<Session, SessionError> {
        self.request(|reply| Command::SetAskAiState { transition, reply }).await
    }

    /// Rules on the AI's answer, awarding the bonus when it was wrong.
    #[instrument(skip(self))]
    pub async fn judge_ask_ai(&self, verdict: AskAiVerdict) -> Result<Scored, SessionError> {
        self.request(|reply| Command::JudgeAskAi { verdict, reply }).await
    }

    /// Pulls a question of the host's chosen round type from the question
    /// source and makes it current.
    ///
    /// Fetches run one at a time. The round type is captured and injection is
    /// checked before the source is called; the fetched question is injected
    /// only if the round type and current question are still the ones the
    /// fetch was planned against. A question that is not injected is handed
    /// back to the source.
    ///
    /// # Errors
    ///
    /// [`SessionError::QuestionSource`] when no source is attached or it fails,
    /// [`SessionError::Rejected`] when injection is not allowed or the session
    /// changed during the fetch. The session is untouched in every error case.
    #[instrument(skip(self))]
    pub async fn fetch_next_question(
        &self,
        difficulty: Difficulty,
    ) -> Result<Session, SessionError> {
        let source = self
            .question_source
            .as_ref()
            .ok_or_else(|| QuestionSourceError::new("No question source configured"))?;
        let _fetching = self.fetch_lock.lock().await;

        let plan = self.request(|reply| Command::PlanFetch { reply }).await?;
        let question = source.fetch(plan.round, difficulty).await.map_err(|e| {
            warn!(error = %e, "Question source failed");
            e
        })?;

        let fetched = question.clone();
        match self
            .request(|reply| Command::InjectFetched {
                question,
                plan,
                reply,
            })
            .await
        {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(error = %e, question_id = %fetched.id(), "Fetched question not used, releasing it");
                source.release(&fetched).await;
                Err(e)
            }
        }
    }
}
