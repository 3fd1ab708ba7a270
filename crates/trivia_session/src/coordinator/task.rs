//! The task that owns the session and applies commands one at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::coordinator::{LoadOutcome, SessionError};
use crate::db::{SessionStore, StoreErrorKind};
use crate::session::{
    AskAiTransition, AskAiVerdict, Clock, CommandError, Question, RoundType, ScoreChange, Session,
    SessionRules, SessionStatus, SubmissionKind, SubmitOutcome, Team,
};

/// How long the turn timer waits before retrying after a failed save.
const TIMER_RETRY: Duration = Duration::from_secs(1);

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// A team's answer or pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Submitting team.
    pub team_id: String,
    /// Question the team is answering.
    pub question_id: String,
    /// Selected option, required for answers.
    #[serde(default)]
    pub answer: Option<usize>,
    /// Answer or pass.
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
}

/// Result of a submission along with the session it produced.
#[derive(Debug, Clone, Serialize)]
pub struct Submitted {
    /// What happened to the submission.
    pub outcome: SubmitOutcome,
    /// Session after the submission.
    pub session: Session,
}

/// Score changes committed by a command along with the resulting session.
#[derive(Debug, Clone, Serialize)]
pub struct Scored {
    /// Changes applied to team scores.
    pub changes: Vec<ScoreChange>,
    /// Session after scoring.
    pub session: Session,
}

/// What a question fetch was planned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchPlan {
    /// Round type the source is asked for.
    pub(crate) round: RoundType,
    /// Question that was current when the fetch started.
    pub(crate) current_question_id: Option<String>,
}

impl FetchPlan {
    fn of(session: &Session) -> Self {
        Self {
            round: *session.next_round_type(),
            current_question_id: session.current_question().as_ref().map(|q| q.id().clone()),
        }
    }
}

/// Messages accepted by the coordinator task.
#[derive(Debug)]
pub(crate) enum Command {
    GetSession {
        reply: Reply<Session>,
    },
    SetStatus {
        status: SessionStatus,
        reply: Reply<Scored>,
    },
    SetNextRoundType {
        round: RoundType,
        reply: Reply<Session>,
    },
    InjectQuestion {
        question: Question,
        reply: Reply<Session>,
    },
    PlanFetch {
        reply: Reply<FetchPlan>,
    },
    InjectFetched {
        question: Question,
        plan: FetchPlan,
        reply: Reply<Session>,
    },
    Submit {
        request: SubmitRequest,
        reply: Reply<Submitted>,
    },
    RequestHint {
        team_id: String,
        reply: Reply<Session>,
    },
    ToggleHint {
        visible: bool,
        reply: Reply<Session>,
    },
    RevealExplanation {
        reply: Reply<Session>,
    },
    RevealAndScore {
        reply: Reply<Scored>,
    },
    ResetSession {
        reply: Reply<Session>,
    },
    CompleteReading {
        reply: Reply<Session>,
    },
    SetAskAiState {
        transition: AskAiTransition,
        reply: Reply<Session>,
    },
    JudgeAskAi {
        verdict: AskAiVerdict,
        reply: Reply<Scored>,
    },
}

/// Owns the session record; the only writer of the store.
#[derive(Debug)]
pub(crate) struct CoordinatorTask {
    session: Session,
    store: Box<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    rules: SessionRules,
    commands_rx: mpsc::Receiver<Command>,
    timer_retry_at: Option<Instant>,
}

impl CoordinatorTask {
    /// Loads the starting session, falling back to a default when the
    /// stored record is missing or unreadable.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub(crate) fn load(
        mut store: Box<dyn SessionStore>,
        session_id: String,
        teams: Vec<Team>,
        clock: Arc<dyn Clock>,
        rules: SessionRules,
        commands_rx: mpsc::Receiver<Command>,
    ) -> Result<(Self, LoadOutcome), SessionError> {
        let (session, outcome) = match store.load() {
            Ok(session) => {
                info!(teams = session.teams().len(), "Restored stored session");
                (session, LoadOutcome::Restored)
            }
            Err(e) if e.kind == StoreErrorKind::NotFound => {
                info!("No stored session, starting fresh");
                let session = Session::new(session_id, teams);
                store.save(&session)?;
                (session, LoadOutcome::Fresh)
            }
            Err(e) if e.kind == StoreErrorKind::Corrupt => {
                warn!(error = %e, "Stored session unreadable, replacing with defaults");
                let session = Session::new(session_id, teams);
                store.save(&session)?;
                (session, LoadOutcome::Recovered { reason: e.message })
            }
            Err(e) => {
                error!(error = %e, "Session store unavailable");
                return Err(SessionError::Persistence(e));
            }
        };

        Ok((
            Self {
                session,
                store,
                clock,
                rules,
                commands_rx,
                timer_retry_at: None,
            },
            outcome,
        ))
    }

    /// Processes commands until every handle is dropped, firing the turn
    /// timer in between.
    pub(crate) async fn run(mut self) {
        info!(session_id = %self.session.id(), "Session coordinator running");
        loop {
            let wait = self.until_next_timer();
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = sleep_or_pending(wait) => self.on_turn_timer(),
            }
        }
        info!(session_id = %self.session.id(), "All handles dropped, coordinator stopped");
    }

    fn until_next_timer(&self) -> Option<Duration> {
        let deadline = self.session.turn_deadline(self.rules.turn_window())?;
        let until_deadline = (deadline - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let until_retry = self
            .timer_retry_at
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO);
        Some(until_deadline.max(until_retry))
    }

    #[instrument(skip(self), fields(session_id = %self.session.id()))]
    fn on_turn_timer(&mut self) {
        let now = self.clock.now();
        match self.catch_up_turn(now) {
            Ok(()) => self.timer_retry_at = None,
            Err(e) => {
                error!(error = %e, "Turn timer could not persist expiry, will retry");
                self.timer_retry_at = Some(Instant::now() + TIMER_RETRY);
            }
        }
    }

    /// Saves `next` if it differs from the committed session, then adopts it.
    ///
    /// The store call is synchronous and runs on this task. This task is the
    /// store's only user, so a slow save delays queued commands and nothing
    /// else. Callers see that delay as latency on their reply.
    fn commit(&mut self, next: Session) -> Result<(), SessionError> {
        if next == self.session {
            return Ok(());
        }
        if let Err(e) = self.store.save(&next) {
            error!(error = %e, "Failed to persist session, change discarded");
            return Err(SessionError::Persistence(e));
        }
        self.session = next;
        Ok(())
    }

    /// Applies any turn expiry that is due.
    fn catch_up_turn(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let mut next = self.session.clone();
        if next.expire_turn_if_due(now, self.rules.turn_window()) {
            debug!("Expired turn advanced");
            self.commit(next)?;
        }
        Ok(())
    }

    /// Runs `op` against a copy of the session and commits it on success.
    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut Session, DateTime<Utc>, &SessionRules) -> Result<T, CommandError>,
    ) -> Result<T, SessionError> {
        let now = self.clock.now();
        self.catch_up_turn(now)?;

        let mut next = self.session.clone();
        let value = op(&mut next, now, &self.rules).map_err(|e| {
            warn!(error = %e, "Command rejected");
            SessionError::Rejected(e)
        })?;
        self.commit(next)?;
        Ok(value)
    }

    fn apply_session(
        &mut self,
        op: impl FnOnce(&mut Session, DateTime<Utc>, &SessionRules) -> Result<(), CommandError>,
    ) -> Result<Session, SessionError> {
        self.apply(op)?;
        Ok(self.session.clone())
    }

    fn apply_scored(
        &mut self,
        op: impl FnOnce(&mut Session, DateTime<Utc>, &SessionRules) -> Result<Vec<ScoreChange>, CommandError>,
    ) -> Result<Scored, SessionError> {
        let changes = self.apply(op)?;
        Ok(Scored {
            changes,
            session: self.session.clone(),
        })
    }

    #[instrument(skip(self, command), fields(session_id = %self.session.id()))]
    fn handle(&mut self, command: Command) {
        debug!(?command, "Handling command");
        match command {
            Command::GetSession { reply } => {
                respond(reply, self.apply_session(|_, _, _| Ok(())));
            }
            Command::SetStatus { status, reply } => {
                respond(
                    reply,
                    self.apply_scored(|s, now, rules| s.set_status(status, now, rules)),
                );
            }
            Command::SetNextRoundType { round, reply } => {
                respond(
                    reply,
                    self.apply_session(|s, _, _| {
                        s.set_next_round_type(round);
                        Ok(())
                    }),
                );
            }
            Command::InjectQuestion { question, reply } => {
                respond(reply, self.apply_session(|s, _, _| s.inject_question(question)));
            }
            Command::PlanFetch { reply } => {
                respond(
                    reply,
                    self.apply(|s, _, _| {
                        s.ensure_can_inject()?;
                        Ok(FetchPlan::of(s))
                    }),
                );
            }
            Command::InjectFetched {
                question,
                plan,
                reply,
            } => {
                respond(
                    reply,
                    self.apply_session(|s, _, _| {
                        if FetchPlan::of(s) != plan {
                            return Err(CommandError::SessionChanged);
                        }
                        if *question.round_type() != plan.round {
                            return Err(CommandError::InvalidQuestion(format!(
                                "source returned a {} question, expected {}",
                                question.round_type(),
                                plan.round
                            )));
                        }
                        s.inject_question(question)
                    }),
                );
            }
            Command::Submit { request, reply } => {
                let result = self
                    .apply(|s, now, _| {
                        s.submit(
                            &request.team_id,
                            &request.question_id,
                            request.answer,
                            request.kind,
                            now,
                        )
                    })
                    .map(|outcome| Submitted {
                        outcome,
                        session: self.session.clone(),
                    });
                respond(reply, result);
            }
            Command::RequestHint { team_id, reply } => {
                respond(reply, self.apply_session(|s, _, _| s.request_hint(&team_id)));
            }
            Command::ToggleHint { visible, reply } => {
                respond(reply, self.apply_session(|s, _, _| s.toggle_hint(visible)));
            }
            Command::RevealExplanation { reply } => {
                respond(reply, self.apply_session(|s, _, _| s.reveal_explanation()));
            }
            Command::RevealAndScore { reply } => {
                respond(reply, self.apply_scored(|s, _, rules| s.reveal_and_score(rules)));
            }
            Command::ResetSession { reply } => {
                respond(
                    reply,
                    self.apply_session(|s, _, _| {
                        s.reset();
                        Ok(())
                    }),
                );
            }
            Command::CompleteReading { reply } => {
                respond(
                    reply,
                    self.apply_session(|s, now, _| {
                        s.complete_reading(now);
                        Ok(())
                    }),
                );
            }
            Command::SetAskAiState { transition, reply } => {
                respond(reply, self.apply_session(|s, _, _| s.set_ask_ai_state(transition)));
            }
            Command::JudgeAskAi { verdict, reply } => {
                respond(reply, self.apply_scored(|s, _, rules| s.judge_ask_ai(verdict, rules)));
            }
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T, SessionError>) {
    if reply.send(result).is_err() {
        debug!("Caller went away before the reply was sent");
    }
}

async fn sleep_or_pending(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending::<()>().await,
    }
}
