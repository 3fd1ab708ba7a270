//! HTTP facade over the session coordinator.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tracing::{debug, info, instrument, warn};

use crate::coordinator::{Scored, SessionError, SessionHandle, SubmitRequest, Submitted};
use crate::session::{
    AskAiTransition, AskAiVerdict, CommandError, Difficulty, Question, RoundType, Session,
    SessionStatus,
};

/// Body of `POST /session/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Target status.
    pub status: SessionStatus,
}

/// Body of `POST /session/next-round-type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTypeRequest {
    /// Round type for the next question.
    pub round_type: RoundType,
}

/// Body of `POST /session/question/next`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextQuestionRequest {
    /// Requested difficulty.
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Body of `POST /session/hint/request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    /// Team asking for the hint.
    pub team_id: String,
}

/// Body of `POST /session/hint/toggle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleHintRequest {
    /// Whether the hint is shown.
    pub visible: bool,
}

/// Body of `POST /session/ask-ai/judge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Host's ruling on the AI's answer.
    pub verdict: AskAiVerdict,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable reason.
    pub error: String,
}

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Status code the error maps to.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        let status = match &error {
            SessionError::Rejected(CommandError::UnknownTeam(_)) => StatusCode::NOT_FOUND,
            SessionError::Rejected(
                CommandError::MissingAnswer
                | CommandError::AnswerOutOfRange { .. }
                | CommandError::BlankPayload(_)
                | CommandError::InvalidQuestion(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::Rejected(_) => StatusCode::CONFLICT,
            SessionError::Persistence(_) | SessionError::Unavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SessionError::QuestionSource(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "Request failed");
        } else {
            debug!(status = %self.status, error = %self.message, "Request refused");
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Builds the router for the session API.
#[instrument(skip(handle))]
pub fn router(handle: SessionHandle) -> Router {
    info!("Building session API router");
    Router::new()
        .route("/session", get(get_session))
        .route("/session/status", post(set_status))
        .route("/session/next-round-type", post(set_next_round_type))
        .route("/session/question", post(inject_question))
        .route("/session/question/next", post(fetch_next_question))
        .route("/session/submit", post(submit))
        .route("/session/hint/request", post(request_hint))
        .route("/session/hint/toggle", post(toggle_hint))
        .route("/session/explanation/reveal", post(reveal_explanation))
        .route("/session/reveal", post(reveal_and_score))
        .route("/session/reset", post(reset_session))
        .route("/session/reading/complete", post(complete_reading))
        .route("/session/ask-ai/state", post(set_ask_ai_state))
        .route("/session/ask-ai/judge", post(judge_ask_ai))
        .layer(
            ServiceBuilder::new().map_request(|req: Request<Body>| {
                debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                req
            }),
        )
        .with_state(handle)
}

/// Binds `addr` and serves the session API until the process stops.
#[instrument(skip(handle))]
pub async fn serve(handle: SessionHandle, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Session API listening");
    axum::serve(listener, router(handle)).await
}

async fn get_session(State(handle): State<SessionHandle>) -> ApiResult<Session> {
    Ok(Json(handle.get_session().await?))
}

async fn set_status(
    State(handle): State<SessionHandle>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Scored> {
    let Json(body) = payload?;
    Ok(Json(handle.set_status(body.status).await?))
}

async fn set_next_round_type(
    State(handle): State<SessionHandle>,
    payload: Result<Json<RoundTypeRequest>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(body) = payload?;
    Ok(Json(handle.set_next_round_type(body.round_type).await?))
}

async fn inject_question(
    State(handle): State<SessionHandle>,
    payload: Result<Json<Question>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(question) = payload?;
    Ok(Json(handle.inject_question(question).await?))
}

async fn fetch_next_question(
    State(handle): State<SessionHandle>,
    payload: Result<Json<NextQuestionRequest>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(body) = payload?;
    Ok(Json(handle.fetch_next_question(body.difficulty).await?))
}

async fn submit(
    State(handle): State<SessionHandle>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<Submitted> {
    let Json(request) = payload?;
    Ok(Json(handle.submit(request).await?))
}

async fn request_hint(
    State(handle): State<SessionHandle>,
    payload: Result<Json<HintRequest>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(body) = payload?;
    Ok(Json(handle.request_hint(&body.team_id).await?))
}

async fn toggle_hint(
    State(handle): State<SessionHandle>,
    payload: Result<Json<ToggleHintRequest>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(body) = payload?;
    Ok(Json(handle.toggle_hint(body.visible).await?))
}

async fn reveal_explanation(State(handle): State<SessionHandle>) -> ApiResult<Session> {
    Ok(Json(handle.reveal_explanation().await?))
}

async fn reveal_and_score(State(handle): State<SessionHandle>) -> ApiResult<Scored> {
    Ok(Json(handle.reveal_and_score().await?))
}

async fn reset_session(State(handle): State<SessionHandle>) -> ApiResult<Session> {
    Ok(Json(handle.reset_session().await?))
}

async fn complete_reading(State(handle): State<SessionHandle>) -> ApiResult<Session> {
    Ok(Json(handle.complete_reading().await?))
}

async fn set_ask_ai_state(
    State(handle): State<SessionHandle>,
    payload: Result<Json<AskAiTransition>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(transition) = payload?;
    Ok(Json(handle.set_ask_ai_state(transition).await?))
}

async fn judge_ask_ai(
    State(handle): State<SessionHandle>,
    payload: Result<Json<JudgeRequest>, JsonRejection>,
) -> ApiResult<Scored> {
    let Json(body) = payload?;
    Ok(Json(handle.judge_ask_ai(body.verdict).await?))
}
