//! REST endpoints driving the onboarding wizard.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::error;

use crate::error::{Error, SubmissionError, WizardError};

use super::session::{CommitReport, CommitStart, OnboardingSession};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub session: Arc<Mutex<OnboardingSession>>,
}

impl OnboardingRouteState {
    pub fn new(session: OnboardingSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/step", get(get_step).post(commit_step))
        .route("/api/onboarding/back", post(go_back))
        .route("/api/onboarding/retry", post(retry))
        .with_state(state)
}

/// Error body `{"error": ..}` with a status picked from the error kind.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::Wizard(WizardError::AlreadyComplete) => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            Error::Submission(e) => {
                let status = match e {
                    SubmissionError::AlreadyInFlight
                    | SubmissionError::AlreadySubmitted
                    | SubmissionError::NothingToRetry => StatusCode::CONFLICT,
                    SubmissionError::SaveFailed(_) | SubmissionError::MarkCompleteFailed(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    SubmissionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                };
                (status, e.user_message())
            }
            other => {
                error!(error = %other, "Onboarding request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "onboarding-flow"
    }))
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(session.status())
}

/// GET /api/onboarding/step
///
/// Current step descriptor, or 409 once onboarding is complete.
async fn get_step(State(state): State<OnboardingRouteState>) -> Result<Response, ApiError> {
    let session = state.session.lock().await;
    let view = session.step_view()?;
    Ok(Json(view).into_response())
}

/// POST /api/onboarding/step
///
/// Body is the current step's section. 422 with field errors on rejection.
async fn commit_step(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    // Detached so a dropped client cannot abandon a submission mid-flight.
    let task = tokio::spawn(async move {
        let start = state.session.lock().await.begin_commit(&body)?;
        let report = match start {
            CommitStart::Done(report) => report,
            CommitStart::Submit(ticket) => {
                let result = ticket.run().await;
                state.session.lock().await.finish_submission(ticket, result)?
            }
        };
        Ok::<_, Error>((state, report))
    });
    let (state, report) = join(task).await?;
    Ok(report_response(&state, report).await)
}

/// POST /api/onboarding/back
async fn go_back(State(state): State<OnboardingRouteState>) -> Result<Response, ApiError> {
    let mut session = state.session.lock().await;
    let index = session.retreat()?;
    Ok(Json(json!({
        "current_step_index": index,
        "status": session.status(),
    }))
    .into_response())
}

/// POST /api/onboarding/retry
async fn retry(State(state): State<OnboardingRouteState>) -> Result<Response, ApiError> {
    let task = tokio::spawn(async move {
        let ticket = state.session.lock().await.begin_retry()?;
        let result = ticket.run().await;
        let report = state.session.lock().await.finish_submission(ticket, result)?;
        Ok::<_, Error>((state, report))
    });
    let (state, report) = join(task).await?;
    Ok(report_response(&state, report).await)
}

async fn join<T>(task: tokio::task::JoinHandle<Result<T, Error>>) -> Result<T, ApiError> {
    match task.await {
        Ok(result) => result.map_err(ApiError),
        Err(e) => {
            error!(error = %e, "Onboarding task panicked");
            Err(ApiError(Error::Internal("request task aborted".to_string())))
        }
    }
}

async fn report_response(state: &OnboardingRouteState, report: CommitReport) -> Response {
    let mut session = state.session.lock().await;
    let code = match report {
        CommitReport::Rejected { .. } | CommitReport::CompletionBlocked { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CommitReport::Advanced { .. } | CommitReport::Submitted => StatusCode::OK,
    };
    let body = json!({
        "report": report,
        "status": session.status(),
        "storage_warning": session.take_storage_warning(),
    });
    (code, Json(body)).into_response()
}
