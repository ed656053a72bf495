//! HTTP surface over the [`Orchestrator`].

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::{
    error::{Error, eval_error::EvalError},
    orchestrator::{DispatchOutcome, Orchestrator},
    task::{Submission, TaskRecord},
};

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = cors_layer(&orchestrator.config().allowed_origins);
    let state = AppState { orchestrator };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/start-test/{family}/{round}", post(start_test))
        .route("/notify", post(notify))
        .route("/re-evaluate/{task_id}", post(re_evaluate))
        .route("/results", get(all_results))
        .route("/results/{task_id}", get(task_result))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin without credentials; an explicit list allows
/// credentials and mirrors the requested methods and headers.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn start_test(
    State(st): State<AppState>,
    Path((family, round)): Path<(String, u32)>,
) -> Result<Response, AppError> {
    let response = match st.orchestrator.start(&family, round).await? {
        DispatchOutcome::Sent { task_id } => {
            Json(json!({ "status": "sent", "task_id": task_id })).into_response()
        }
        DispatchOutcome::Rejected { status, body, .. } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "status": "error",
                "detail": format!("Producer API returned {status}"),
                "response": body,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

async fn notify(
    State(st): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<Json<Value>, AppError> {
    st.orchestrator.notify(submission).await?;
    Ok(Json(
        json!({ "status": "accepted", "detail": "Evaluation has started." }),
    ))
}

async fn re_evaluate(
    State(st): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    st.orchestrator.re_evaluate(&task_id).await?;
    Ok(Json(
        json!({ "status": "accepted", "detail": "Re-evaluation started." }),
    ))
}

async fn all_results(State(st): State<AppState>) -> Json<BTreeMap<String, TaskRecord>> {
    Json(st.orchestrator.results().await)
}

async fn task_result(
    State(st): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskRecord>, AppError> {
    Ok(Json(st.orchestrator.result(&task_id).await?))
}

#[derive(Debug)]
pub struct AppError(Error);

impl<E: Into<Error>> From<E> for AppError {
    fn from(value: E) -> Self {
        Self(value.into())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.as_eval() {
            Some(EvalError::TaskNotFound(_) | EvalError::FixtureNotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            Some(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, "request rejected");
        }
        let body = Json(json!({ "detail": self.0.to_string() }));
        (status, body).into_response()
    }
}
