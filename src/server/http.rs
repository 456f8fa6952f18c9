// src/server/http.rs

//! Axum routes that turn an HTTP request into an action dispatch.

use super::context::AppState;
use crate::core::errors::ActionGateError;
use crate::core::response::ActionResponse;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Builds the router serving `POST /actions/{name}`.
pub fn build_http_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/actions/{name}", post(dispatch_action))
        .with_state(state)
}

async fn dispatch_action(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let args: Value = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return error_body(StatusCode::BAD_REQUEST, format!("Malformed JSON body: {e}"));
            }
        }
    };

    let request_id = state.next_request_id();
    match state.router.dispatch(request_id, &name, &args).await {
        Ok(response) => response.into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: ActionGateError) -> Response {
    match e {
        ActionGateError::UnknownAction(_) => error_body(StatusCode::NOT_FOUND, e.to_string()),
        ActionGateError::ArgumentBinding { .. } => {
            warn!("Rejected request: {}", e);
            error_body(StatusCode::BAD_REQUEST, e.to_string())
        }
        other => {
            error!("Request aborted by infrastructure failure: {}", other);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "Error": true, "Message": message }))).into_response()
}
