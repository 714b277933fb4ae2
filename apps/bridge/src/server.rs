//! Inbound HTTP trigger endpoint

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bridge_config::ConfigStore;
use bridge_errors::{Error, SyncError};
use bridge_events::{AppEvent, EventEmitter, EventSender, SyncEvent};
use bridge_ops::{SyncOrchestrator, TriggerReport};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Route accepting trigger requests
pub const TRIGGER_PATH: &str = "/bridge/v1/update-plugins";

/// Header carrying the caller's shared secret
pub const SECRET_HEADER: &str = "x-fp-update-secret";

/// Shared state for the trigger handler
#[derive(Clone)]
pub struct TriggerState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub config: ConfigStore,
    pub tx: EventSender,
}

/// Build the router serving [`TRIGGER_PATH`]
pub fn router(state: TriggerState) -> Router {
    Router::new()
        .route(TRIGGER_PATH, post(handle_trigger))
        .with_state(state)
}

/// Failures surfaced by the trigger endpoint
///
/// Bodies carry a stable `code` and a fixed message; internal details never
/// reach the caller.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("remote authority not configured")]
    NotConfigured,

    #[error("sync already in progress")]
    InProgress,

    #[error("update failed")]
    Failed,
}

impl TriggerError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::InProgress => StatusCode::CONFLICT,
            Self::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotConfigured => "master_not_configured",
            Self::InProgress => "sync_in_progress",
            Self::Failed => "update_error",
        }
    }

    const fn message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Invalid or missing secret.",
            Self::NotConfigured => "Remote authority URL or secret is not configured.",
            Self::InProgress => "A sync is already running; try again later.",
            Self::Failed => "The update could not be completed.",
        }
    }
}

impl From<Error> for TriggerError {
    fn from(err: Error) -> Self {
        match err {
            Error::Sync(SyncError::NotConfigured) => Self::NotConfigured,
            Error::Sync(SyncError::InProgress) => Self::InProgress,
            _ => Self::Failed,
        }
    }
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "message": self.message(),
            "code": self.code(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Constant-time secret check; an empty configured secret denies everything
fn authorized(configured: &str, supplied: Option<&str>) -> bool {
    match supplied {
        Some(supplied) if !configured.is_empty() => bool::from(configured.as_bytes().ct_eq(supplied.as_bytes())),
        _ => false,
    }
}

/// Loose boolean as sent by form posts and scripts
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        _ => false,
    }
}

async fn handle_trigger(
    State(state): State<TriggerState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    // Anything that is not a JSON object counts as an empty body
    let body: serde_json::Map<String, Value> = serde_json::from_slice(&body).unwrap_or_default();

    let supplied = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .or_else(|| body.get("secret").and_then(Value::as_str));
    let configured = state.config.snapshot().trigger.secret;
    if !authorized(&configured, supplied) {
        state
            .tx
            .emit_warning("Rejected trigger request with invalid or missing secret");
        return TriggerError::Unauthorized.into_response();
    }

    let check_only = body
        .get("check_only")
        .map(truthy)
        .or_else(|| query.get("check_only").map(|v| truthy(&Value::String(v.clone()))))
        .unwrap_or(false);

    match state.orchestrator.trigger(check_only).await {
        Ok(report) => {
            let status = match &report {
                TriggerReport::Bridge(r) if !r.success => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::OK,
            };
            (status, Json(report)).into_response()
        }
        Err(err) => {
            let err = TriggerError::from(err);
            if matches!(err, TriggerError::Failed) {
                state.tx.emit(AppEvent::Sync(SyncEvent::Failed {
                    failure: bridge_events::FailureContext::new(
                        Some(err.code()),
                        err.message(),
                        None::<String>,
                        false,
                    ),
                }));
            }
            err.into_response()
        }
    }
}
