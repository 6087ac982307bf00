use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/healthy", get(healthy_handler))
        .route("/ready", get(ready_handler))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ComponentStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ReadinessReport {
    pub status: ComponentStatus,
    pub cache: ComponentStatus,
    pub permissions: ComponentStatus,
}

#[utoipa::path(
    get,
    path = "/healthy",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "The process is up"),
    )
)]
pub(super) async fn healthy_handler() -> Response {
    Json(serde_json::json!({"status": "ok"})).into_response()
}

#[utoipa::path(
    get,
    path = "/ready",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "All backends are reachable", body = ReadinessReport),
        (status = 503, description = "A backend is unreachable", body = ReadinessReport),
    )
)]
pub(super) async fn ready_handler(State(state): State<AppState>) -> Response {
    let report = state.health_check().await;

    let to_status = |result: &Result<(), String>| match result {
        Ok(()) => ComponentStatus::Ok,
        Err(_) => ComponentStatus::Error,
    };
    let body = ReadinessReport {
        status: if report.is_healthy() {
            ComponentStatus::Ok
        } else {
            ComponentStatus::Error
        },
        cache: to_status(&report.cache),
        permissions: to_status(&report.permissions),
    };

    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}
