use crate::api::authn::CurrentUser;
use crate::api::authz::{guarded, AbacMeta};
use crate::openapi::RESOURCES_TAG;
use crate::state::AppState;
use abac_engine::ResourceRef;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

/// Demo resources showing the two shapes of access checks: instance
/// scoped (dashboard, room) and coarse by resource type (reports).
pub(crate) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/dashboard",
            guarded(
                state,
                AbacMeta::new("read", ResourceRef::instance("dashboard", "dashboard-1")),
                get(read_dashboard),
            )
            .merge(guarded(
                state,
                AbacMeta::new("write", ResourceRef::instance("dashboard", "dashboard-1")),
                post(write_dashboard),
            )),
        )
        .route(
            "/room",
            guarded(
                state,
                AbacMeta::new("read", ResourceRef::instance("room", "room-1")),
                get(read_room),
            ),
        )
        .route(
            "/reports",
            guarded(state, AbacMeta::new("read", ResourceRef::of("report")), get(read_reports)),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ResourceView {
    pub resource: String,
    pub action: String,
    pub subject: String,
}

impl ResourceView {
    fn new(resource: &str, action: &str, user: &CurrentUser) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            subject: user.0.id.clone(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = RESOURCES_TAG,
    responses(
        (status = 200, description = "The subject may read dashboard-1", body = ResourceView),
        (status = 403, description = "No rule covers reading dashboard-1"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn read_dashboard(Extension(user): Extension<CurrentUser>) -> Json<ResourceView> {
    Json(ResourceView::new("dashboard-1", "read", &user))
}

#[utoipa::path(
    post,
    path = "/dashboard",
    tag = RESOURCES_TAG,
    responses(
        (status = 200, description = "The subject may write dashboard-1", body = ResourceView),
        (status = 403, description = "No rule covers writing dashboard-1"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn write_dashboard(Extension(user): Extension<CurrentUser>) -> Json<ResourceView> {
    Json(ResourceView::new("dashboard-1", "write", &user))
}

#[utoipa::path(
    get,
    path = "/room",
    tag = RESOURCES_TAG,
    responses(
        (status = 200, description = "The subject may read room-1", body = ResourceView),
        (status = 403, description = "No rule covers reading room-1"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn read_room(Extension(user): Extension<CurrentUser>) -> Json<ResourceView> {
    Json(ResourceView::new("room-1", "read", &user))
}

#[utoipa::path(
    get,
    path = "/reports",
    tag = RESOURCES_TAG,
    responses(
        (status = 200, description = "The subject may read reports", body = ResourceView),
        (status = 403, description = "No rule covers reading reports"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn read_reports(Extension(user): Extension<CurrentUser>) -> Json<ResourceView> {
    Json(ResourceView::new("reports", "read", &user))
}
