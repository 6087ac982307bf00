use crate::errors::ApiError;
use crate::openapi::ROLES_TAG;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use log::info;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles_handler).post(upsert_role_handler))
        .route("/roles/{role}", get(get_role_handler).delete(delete_role_handler))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RolesList {
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RoleView {
    pub role: String,
    /// Permission strings in "resource:action|action" form
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RoleUpsert {
    pub role: String,
    pub permissions: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/roles",
    tag = ROLES_TAG,
    responses(
        (status = 200, description = "All role names in the permission document", body = RolesList),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn list_roles_handler(State(state): State<AppState>) -> Response {
    match state.permissions.list_roles().await {
        Ok(roles) => Json(RolesList { roles }).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/roles/{role}",
    tag = ROLES_TAG,
    params(("role" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "The role and its permissions", body = RoleView),
        (status = 404, description = "No such role"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn get_role_handler(State(state): State<AppState>, Path(role): Path<String>) -> Response {
    let known = match state.permissions.list_roles().await {
        Ok(roles) => roles,
        Err(err) => return ApiError::from(err).into_response(),
    };
    if !known.contains(&role) {
        return ApiError::not_found(format!("No such role: {role}")).into_response();
    }

    match state.permissions.role_permissions(&role).await {
        Ok(permissions) => Json(RoleView { role, permissions }).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = ROLES_TAG,
    request_body = RoleUpsert,
    responses(
        (status = 204, description = "Role created or replaced"),
        (status = 400, description = "Empty role name"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn upsert_role_handler(
    State(state): State<AppState>,
    Json(body): Json<RoleUpsert>,
) -> Response {
    if body.role.trim().is_empty() {
        return ApiError::validation("Role name must not be empty").into_response();
    }

    match state.permissions.add_role(&body.role, body.permissions).await {
        Ok(()) => {
            info!("Stored role {}", body.role);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/roles/{role}",
    tag = ROLES_TAG,
    params(("role" = String, Path, description = "Role name")),
    responses(
        (status = 204, description = "Role removed"),
        (status = 404, description = "No such role"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn delete_role_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Response {
    match state.permissions.remove_role(&role).await {
        Ok(true) => {
            info!("Removed role {role}");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => ApiError::not_found(format!("No such role: {role}")).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mint_access_token, TestFixture};
    use abac_engine::PermissionStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_roles_require_authentication() {
        let fixture = TestFixture::new().await;
        let response = fixture.get("/roles").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_roles_returns_document_roles() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let response = fixture.get_with_token("/roles", &token).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["roles"], json!(["admin", "viewer"]));
    }

    #[tokio::test]
    async fn test_get_role_returns_permissions() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let response = fixture.get_with_token("/roles/viewer", &token).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["role"], "viewer");
        assert_eq!(response.json["permissions"], json!(["report:read"]));
    }

    #[tokio::test]
    async fn test_get_unknown_role_is_404() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let response = fixture.get_with_token("/roles/ghost", &token).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_upsert_replaces_permissions() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let body = json!({"role": "viewer", "permissions": ["report:read", "dashboard:read"]});
        let response = fixture.post_json_with_token("/roles", &body, &token).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let response = fixture.get_with_token("/roles/viewer", &token).await;
        assert_eq!(response.json["permissions"], json!(["report:read", "dashboard:read"]));
    }

    #[tokio::test]
    async fn test_upsert_creates_new_role() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let body = json!({"role": "auditor", "permissions": ["report:read"]});
        let response = fixture.post_json_with_token("/roles", &body, &token).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let response = fixture.get_with_token("/roles", &token).await;
        assert_eq!(response.json["roles"], json!(["admin", "auditor", "viewer"]));
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_role_name() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let body = json!({"role": "  ", "permissions": []});
        let response = fixture.post_json_with_token("/roles", &body, &token).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_delete_role_round_trip() {
        let fixture = TestFixture::new().await;
        let token = mint_access_token(&fixture.settings.oidc.issuer, "admin-1", &["admin"]);

        let response = fixture.delete_with_token("/roles/viewer", &token).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let response = fixture.get_with_token("/roles/viewer", &token).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = fixture.delete_with_token("/roles/viewer", &token).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let remaining = fixture.permissions.list_roles().await.unwrap();
        assert_eq!(remaining, vec!["admin"]);
    }
}
