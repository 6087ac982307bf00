use utoipa::OpenApi;

pub(crate) const AUTH_TAG: &str = "Authentication API";
pub(crate) const ROLES_TAG: &str = "Role Administration API";
pub(crate) const RESOURCES_TAG: &str = "Guarded Resources API";
pub(crate) const HEALTH_TAG: &str = "Health API";

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = AUTH_TAG, description = "OIDC login, callback, logout and profile endpoints"),
        (name = ROLES_TAG, description = "Role permission document administration"),
        (name = RESOURCES_TAG, description = "Demo resources guarded by attribute checks"),
        (name = HEALTH_TAG, description = "Health and readiness endpoints"),
    ),
    info(
        title = "Warden API",
        description = "OIDC authentication exchange and attribute-based authorization service",
        version = "0.1.0",
    )
)]
pub(crate) struct ApiDoc;
