use crate::api::authn::CurrentUser;
use crate::errors::ApiError;
use crate::state::AppState;
use abac_engine::{AccessRequest, ResourceRef, RuleSet};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Extension;
use log::{debug, error};

/// Action and resource a guarded route declares for its access check
#[derive(Debug, Clone)]
pub(crate) struct AbacMeta {
    pub action: String,
    pub resource: ResourceRef,
}

impl AbacMeta {
    pub fn new(action: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            action: action.into(),
            resource,
        }
    }
}

/// Attach an access check to a method router.
///
/// The meta extension is layered outside the guard so the guard can see
/// it when the request passes through.
pub(crate) fn guarded(
    state: &AppState,
    meta: AbacMeta,
    routes: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    routes
        .layer::<_, std::convert::Infallible>(middleware::from_fn_with_state(state.clone(), abac_guard))
        .layer(Extension(meta))
}

/// Middleware enforcing the declared action and resource against the
/// current user's compiled rules.
///
/// A guarded route without a usable meta declaration is a server bug
/// and fails closed with a 500, never an allow.
pub(crate) async fn abac_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(user) = request.extensions().get::<CurrentUser>().cloned() else {
        return ApiError::unauthorized("Authentication required").into_response();
    };

    let meta = match request.extensions().get::<AbacMeta>() {
        Some(meta) if !meta.action.is_empty() && !meta.resource.resource_type.is_empty() => meta.clone(),
        _ => {
            let detail = format!(
                "Missing ABAC meta for {} {}",
                request.method(),
                request.uri().path()
            );
            error!("{detail}");
            return ApiError::abac_meta_missing(detail).into_response();
        }
    };

    let rules = match RuleSet::compile(&user.0.roles, state.permissions.as_ref(), &state.catalog).await {
        Ok(rules) => rules,
        Err(err) => {
            error!("Failed to compile access rules: {err}");
            return ApiError::from(err).into_response();
        }
    };

    let access = AccessRequest::new(meta.action.clone(), meta.resource.clone());
    if !rules.can(&access) {
        debug!(
            "Denied {} on {} for subject {}",
            meta.action, meta.resource.resource_type, user.0.id
        );
        return ApiError::forbidden(format!(
            "Access denied for {} on {}",
            meta.action, meta.resource.resource_type
        ))
        .into_response();
    }

    next.run(request).await
}
