pub(crate) mod auth;
mod authn;
pub(crate) mod authz;
pub(crate) mod health;
pub(crate) mod resources;
pub(crate) mod roles;

use crate::api::authn::authentication_middleware;
use crate::state::AppState;
use axum::{middleware, Router};

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::public_router())
        .merge(protected_routes(state))
}

/// Routes that require a verified bearer token
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::profile_router())
        .merge(roles::router())
        .merge(resources::router(state))
        // The authentication layer runs before the per-route ABAC
        // guards, which rely on it for the current user
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ))
}
