use crate::cache::CacheBackend;
use crate::errors::ApiError;
use crate::oidc::identity::{extract_identity, user_key, Identity};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use log::{debug, warn};
use serde_json::Value;

/// The authenticated identity of the current request
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub Identity);

/// The raw bearer token the current request authenticated with
#[derive(Debug, Clone)]
pub(crate) struct BearerToken(pub String);

/// Middleware that requires a verified bearer token on every request.
///
/// The cached identity from the login exchange wins over claims derived
/// from the access token, because the id_token and userinfo carry
/// profile fields access tokens may lack.
pub(crate) async fn authentication_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return ApiError::unauthorized("Missing bearer token").into_response();
    };
    let token = token.to_string();

    let claims = match state.verifier.verify(&token).await {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Rejected bearer token: {err}");
            return ApiError::unauthorized("Invalid bearer token").into_response();
        }
    };

    let Some(sub) = claims.get("sub").and_then(Value::as_str) else {
        return ApiError::unauthorized("Token carries no subject").into_response();
    };

    let identity = match state.cache.get::<Identity>(&user_key(sub)).await {
        Ok(Some(identity)) => identity,
        Ok(None) => extract_identity(&claims, &state.config.oidc.project_id),
        Err(err) => {
            warn!("Identity cache lookup failed for {sub}: {err}");
            extract_identity(&claims, &state.config.oidc.project_id)
        }
    };

    request.extensions_mut().insert(BearerToken(token));
    request.extensions_mut().insert(CurrentUser(identity));
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
