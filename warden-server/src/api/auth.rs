use crate::api::authn::{BearerToken, CurrentUser};
use crate::cache::CacheBackend;
use crate::errors::ApiError;
use crate::oidc::identity::{decode_claims_unverified, extract_identity, user_key, Identity};
use crate::openapi::AUTH_TAG;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;
use utoipa::{IntoParams, ToSchema};

/// Login, callback and logout are reached by a browser without a token
pub(crate) fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/auth/logout", get(logout_handler))
}

/// Profile requires a verified bearer token
pub(crate) fn profile_router() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile_handler))
}

#[utoipa::path(
    get,
    path = "/auth/login",
    tag = AUTH_TAG,
    responses(
        (status = 303, description = "Redirect to the provider's authorization endpoint with PKCE parameters"),
        (status = 500, description = "Pending login could not be stored"),
    )
)]
pub(super) async fn login_handler(State(state): State<AppState>) -> Response {
    let attempt = match state.pkce.begin().await {
        Ok(attempt) => attempt,
        Err(err) => return ApiError::from(err).into_response(),
    };

    let mut url = match Url::parse(&state.config.oidc.authorize_endpoint()) {
        Ok(url) => url,
        Err(err) => {
            return ApiError::configuration(format!("Invalid authorization endpoint: {err}")).into_response()
        }
    };
    url.query_pairs_mut()
        .append_pair("client_id", &state.config.oidc.client_id)
        .append_pair("redirect_uri", &state.config.oidc.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &state.config.oidc.scope)
        .append_pair("code_challenge", &attempt.code_challenge)
        .append_pair("code_challenge_method", attempt.code_challenge_method)
        .append_pair("state", &attempt.state)
        .append_pair("prompt", "select_account");

    Redirect::to(url.as_str()).into_response()
}

#[derive(Debug, Deserialize, IntoParams)]
pub(super) struct CallbackParams {
    /// Authorization code issued by the provider
    code: Option<String>,
    /// State issued by the login endpoint
    state: Option<String>,
    /// Error code when the provider rejected the authorization
    error: Option<String>,
    error_description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = AUTH_TAG,
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to the frontend with the access token in the URL fragment"),
        (status = 400, description = "Unknown state, or the provider rejected the authorization"),
        (status = 502, description = "The provider could not be reached or answered garbage"),
    )
)]
pub(super) async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        // The attempt is dead either way, so burn the state before
        // reporting: a replayed callback must not find it
        if let Some(login_state) = params.state.as_deref() {
            let _ = state.pkce.consume(login_state).await;
        }
        let detail = params.error_description.unwrap_or(error);
        info!("Provider rejected the authorization: {detail}");
        return ApiError::exchange_failed(detail).into_response();
    }

    let Some(login_state) = params.state.as_deref() else {
        return ApiError::invalid_state("Missing state parameter").into_response();
    };
    let code_verifier = match state.pkce.consume(login_state).await {
        Ok(verifier) => verifier,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let Some(code) = params.code.as_deref() else {
        return ApiError::exchange_failed("Authorization response carried no code").into_response();
    };

    let assertion = match state.signer.sign() {
        Ok(assertion) => assertion,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let tokens = match state.exchanger.exchange(code, &code_verifier, &assertion).await {
        Ok(tokens) => tokens,
        Err(err) => return ApiError::from(err).into_response(),
    };

    // The id_token arrived over our own TLS connection to the provider,
    // so its claims are trusted without a signature check here
    let claims = match decode_claims_unverified(&tokens.id_token) {
        Ok(claims) => claims,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let identity = extract_identity(&claims, &state.config.oidc.project_id);
    if let Err(err) = state.cache.set(&user_key(&identity.id), &identity).await {
        warn!("Failed to cache identity for {}: {err}", identity.id);
    }
    info!("Completed login for subject {}", identity.id);

    let target = format!(
        "{}#access_token={}&token_type=Bearer&expires_in={}",
        state.config.oidc.frontend_redirect, tokens.access_token, tokens.expires_in
    );
    Redirect::to(&target).into_response()
}

#[utoipa::path(
    get,
    path = "/auth/logout",
    tag = AUTH_TAG,
    responses(
        (status = 303, description = "Redirect to the provider's end-session endpoint"),
    )
)]
pub(super) async fn logout_handler(State(state): State<AppState>) -> Response {
    let mut url = match Url::parse(&state.config.oidc.end_session_endpoint()) {
        Ok(url) => url,
        Err(err) => {
            return ApiError::configuration(format!("Invalid end-session endpoint: {err}")).into_response()
        }
    };
    url.query_pairs_mut()
        .append_pair("post_logout_redirect_uri", &state.config.oidc.post_logout_redirect)
        .append_pair("client_id", &state.config.oidc.client_id);

    Redirect::to(url.as_str()).into_response()
}

/// Subject profile plus the routes their roles open
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Profile {
    #[serde(flatten)]
    pub identity: Identity,
    pub route_permissions: HashMap<String, Vec<String>>,
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = AUTH_TAG,
    responses(
        (status = 200, description = "Profile of the authenticated subject", body = Profile),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = []))
)]
pub(super) async fn profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Extension(bearer): Extension<BearerToken>,
) -> Response {
    let mut identity = user.0;

    // Access tokens may carry no profile claims at all. When the cached
    // identity from the login exchange is gone, refill it from userinfo.
    if identity.user_name.is_empty() && identity.email.is_empty() {
        match state.exchanger.userinfo(&bearer.0).await {
            Ok(claims) => {
                let fresh = extract_identity(&claims, &state.config.oidc.project_id);
                if !fresh.id.is_empty() {
                    if let Err(err) = state.cache.set(&user_key(&fresh.id), &fresh).await {
                        warn!("Failed to cache identity for {}: {err}", fresh.id);
                    }
                    identity = fresh;
                }
            }
            Err(err) => warn!("Userinfo fetch failed, serving token claims: {err}"),
        }
    }

    let route_map = match state.permissions.route_map().await {
        Ok(map) => map,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let route_permissions = route_map
        .into_iter()
        .filter(|(_, roles)| roles.iter().any(|role| identity.roles.contains(role)))
        .collect();

    Json(Profile {
        identity,
        route_permissions,
    })
    .into_response()
}
