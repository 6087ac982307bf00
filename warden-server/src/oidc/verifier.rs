use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Floor between JWKS fetches, so unknown kids cannot turn into a
/// request flood against the provider
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Token header is missing a key id")]
    MissingKeyId,

    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("No signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetch(String),
}

struct CachedJwks {
    set: JwkSet,
    fetched_at: Instant,
}

/// Verifies inbound RS256 bearer tokens against the provider's JWKS.
///
/// The key set is cached for `cache_ttl`. A token signed by a key we do
/// not know triggers one rate-limited refresh to pick up rotated keys.
pub struct JwtVerifier {
    http: Client,
    jwks_url: String,
    issuer: String,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    jwks: RwLock<Option<CachedJwks>>,
}

impl JwtVerifier {
    pub fn new(http: Client, jwks_url: impl Into<String>, issuer: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            http,
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            cache_ttl,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            jwks: RwLock::new(None),
        }
    }

    #[cfg(test)]
    fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Verify a bearer token and return its claims.
    ///
    /// Checks signature, expiry and issuer. The audience is not pinned
    /// because provider access tokens list project and client audiences
    /// we do not control.
    pub async fn verify(&self, token: &str) -> Result<Value, VerifyError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::UnsupportedAlgorithm);
        }
        let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;

        let jwks = self.current_jwks().await?;
        let key = match find_key(&jwks, &kid) {
            Some(jwk) => DecodingKey::from_jwk(jwk)?,
            None => {
                // The provider may have rotated its keys under us
                let refreshed = self.refresh_jwks().await?;
                let jwk = find_key(&refreshed, &kid).ok_or_else(|| VerifyError::UnknownKey(kid.clone()))?;
                DecodingKey::from_jwk(jwk)?
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_aud = false;
        let data = decode::<Value>(token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn current_jwks(&self) -> Result<JwkSet, VerifyError> {
        {
            let guard = self.jwks.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(cached.set.clone());
                }
            }
        }
        self.refresh_jwks().await
    }

    async fn refresh_jwks(&self) -> Result<JwkSet, VerifyError> {
        let mut guard = self.jwks.write().await;
        // A concurrent caller may have refreshed while we waited for the
        // lock; the same check keeps kid-miss refreshes rate limited
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.min_refresh_interval {
                return Ok(cached.set.clone());
            }
        }

        debug!("Fetching JWKS from {}", self.jwks_url);
        let set = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|err| VerifyError::JwksFetch(err.to_string()))?
            .error_for_status()
            .map_err(|err| VerifyError::JwksFetch(err.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|err| VerifyError::JwksFetch(err.to_string()))?;

        *guard = Some(CachedJwks {
            set: set.clone(),
            fetched_at: Instant::now(),
        });
        Ok(set)
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys.iter().find(|key| key.common.key_id.as_deref() == Some(kid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{jwks_document, mint_token, mint_token_with_header, TEST_KEY_ID};
    use jsonwebtoken::Header;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JWKS_PATH: &str = "/oauth/v2/keys";

    async fn mount_jwks(server: &MockServer, body: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn verifier_for(server: &MockServer) -> JwtVerifier {
        JwtVerifier::new(
            Client::new(),
            format!("{}{JWKS_PATH}", server.uri()),
            server.uri(),
            Duration::from_secs(600),
        )
    }

    fn standard_claims(issuer: &str) -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": issuer,
            "sub": "user-17",
            "iat": now,
            "exp": now + 300,
        })
    }

    #[tokio::test]
    async fn test_verify_accepts_valid_token() {
        let server = MockServer::start().await;
        mount_jwks(&server, jwks_document(), 1).await;

        let verifier = verifier_for(&server);
        let token = mint_token(&standard_claims(&server.uri()));
        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims["sub"], "user-17");
    }

    #[tokio::test]
    async fn test_jwks_is_cached_between_verifications() {
        let server = MockServer::start().await;
        mount_jwks(&server, jwks_document(), 1).await;

        let verifier = verifier_for(&server);
        let token = mint_token(&standard_claims(&server.uri()));
        verifier.verify(&token).await.unwrap();
        verifier.verify(&token).await.unwrap();
        // the mock's expect(1) fails the test if a second fetch happened
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_issuer() {
        let server = MockServer::start().await;
        mount_jwks(&server, jwks_document(), 1).await;

        let verifier = verifier_for(&server);
        let token = mint_token(&standard_claims("https://somebody-else.example"));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::Jwt(_)));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let server = MockServer::start().await;
        mount_jwks(&server, jwks_document(), 1).await;

        let now = chrono::Utc::now().timestamp();
        let claims = json!({
            "iss": server.uri(),
            "sub": "user-17",
            "iat": now - 7200,
            "exp": now - 3600,
        });

        let verifier = verifier_for(&server);
        let err = verifier.verify(&mint_token(&claims)).await.unwrap_err();
        assert!(matches!(err, VerifyError::Jwt(_)));
    }

    #[tokio::test]
    async fn test_verify_rejects_symmetric_algorithm() {
        let server = MockServer::start().await;
        mount_jwks(&server, jwks_document(), 0).await;

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(TEST_KEY_ID.to_string());
        let token = jsonwebtoken::encode(
            &header,
            &standard_claims(&server.uri()),
            &jsonwebtoken::EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();

        let verifier = verifier_for(&server);
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedAlgorithm));
    }

    #[tokio::test]
    async fn test_verify_requires_key_id() {
        let server = MockServer::start().await;
        mount_jwks(&server, jwks_document(), 0).await;

        let token = mint_token_with_header(Header::new(Algorithm::RS256), &standard_claims(&server.uri()));
        let verifier = verifier_for(&server);
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::MissingKeyId));
    }

    #[tokio::test]
    async fn test_unknown_kid_refresh_is_rate_limited() {
        let server = MockServer::start().await;
        // one fetch only: the kid-miss refresh lands inside the floor
        // and reuses the cached set instead of fetching again
        mount_jwks(&server, json!({"keys": []}), 1).await;

        let verifier = verifier_for(&server);
        let token = mint_token(&standard_claims(&server.uri()));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::UnknownKey(_)));
    }

    #[tokio::test]
    async fn test_key_rotation_triggers_refresh() {
        let server = MockServer::start().await;
        // first fetch sees a stale key set, the kid-miss refresh sees
        // the rotated one
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": []})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_jwks(&server, jwks_document(), 1).await;

        let verifier = verifier_for(&server).with_min_refresh_interval(Duration::ZERO);
        let token = mint_token(&standard_claims(&server.uri()));
        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims["sub"], "user-17");
    }

    #[tokio::test]
    async fn test_jwks_endpoint_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let verifier = verifier_for(&server);
        let token = mint_token(&standard_claims(&server.uri()));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::JwksFetch(_)));
    }
}
