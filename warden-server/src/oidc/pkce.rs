use super::{b64, random_token};
use crate::cache::{Cache, CacheBackend, CacheError};
use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PkceError {
    /// The state is unknown, expired or was already redeemed
    #[error("Unknown or expired login state")]
    UnknownState,

    /// The pending login store failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<PkceError> for ApiError {
    fn from(err: PkceError) -> Self {
        match err {
            PkceError::UnknownState => ApiError::invalid_state(err.to_string()),
            PkceError::Cache(_) => ApiError::internal(err.to_string()),
        }
    }
}

/// Verifier material stored per login attempt, keyed by state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the login endpoint needs to redirect the browser
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: &'static str,
}

/// Compute the S256 code challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    b64::encode(Sha256::digest(verifier.as_bytes()))
}

/// Creates and redeems PKCE login attempts.
///
/// The verifier never leaves the server. It is stored under the state in
/// a TTL-bounded cache and can be redeemed exactly once, so a replayed
/// callback loses even when it races the original.
pub struct PkceManager {
    cache: Cache,
}

impl PkceManager {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Start a login attempt: generate the verifier, challenge and state,
    /// and remember the verifier under the state.
    pub async fn begin(&self) -> Result<LoginAttempt, PkceError> {
        let code_verifier = random_token(32);
        let code_challenge = code_challenge(&code_verifier);
        let state = random_token(16);

        let pending = PendingLogin {
            code_verifier: code_verifier.clone(),
            created_at: Utc::now(),
        };
        self.cache.set(&login_key(&state), &pending).await?;
        debug!("Stored pending login for state {state}");

        Ok(LoginAttempt {
            state,
            code_verifier,
            code_challenge,
            code_challenge_method: "S256",
        })
    }

    /// Redeem a state for its verifier, removing it in the same step.
    pub async fn consume(&self, state: &str) -> Result<String, PkceError> {
        let pending: Option<PendingLogin> = self.cache.take(&login_key(state)).await?;
        match pending {
            Some(pending) => {
                debug!("Redeemed login state {state}");
                Ok(pending.code_verifier)
            }
            None => Err(PkceError::UnknownState),
        }
    }
}

fn login_key(state: &str) -> String {
    format!("login:{state}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use std::sync::Arc;

    fn manager_with_ttl(ttl_secs: u64) -> PkceManager {
        PkceManager::new(Cache::InMemory(InMemoryCache::new(ttl_secs, 16).unwrap()))
    }

    #[test]
    fn test_code_challenge_rfc7636_vector() {
        // Appendix B of RFC 7636
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[tokio::test]
    async fn test_begin_generates_urlsafe_material() {
        let manager = manager_with_ttl(60);
        let attempt = manager.begin().await.unwrap();

        assert_eq!(crate::oidc::b64::decode(&attempt.code_verifier).unwrap().len(), 32);
        assert_eq!(crate::oidc::b64::decode(&attempt.state).unwrap().len(), 16);
        assert_eq!(attempt.code_challenge, code_challenge(&attempt.code_verifier));
        assert_eq!(attempt.code_challenge_method, "S256");
    }

    #[tokio::test]
    async fn test_consume_returns_verifier_exactly_once() {
        let manager = manager_with_ttl(60);
        let attempt = manager.begin().await.unwrap();

        let verifier = manager.consume(&attempt.state).await.unwrap();
        assert_eq!(verifier, attempt.code_verifier);

        let replay = manager.consume(&attempt.state).await;
        assert!(matches!(replay, Err(PkceError::UnknownState)));
    }

    #[tokio::test]
    async fn test_consume_unknown_state() {
        let manager = manager_with_ttl(60);
        let result = manager.consume("never-issued").await;
        assert!(matches!(result, Err(PkceError::UnknownState)));
    }

    #[tokio::test]
    async fn test_pending_login_expires() {
        let manager = manager_with_ttl(1);
        let attempt = manager.begin().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        let result = manager.consume(&attempt.state).await;
        assert!(matches!(result, Err(PkceError::UnknownState)));
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let manager = Arc::new(manager_with_ttl(60));
        let attempt = manager.begin().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let state = attempt.state.clone();
            handles.push(tokio::spawn(async move { manager.consume(&state).await }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one callback should redeem the state");
    }

    #[tokio::test]
    async fn test_distinct_attempts_do_not_collide() {
        let manager = manager_with_ttl(60);
        let first = manager.begin().await.unwrap();
        let second = manager.begin().await.unwrap();
        assert_ne!(first.state, second.state);

        assert_eq!(manager.consume(&second.state).await.unwrap(), second.code_verifier);
        assert_eq!(manager.consume(&first.state).await.unwrap(), first.code_verifier);
    }
}
