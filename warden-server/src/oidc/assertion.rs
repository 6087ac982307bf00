use super::random_token;
use crate::config::OidcConfig;
use crate::errors::ApiError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest client assertion lifetime the signer accepts, in seconds
pub const MAX_ASSERTION_TTL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum AssertionError {
    /// Neither a key file nor inline key material is configured
    #[error("Client assertion key material is not configured")]
    MissingKeyMaterial,

    /// The configured RSA key could not be parsed
    #[error("Invalid client assertion key: {0}")]
    InvalidKey(String),

    /// The configured lifetime exceeds the hard cap
    #[error("Assertion TTL {0}s exceeds the {MAX_ASSERTION_TTL_SECS}s limit")]
    TtlTooLong(u64),

    /// The key file could not be read
    #[error("Failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },

    /// The key file is not a provider application key document
    #[error("Malformed key file {path}: {detail}")]
    KeyFileFormat { path: String, detail: String },

    /// Signing failed
    #[error("Failed to sign client assertion: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

impl From<AssertionError> for ApiError {
    fn from(err: AssertionError) -> Self {
        ApiError::configuration(err.to_string())
    }
}

/// Claims of a `private_key_jwt` client assertion
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Application key document as the provider console exports it
#[derive(Debug, Deserialize)]
struct ProviderAppKey {
    #[serde(rename = "keyId")]
    key_id: String,
    key: String,
}

struct SigningMaterial {
    pem: String,
    key_id: String,
}

fn load_signing_material(config: &OidcConfig) -> Result<SigningMaterial, AssertionError> {
    if !config.key_file.is_empty() {
        let raw = std::fs::read_to_string(&config.key_file).map_err(|source| AssertionError::KeyFile {
            path: config.key_file.clone(),
            source,
        })?;
        let app_key: ProviderAppKey =
            serde_json::from_str(&raw).map_err(|err| AssertionError::KeyFileFormat {
                path: config.key_file.clone(),
                detail: err.to_string(),
            })?;
        return Ok(SigningMaterial {
            pem: app_key.key,
            key_id: app_key.key_id,
        });
    }

    if config.assertion_key.is_empty() {
        return Err(AssertionError::MissingKeyMaterial);
    }
    Ok(SigningMaterial {
        pem: config.assertion_key.clone(),
        key_id: config.assertion_kid.clone(),
    })
}

/// Signs `private_key_jwt` client assertions for the token endpoint.
///
/// The key material is parsed once at construction so a bad key fails
/// the boot instead of the first login.
pub struct ClientAssertionSigner {
    key: EncodingKey,
    key_id: String,
    client_id: String,
    audience: String,
    ttl_secs: u64,
}

// EncodingKey holds zeroized key material and has no Debug impl, so
// this cannot be derived
impl std::fmt::Debug for ClientAssertionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAssertionSigner").finish_non_exhaustive()
    }
}

impl ClientAssertionSigner {
    pub fn from_config(config: &OidcConfig) -> Result<Self, AssertionError> {
        if config.assertion_ttl > MAX_ASSERTION_TTL_SECS {
            return Err(AssertionError::TtlTooLong(config.assertion_ttl));
        }

        let material = load_signing_material(config)?;
        let key = EncodingKey::from_rsa_pem(material.pem.as_bytes())
            .map_err(|err| AssertionError::InvalidKey(err.to_string()))?;

        Ok(Self {
            key,
            key_id: material.key_id,
            client_id: config.client_id.clone(),
            audience: config.issuer.clone(),
            ttl_secs: config.assertion_ttl,
        })
    }

    /// Sign a fresh assertion. Each call carries a new `jti` so the
    /// provider can reject replays.
    pub fn sign(&self) -> Result<String, AssertionError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.client_id.clone(),
            sub: self.client_id.clone(),
            aud: self.audience.clone(),
            iat,
            exp: iat + self.ttl_secs as i64,
            jti: random_token(16),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        Ok(encode(&header, &claims, &self.key)?)
    }
}
