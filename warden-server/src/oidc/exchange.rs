use crate::config::OidcConfig;
use crate::errors::ApiError;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The provider answered with a non-2xx status
    #[error("Token exchange rejected ({status}): {error}")]
    Provider {
        status: u16,
        error: String,
        description: Option<String>,
    },

    /// The provider could not be reached
    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered 2xx with a body we cannot use
    #[error("Malformed provider response: {0}")]
    Decode(String),
}

impl ExchangeError {
    /// The most specific message the provider gave us.
    pub fn provider_message(&self) -> String {
        match self {
            ExchangeError::Provider {
                error, description, ..
            } => description.clone().unwrap_or_else(|| error.clone()),
            other => other.to_string(),
        }
    }
}

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        match &err {
            ExchangeError::Provider { .. } => ApiError::exchange_failed(err.provider_message()),
            ExchangeError::Transport(_) | ExchangeError::Decode(_) => ApiError::upstream(err.to_string()),
        }
    }
}

/// Successful token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Redeems authorization codes and fetches userinfo claims.
pub struct TokenExchanger {
    http: Client,
    token_url: String,
    userinfo_url: String,
    client_id: String,
    redirect_uri: String,
}

impl TokenExchanger {
    pub fn new(http: Client, config: &OidcConfig) -> Self {
        Self {
            http,
            token_url: config.token_endpoint(),
            userinfo_url: config.userinfo_endpoint(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Redeem an authorization code for tokens.
    ///
    /// One attempt, no retries: the provider invalidates the code on
    /// first use, so retrying can only produce confusing errors.
    pub async fn exchange(
        &self,
        code: &str,
        code_verifier: &str,
        client_assertion: &str,
    ) -> Result<TokenResponse, ExchangeError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", client_assertion),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];

        debug!("Redeeming authorization code at {}", self.token_url);
        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (error, description) = match serde_json::from_str::<ProviderErrorBody>(&text) {
                Ok(body) if !body.error.is_empty() => (body.error, body.error_description),
                _ => (
                    if text.is_empty() {
                        status.to_string()
                    } else {
                        text
                    },
                    None,
                ),
            };
            error!("Token exchange rejected with {status}: {error}");
            return Err(ExchangeError::Provider {
                status: status.as_u16(),
                error,
                description,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|err| ExchangeError::Decode(err.to_string()))
    }

    /// Fetch the userinfo claims for an access token.
    pub async fn userinfo(&self, access_token: &str) -> Result<serde_json::Value, ExchangeError> {
        debug!("Fetching userinfo from {}", self.userinfo_url);
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Provider {
                status: status.as_u16(),
                error: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
                description: None,
            });
        }

        response
            .json()
            .await
            .map_err(|err| ExchangeError::Decode(err.to_string()))
    }
}
