use super::b64;
use crate::errors::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Role claim namespace carrying grants across all projects
pub const GENERIC_ROLE_CLAIM: &str = "urn:zitadel:iam:org:project:roles";

/// Role claim namespace carrying grants scoped to one project
pub fn project_role_claim(project_id: &str) -> String {
    format!("urn:zitadel:iam:org:project:{project_id}:roles")
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Malformed identity token: {0}")]
    Malformed(String),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::upstream(err.to_string())
    }
}

/// Normalized subject identity derived from provider claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider subject id
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: String,
    pub family_name: String,
    pub name: String,
    /// Role names from the provider's role claims, first-seen order
    pub roles: Vec<String>,
}

/// Cache key for a subject's identity
pub fn user_key(sub: &str) -> String {
    format!("user:{sub}")
}

/// Decode the payload of a JWT without verifying its signature.
///
/// Only for tokens that just crossed a TLS channel we opened to the
/// provider ourselves. Inbound bearer tokens go through the verifier.
pub fn decode_claims_unverified(token: &str) -> Result<Value, IdentityError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(IdentityError::Malformed(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };
    let bytes = b64::decode(payload).map_err(|err| IdentityError::Malformed(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| IdentityError::Malformed(err.to_string()))
}

/// Build an [`Identity`] from provider claims.
///
/// Roles are the union of the project-scoped claim and the generic
/// claim, in that order, deduplicated. Claim namespaces that are not
/// objects are ignored rather than failing the login.
pub fn extract_identity(claims: &Value, project_id: &str) -> Identity {
    let mut roles: Vec<String> = Vec::new();
    for namespace in [project_role_claim(project_id), GENERIC_ROLE_CLAIM.to_string()] {
        let Some(grants) = claims.get(&namespace).and_then(Value::as_object) else {
            continue;
        };
        for role in grants.keys() {
            if !roles.iter().any(|existing| existing == role) {
                roles.push(role.clone());
            }
        }
    }

    Identity {
        id: str_claim(claims, "sub"),
        user_name: str_claim(claims, "preferred_username"),
        email: str_claim(claims, "email"),
        email_verified: claims
            .get("email_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        given_name: str_claim(claims, "given_name"),
        family_name: str_claim(claims, "family_name"),
        name: str_claim(claims, "name"),
        roles,
    }
}

fn str_claim(claims: &Value, name: &str) -> String {
    claims
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROJECT: &str = "274088365";

    #[test]
    fn test_extract_identity_maps_profile_claims() {
        let claims = json!({
            "sub": "user-17",
            "preferred_username": "ada@example.test",
            "email": "ada@example.test",
            "email_verified": true,
            "given_name": "Ada",
            "family_name": "Lovelace",
            "name": "Ada Lovelace",
        });

        let identity = extract_identity(&claims, PROJECT);
        assert_eq!(identity.id, "user-17");
        assert_eq!(identity.user_name, "ada@example.test");
        assert!(identity.email_verified);
        assert_eq!(identity.name, "Ada Lovelace");
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn test_roles_union_project_namespace_first() {
        let claims = json!({
            "sub": "user-17",
            (project_role_claim(PROJECT)): {
                "admin": {"org-1": "example.test"},
                "auditor": {"org-1": "example.test"},
            },
            (GENERIC_ROLE_CLAIM): {
                "viewer": {"org-1": "example.test"},
                "admin": {"org-1": "example.test"},
            },
        });

        let identity = extract_identity(&claims, PROJECT);
        // project namespace first, then generic, duplicates dropped
        assert_eq!(identity.roles, vec!["admin", "auditor", "viewer"]);
    }

    #[test]
    fn test_malformed_role_namespace_is_ignored() {
        let claims = json!({
            "sub": "user-17",
            (project_role_claim(PROJECT)): "not-an-object",
            (GENERIC_ROLE_CLAIM): {"viewer": {}},
        });

        let identity = extract_identity(&claims, PROJECT);
        assert_eq!(identity.roles, vec!["viewer"]);
    }

    #[test]
    fn test_missing_claims_default_to_empty() {
        let identity = extract_identity(&json!({}), PROJECT);
        assert_eq!(identity.id, "");
        assert!(!identity.email_verified);
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn test_decode_claims_unverified_round_trip() {
        let payload = json!({"sub": "user-17", "email": "ada@example.test"});
        let token = format!(
            "{}.{}.{}",
            b64::encode(b"{\"alg\":\"RS256\"}"),
            b64::encode(payload.to_string().as_bytes()),
            b64::encode(b"signature")
        );

        let claims = decode_claims_unverified(&token).unwrap();
        assert_eq!(claims["sub"], "user-17");
    }

    #[test]
    fn test_decode_claims_rejects_wrong_segment_count() {
        assert!(decode_claims_unverified("only.two").is_err());
        assert!(decode_claims_unverified("a.b.c.d").is_err());
    }

    #[test]
    fn test_decode_claims_rejects_garbage_payload() {
        let token = format!("{}.{}.{}", b64::encode(b"{}"), "!!!not-base64!!!", b64::encode(b"s"));
        assert!(decode_claims_unverified(&token).is_err());
    }

    #[test]
    fn test_identity_wire_format_is_camel_case() {
        let identity = Identity {
            id: "user-17".to_string(),
            user_name: "ada".to_string(),
            email: "ada@example.test".to_string(),
            email_verified: true,
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            name: "Ada Lovelace".to_string(),
            roles: vec!["admin".to_string()],
        };
        let value = serde_json::to_value(&identity).unwrap();
        assert!(value.get("userName").is_some());
        assert!(value.get("emailVerified").is_some());
        assert!(value.get("givenName").is_some());
        assert!(value.get("user_name").is_none());
    }
}
