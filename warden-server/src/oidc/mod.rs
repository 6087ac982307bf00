//! OIDC authentication exchange against the identity provider.
//!
//! The flow is authorization code with PKCE and a `private_key_jwt`
//! client assertion: [`pkce`] keeps the per-login verifier material,
//! [`assertion`] signs the client authentication JWT, [`exchange`]
//! redeems the authorization code, [`identity`] normalizes the id_token
//! claims and [`verifier`] checks inbound bearer tokens against the
//! provider's JWKS.

pub mod assertion;
pub mod exchange;
pub mod identity;
pub mod pkce;
pub mod verifier;

pub(crate) mod b64 {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    pub fn encode(input: impl AsRef<[u8]>) -> String {
        URL_SAFE_NO_PAD.encode(input)
    }

    pub fn decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE_NO_PAD.decode(input)
    }
}

/// Generate `len` random bytes, base64url-encoded without padding.
pub(crate) fn random_token(len: usize) -> String {
    use rand::RngCore;

    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    b64::encode(&bytes)
}
