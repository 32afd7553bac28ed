//! Compact self-contained bearer tokens.
//!
//! Wire format: `base64url(header).base64url(claims).base64url(signature)`
//! with no padding, where the signature is HMAC-SHA256 over the first two
//! segments. Verification is a pure function of the token and the secret;
//! revocation is layered on top by the session manager, never folded into
//! the token itself.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::users::Role;

type HmacSha256 = Hmac<Sha256>;

pub const REFRESH_TOKEN_TYPE: &str = "refresh";
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, Serialize)]
struct TokenHeader {
    alg: &'static str,
    typ: &'static str,
}

const HEADER: TokenHeader = TokenHeader { alg: "HMAC-SHA256", typ: "token" };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Issued-at, unix seconds. Stamped by `sign`.
    #[serde(default)]
    pub iat: i64,
    /// Expires-at, unix seconds. Stamped by `sign`.
    #[serde(default)]
    pub exp: i64,
    /// Unique token id. Stamped by `sign`.
    #[serde(default)]
    pub jti: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Claims {
    /// Access-token claims for a user; timestamps and jti are filled in by `sign`.
    pub fn for_user(id: i64, email: &str, username: &str, role: Role) -> Self {
        Self {
            sub: id,
            email: Some(email.to_string()),
            username: Some(username.to_string()),
            role: Some(role),
            iat: 0,
            exp: 0,
            jti: String::new(),
            token_type: None,
        }
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some(REFRESH_TOKEN_TYPE)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token secret is empty")]
    InvalidSecret,
    #[error("token encoding error: {0}")]
    Encode(String),
}

/// Sign claims into a three-segment token valid for `ttl_secs` from now.
///
/// Pure function of its inputs plus the clock and the fresh token id; no
/// external state is touched. A negative ttl produces an already-expired
/// token, which tests rely on.
pub fn sign(mut claims: Claims, secret: &str, ttl_secs: i64) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let now = Utc::now().timestamp();
    claims.iat = now;
    claims.exp = now + ttl_secs;
    claims.jti = Uuid::new_v4().to_string();

    let header_json = serde_json::to_vec(&HEADER).map_err(|e| TokenError::Encode(e.to_string()))?;
    let claims_json = serde_json::to_vec(&claims).map_err(|e| TokenError::Encode(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TokenError::Encode(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

/// Convenience wrapper producing a 7-day refresh token that carries only
/// the subject and the `type` discriminator.
pub fn sign_refresh(user_id: i64, secret: &str) -> Result<String, TokenError> {
    let claims = Claims {
        sub: user_id,
        email: None,
        username: None,
        role: None,
        iat: 0,
        exp: 0,
        jti: String::new(),
        token_type: Some(REFRESH_TOKEN_TYPE.to_string()),
    };
    sign(claims, secret, REFRESH_TOKEN_TTL_SECS)
}

/// Verify a token and return its claims.
///
/// Fails closed: any structural problem, signature mismatch, or expiry
/// yields `None`. The blacklist is deliberately not consulted here; that
/// is the session layer's responsibility.
pub fn verify(token: &str, secret: &str) -> Option<Claims> {
    if secret.is_empty() {
        return None;
    }

    let mut segments = token.split('.');
    let (header, claims, signature) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => return None,
        };

    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let signing_input = format!("{}.{}", header, claims);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(signing_input.as_bytes());
    // Constant-time comparison
    mac.verify_slice(&signature).ok()?;

    let claims_json = URL_SAFE_NO_PAD.decode(claims).ok()?;
    let claims: Claims = serde_json::from_slice(&claims_json).ok()?;

    if claims.exp < Utc::now().timestamp() {
        return None;
    }

    Some(claims)
}
