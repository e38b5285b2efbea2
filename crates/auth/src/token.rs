//! Credential extraction and HS256 token verification.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use common::UserId;
use domain::{Identity, Role};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Rejection at the identity gate.
///
/// Deliberately detail-free: a missing credential and an invalid one are
/// the only observable outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was supplied.
    #[error("authentication required")]
    MissingCredential,

    /// The credential failed parsing, signature, or expiry checks.
    #[error("invalid credential")]
    InvalidCredential,
}

/// Claims carried in a verified token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's id.
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Role granted at issuance.
    #[serde(default)]
    pub role: Role,

    /// Expiry as a unix timestamp in seconds.
    pub exp: i64,
}

/// Extracts the raw credential from request header values.
///
/// The `Authorization: Bearer <token>` header takes precedence over a
/// `token` cookie when both are present.
pub fn extract_token<'a>(authorization: Option<&'a str>, cookie: Option<&'a str>) -> Option<&'a str> {
    if let Some(value) = authorization
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token);
    }

    cookie?
        .split(';')
        .map(str::trim)
        .find_map(|c| c.strip_prefix("token="))
}

/// Stateless HS256 token verifier.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    /// Creates a verifier for the deployment's signing secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies a token and yields the caller's identity.
    ///
    /// Any parse, signature, or expiry failure is `InvalidCredential`.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode(token).ok_or(AuthError::InvalidCredential)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::InvalidCredential);
        }

        let subject = Uuid::parse_str(&claims.user_id)
            .map(UserId::from_uuid)
            .map_err(|_| AuthError::InvalidCredential)?;

        Ok(Identity::new(subject, claims.role))
    }

    fn decode(&self, token: &str) -> Option<Claims> {
        let mut parts = token.split('.');
        let (header_b64, payload_b64, signature_b64) =
            (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).ok()?).ok()?;
        if header.get("alg")?.as_str()? != "HS256" {
            return None;
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key size");
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        mac.verify_slice(&signature).ok()?;

        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload_b64).ok()?).ok()
    }
}
