//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;

use auth::TokenVerifier;
use axum::http::{HeaderMap, header};
use domain::Identity;

use crate::error::ApiError;

/// Runs the identity gate on a request's headers.
///
/// The `Authorization: Bearer` header takes precedence over the `token`
/// cookie. Every authenticated handler calls this before anything else.
pub(crate) fn authenticate(
    headers: &HeaderMap,
    verifier: &TokenVerifier,
) -> Result<Identity, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());

    let token =
        auth::extract_token(authorization, cookie).ok_or(auth::AuthError::MissingCredential)?;
    Ok(verifier.verify(token)?)
}
