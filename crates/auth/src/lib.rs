//! Identity gate: validates a caller credential and yields an identity.
//!
//! Credentials are HS256 tokens carried in an `Authorization: Bearer`
//! header or a `token` cookie (header wins). Verification is a stateless
//! signature-plus-expiry check; no store lookup is made, and no failure
//! detail from parsing or cryptography ever crosses this boundary.

mod token;

pub use token::{AuthError, Claims, TokenVerifier, extract_token};
