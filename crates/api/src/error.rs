//! API error types with HTTP response mapping.

use auth::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No valid credential was presented.
    Unauthenticated(AuthError),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout service error.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        CheckoutError::Validation(_)
        | CheckoutError::AmountMismatch { .. }
        | CheckoutError::VerificationFailed => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::ProductNotFound(_) | CheckoutError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CheckoutError::InsufficientStock { .. } | CheckoutError::Conflict(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        CheckoutError::GatewayUnavailable(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        CheckoutError::Store { .. } | CheckoutError::Internal(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthenticated(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
