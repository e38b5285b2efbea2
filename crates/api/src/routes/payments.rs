//! Payment session and verification endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use domain::Money;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::authenticate;
use crate::routes::orders::{AppState, OrderResponse, parse_order_id};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: String,
    /// Amount the client expects to settle, in minor units. Must equal
    /// the order total.
    pub amount: Money,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
}

// -- Handlers --

/// POST /payments/create-order — open a gateway payment session.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, ApiError> {
    let identity = authenticate(&headers, &state.verifier)?;
    let order_id = parse_order_id(&req.order_id)?;

    let opened = state
        .payments
        .open_payment(identity, order_id, req.amount)
        .await?;

    Ok(Json(CreatePaymentResponse {
        gateway_order_id: opened.gateway_order_id,
        amount: opened.amount.minor(),
        currency: opened.currency,
    }))
}

/// POST /payments/verify — reconcile the signed gateway callback.
#[tracing::instrument(skip(state, headers, req))]
pub async fn verify<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let identity = authenticate(&headers, &state.verifier)?;
    let order_id = parse_order_id(&req.order_id)?;

    let order = state
        .payments
        .verify_payment(
            identity,
            order_id,
            &req.gateway_order_id,
            &req.gateway_payment_id,
            &req.signature,
        )
        .await?;

    Ok(Json(order.into()))
}
