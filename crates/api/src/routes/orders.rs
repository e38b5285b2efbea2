//! Order endpoints.

use std::sync::Arc;

use auth::TokenVerifier;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use checkout::{CartLine, InMemoryGateway, OrderService, PaymentService};
use common::OrderId;
use domain::{Order, ShippingAddress};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::authenticate;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub payments: PaymentService<S, InMemoryGateway>,
    pub verifier: TokenVerifier,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: i64,
    pub payment_status: String,
    pub order_status: String,
    pub shipping_address: ShippingAddress,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: String,
    pub title: String,
    pub price: i64,
    pub quantity: u32,
    pub image: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    title: item.title,
                    price: item.price.minor(),
                    quantity: item.quantity,
                    image: item.image,
                })
                .collect(),
            total_amount: order.total_amount.minor(),
            payment_status: order.payment_status.to_string(),
            order_status: order.order_status.to_string(),
            shipping_address: order.shipping_address,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order from cart lines, reserving stock.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let identity = authenticate(&headers, &state.verifier)?;

    let order = state
        .orders
        .create_order(identity, req.items, req.shipping_address)
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — list the caller's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let identity = authenticate(&headers, &state.verifier)?;

    let orders = state.orders.list_orders(identity).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/:id — load one of the caller's orders.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let identity = authenticate(&headers, &state.verifier)?;
    let order_id = parse_order_id(&id)?;

    let order = state.orders.get_order(order_id, identity).await?;
    Ok(Json(order.into()))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
