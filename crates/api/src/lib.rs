//! HTTP API server for the order-payment transaction core.
//!
//! Exposes order creation and retrieval plus the two payment endpoints,
//! with structured logging (tracing) and Prometheus metrics. Every
//! authenticated route runs the identity gate before touching state.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use auth::TokenVerifier;
use axum::Router;
use axum::routing::{get, post};
use checkout::{InMemoryGateway, OrderService, PaymentService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/payments/create-order", post(routes::payments::create::<S>))
        .route("/payments/verify", post(routes::payments::verify::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given store, with the
/// in-memory gateway.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let orders = OrderService::new(store.clone());
    let payments = PaymentService::new(store, InMemoryGateway::new(), config.payment_config());
    let verifier = TokenVerifier::new(config.jwt_secret.clone());

    Arc::new(AppState {
        orders,
        payments,
        verifier,
    })
}
