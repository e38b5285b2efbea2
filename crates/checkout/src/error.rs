//! Checkout error taxonomy.

use common::OrderId;
use domain::{DomainError, Money, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the checkout services.
///
/// Authorization and validation failures are detected at each operation's
/// boundary; store and gateway failures carry the operation name for
/// correlation but never signature material or the gateway secret.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The caller does not own the order.
    #[error("order {0} does not belong to the caller")]
    Forbidden(OrderId),

    /// A request failed domain validation.
    #[error("validation failed: {0}")]
    Validation(DomainError),

    /// A cart line referenced an unknown product.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Stock was insufficient for a cart line.
    #[error("insufficient stock for {product_id}: {available} available")]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
    },

    /// The requested settlement amount does not match the order total.
    #[error("amount mismatch: order total is {expected}, requested {supplied}")]
    AmountMismatch { expected: Money, supplied: Money },

    /// The callback signature did not verify.
    #[error("payment verification failed")]
    VerificationFailed,

    /// An illegal terminal-state transition or duplicate active session.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The payment gateway timed out or was unreachable (retryable).
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Store failure, tagged with the failing operation.
    #[error("store error during {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Routes a store error to the taxonomy, tagging residual failures
    /// with the operation name.
    pub(crate) fn from_store(operation: &'static str) -> impl Fn(StoreError) -> CheckoutError {
        move |err| match err {
            StoreError::ProductNotFound(id) => CheckoutError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => CheckoutError::OrderNotFound(id),
            StoreError::Transition(domain_err) => CheckoutError::Conflict(domain_err.to_string()),
            StoreError::ActiveIntentExists(order_id) => CheckoutError::Conflict(format!(
                "order {order_id} already has an active payment intent"
            )),
            StoreError::DuplicateGatewayReference(reference) => {
                CheckoutError::Conflict(format!("gateway reference '{reference}' already recorded"))
            }
            source => CheckoutError::Store { operation, source },
        }
    }
}
