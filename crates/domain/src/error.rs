//! Domain error types.

use thiserror::Error;

use crate::order::{OrderStatus, PaymentStatus};
use crate::payment::IntentStatus;
use crate::value_objects::ProductId;

/// Errors that can occur while constructing or transitioning domain entities.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order must contain at least one line.
    #[error("order must contain at least one item")]
    EmptyOrder,

    /// A line requested a quantity of zero.
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A required shipping address field was empty.
    #[error("shipping address field '{field}' must not be empty")]
    IncompleteAddress { field: &'static str },

    /// Payment status transitions are monotone; terminal states are final.
    #[error("illegal payment status transition: {from} -> {to}")]
    IllegalPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Order status transitions are monotone; terminal states are final.
    #[error("illegal order status transition: {from} -> {to}")]
    IllegalOrderTransition { from: OrderStatus, to: OrderStatus },

    /// A payment intent can be resolved exactly once.
    #[error("illegal payment intent transition: {from} -> {to}")]
    IllegalIntentTransition { from: IntentStatus, to: IntentStatus },
}
