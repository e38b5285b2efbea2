//! Store error types.

use common::OrderId;
use domain::{DomainError, ProductId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No payment intent carries this gateway reference.
    #[error("payment intent not found for gateway reference '{0}'")]
    IntentNotFound(String),

    /// The unique index on gateway references rejected an insert.
    #[error("duplicate gateway reference '{0}'")]
    DuplicateGatewayReference(String),

    /// At most one non-terminal intent may exist per order.
    #[error("order {0} already has an active payment intent")]
    ActiveIntentExists(OrderId),

    /// A conditional status write lost to an illegal transition.
    #[error(transparent)]
    Transition(#[from] DomainError),

    /// A persisted record could not be interpreted.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
