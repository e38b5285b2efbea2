//! Shared identifier types used across the order-payment core.

mod types;

pub use types::{OrderId, PaymentIntentId, UserId};
