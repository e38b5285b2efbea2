//! Domain layer for the order-payment transaction core.
//!
//! This crate provides the core domain model:
//! - Value objects (`Money`, `ProductId`, `OrderItem`, `ShippingAddress`)
//! - The `Order` entity with its payment/order status state machines
//! - The `PaymentIntent` entity tracking one gateway session
//! - HMAC-SHA256 signing of gateway callbacks
//! - Caller identity types produced by the identity gate

pub mod error;
pub mod identity;
pub mod order;
pub mod payment;
pub mod product;
pub mod signature;
pub mod value_objects;

pub use error::DomainError;
pub use identity::{Identity, Role};
pub use order::{Order, OrderStatus, PaymentStatus};
pub use payment::{IntentStatus, PaymentIntent};
pub use product::Product;
pub use value_objects::{Money, OrderItem, ProductId, ShippingAddress};
