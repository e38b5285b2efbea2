//! Checkout services for the order-payment core.
//!
//! Composes the store's atomic primitives into the three operations the
//! HTTP surface exposes: creating an order with an all-or-nothing
//! inventory reservation, opening a payment-gateway session, and
//! reconciling the signed gateway callback into a consistent terminal
//! state. The gateway is injected as a capability so tests can substitute
//! it; caller identity is passed explicitly through every operation.

pub mod error;
pub mod gateway;
pub mod inventory;
pub mod orders;
pub mod payments;

pub use error::CheckoutError;
pub use gateway::{CreateIntentRequest, GatewayError, GatewayIntent, InMemoryGateway, PaymentGateway};
pub use inventory::{CartLine, InventoryLedger};
pub use orders::OrderService;
pub use payments::{OpenedPayment, PaymentConfig, PaymentService};
