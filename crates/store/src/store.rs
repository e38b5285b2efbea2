//! The `Store` trait and its operation result types.

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, PaymentIntent, Product, ProductId};

use crate::error::Result;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone)]
pub enum StockDecrement {
    /// The decrement was applied. Carries the product snapshot whose
    /// title, price, and image price the order line.
    Applied(Product),

    /// Stock was insufficient; nothing changed.
    Insufficient { available: u32 },
}

/// Outcome of a conditional intent failure write.
///
/// The write is idempotent: repeating it against a terminal intent, or
/// against a reference that was never issued, changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailIntentOutcome {
    /// The intent moved `Created -> Failed`.
    Applied,

    /// The intent was already terminal; left untouched.
    AlreadyTerminal,

    /// No intent carries this gateway reference.
    NotFound,
}

/// A reconciled payment outcome applied to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment captured: `payment_status -> completed`, order stays
    /// `processing` for downstream fulfillment.
    Success,

    /// Payment definitively failed: `payment_status -> failed` and the
    /// order is cancelled.
    Failure,
}

/// Result of the joint capture commit.
#[derive(Debug, Clone)]
pub enum CaptureCommit {
    /// Intent and order were transitioned together.
    Applied { intent: PaymentIntent, order: Order },

    /// The intent was already captured with the same gateway payment id;
    /// nothing changed. Carries the current state.
    AlreadyCaptured { intent: PaymentIntent, order: Order },
}

impl CaptureCommit {
    /// Returns the order in its post-commit state.
    pub fn into_order(self) -> Order {
        match self {
            CaptureCommit::Applied { order, .. } | CaptureCommit::AlreadyCaptured { order, .. } => {
                order
            }
        }
    }
}

/// Persistent store for products, orders, and payment intents.
///
/// Every conditional method is one atomic read-modify-write: concurrent
/// callers racing on the same product or intent observe exactly one
/// winner. Orders are never deleted.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads a product by id.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Atomically decrements stock, guarded by `stock >= quantity`.
    ///
    /// Fails with `ProductNotFound` for an unknown id; returns
    /// `Insufficient` without mutating anything when the guard fails.
    async fn try_decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<StockDecrement>;

    /// Restores previously decremented stock (reservation rollback and
    /// failed-payment disposition).
    async fn restore_stock(&self, id: &ProductId, quantity: u32) -> Result<()>;

    /// Persists a new order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Reads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn orders_for_owner(&self, owner: UserId) -> Result<Vec<Order>>;

    /// Applies a reconciled payment outcome to an order as one combined
    /// conditional status write.
    ///
    /// Fails with `Transition` when the order's payment status is already
    /// terminal.
    async fn apply_payment_outcome(&self, id: OrderId, outcome: PaymentOutcome) -> Result<Order>;

    /// Persists a new payment intent.
    ///
    /// Enforces the unique index on `gateway_order_id`
    /// (`DuplicateGatewayReference`) and at most one non-terminal intent
    /// per order (`ActiveIntentExists`).
    async fn insert_intent(&self, intent: &PaymentIntent) -> Result<()>;

    /// Reads a payment intent by its gateway reference.
    async fn get_intent(&self, gateway_order_id: &str) -> Result<Option<PaymentIntent>>;

    /// Conditionally marks an intent failed; a no-op when the intent is
    /// already terminal or unknown.
    async fn fail_intent(&self, gateway_order_id: &str) -> Result<FailIntentOutcome>;

    /// Commits a verified capture: intent `{captured, gateway_payment_id,
    /// signature}` and order `payment_status = completed` persist as a
    /// single unit, or neither does.
    ///
    /// Serializes per intent, so concurrent duplicate callbacks observe
    /// exactly one transition. Repeating the commit with the same gateway
    /// payment id yields `AlreadyCaptured`; any other write against a
    /// terminal intent fails with `Transition`.
    async fn commit_capture(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<CaptureCommit>;
}
