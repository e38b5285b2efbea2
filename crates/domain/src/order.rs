//! Order entity and its status state machines.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Money, OrderItem, ShippingAddress};

/// Payment disposition of an order.
///
/// Transitions are monotone:
/// ```text
/// Pending ──┬──► Completed
///           └──► Failed
/// ```
/// Both `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting a reconciled gateway outcome.
    #[default]
    Pending,

    /// Payment verified and captured (terminal state).
    Completed,

    /// Payment definitively failed (terminal state).
    Failed,
}

impl PaymentStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    /// Returns true if the transition `self -> to` is legal.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (
                PaymentStatus::Pending,
                PaymentStatus::Completed | PaymentStatus::Failed
            )
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

/// Fulfillment disposition of an order.
///
/// ```text
/// Processing ──► Shipped ──► Delivered
///      │
///      └──► Cancelled
/// ```
/// Shipping and delivery belong to downstream fulfillment; this core only
/// ever moves an order to `Cancelled` (failed-payment disposition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting fulfillment.
    #[default]
    Processing,

    /// Handed to a carrier.
    Shipped,

    /// Delivered to the customer (terminal state).
    Delivered,

    /// Cancelled before shipment (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

/// Durable record of one checkout attempt and its line items.
///
/// Orders are created once at checkout and never deleted. After creation
/// only the two status fields change: `payment_status` through the payment
/// reconciler and `order_status` through the failed-payment disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// The user who placed the order.
    pub owner: UserId,

    /// Lines with prices captured at reservation time.
    pub items: Vec<OrderItem>,

    /// Sum of line totals; invariant of `items`.
    pub total_amount: Money,

    /// Payment disposition.
    pub payment_status: PaymentStatus,

    /// Fulfillment disposition.
    pub order_status: OrderStatus,

    /// Destination captured at checkout.
    pub shipping_address: ShippingAddress,

    /// Creation timestamp; orders list newest-first.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order from priced lines.
    ///
    /// `items` must already carry ledger-snapshotted prices. Fails with
    /// `Validation`-class errors on empty lines, a zero quantity, or an
    /// incomplete shipping address. The total is computed here, never
    /// accepted from a caller.
    pub fn create(
        owner: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        for item in &items {
            if item.quantity == 0 {
                return Err(DomainError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
        }

        shipping_address.validate()?;

        let total_amount = items.iter().map(OrderItem::line_total).sum();

        Ok(Self {
            id: OrderId::new(),
            owner,
            items,
            total_amount,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            shipping_address,
            created_at: Utc::now(),
        })
    }

    /// Returns true if `user` owns this order.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Applies a payment status transition, enforcing monotonicity.
    pub fn set_payment_status(&mut self, to: PaymentStatus) -> Result<(), DomainError> {
        if !self.payment_status.can_transition_to(to) {
            return Err(DomainError::IllegalPaymentTransition {
                from: self.payment_status,
                to,
            });
        }
        self.payment_status = to;
        Ok(())
    }

    /// Cancels the order (failed-payment disposition).
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.order_status.can_cancel() {
            return Err(DomainError::IllegalOrderTransition {
                from: self.order_status,
                to: OrderStatus::Cancelled,
            });
        }
        self.order_status = OrderStatus::Cancelled;
        Ok(())
    }
}
