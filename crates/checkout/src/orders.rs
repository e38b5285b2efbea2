//! Order lifecycle service.

use common::OrderId;
use domain::{Identity, Order, ShippingAddress};
use store::{PaymentOutcome, Store};

use crate::error::CheckoutError;
use crate::inventory::{CartLine, InventoryLedger};

/// Composes the inventory ledger and the store into the order lifecycle:
/// creation with reservation, owner-scoped reads, and payment outcomes.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
    ledger: InventoryLedger<S>,
}

impl<S: Store + Clone> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        let ledger = InventoryLedger::new(store.clone());
        Self { store, ledger }
    }

    /// Returns the ledger (shared with the payment service's
    /// failed-payment disposition).
    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }

    /// Creates an order for the caller from untrusted cart lines.
    ///
    /// Validation happens before any stock is touched. Reservation and
    /// persistence form one unit: a failed reservation creates no order,
    /// and a failed insert releases the reservation.
    #[tracing::instrument(skip(self, identity, lines, shipping_address), fields(owner = %identity.subject))]
    pub async fn create_order(
        &self,
        identity: Identity,
        lines: Vec<CartLine>,
        shipping_address: ShippingAddress,
    ) -> Result<Order, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::Validation(domain::DomainError::EmptyOrder));
        }
        shipping_address
            .validate()
            .map_err(CheckoutError::Validation)?;

        let items = self.ledger.reserve(&lines).await?;

        let order = match Order::create(identity.subject, items, shipping_address) {
            Ok(order) => order,
            Err(err) => {
                // Unreachable after the checks above, but the reservation
                // must not leak if it ever becomes reachable.
                self.ledger.release_lines_quietly(&lines).await;
                return Err(CheckoutError::Validation(err));
            }
        };

        if let Err(err) = self.store.insert_order(&order).await {
            self.ledger.release_lines_quietly(&lines).await;
            return Err(CheckoutError::from_store("create_order")(err));
        }

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");
        Ok(order)
    }

    /// Loads an order, enforcing ownership.
    #[tracing::instrument(skip(self, requester), fields(requester = %requester.subject))]
    pub async fn get_order(
        &self,
        order_id: OrderId,
        requester: Identity,
    ) -> Result<Order, CheckoutError> {
        let order = self
            .store
            .get_order(order_id)
            .await
            .map_err(CheckoutError::from_store("get_order"))?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !order.is_owned_by(requester.subject) {
            return Err(CheckoutError::Forbidden(order_id));
        }

        Ok(order)
    }

    /// Lists the caller's orders, newest first.
    #[tracing::instrument(skip(self, requester), fields(requester = %requester.subject))]
    pub async fn list_orders(&self, requester: Identity) -> Result<Vec<Order>, CheckoutError> {
        self.store
            .orders_for_owner(requester.subject)
            .await
            .map_err(CheckoutError::from_store("list_orders"))
    }

    /// Applies a reconciled payment outcome to an order.
    ///
    /// Success completes the payment and leaves the order `processing`
    /// for downstream fulfillment. Failure marks the payment failed,
    /// cancels the order, and returns its reservation to stock.
    #[tracing::instrument(skip(self))]
    pub async fn apply_payment_outcome(
        &self,
        order_id: OrderId,
        outcome: PaymentOutcome,
    ) -> Result<Order, CheckoutError> {
        let order = self
            .store
            .apply_payment_outcome(order_id, outcome)
            .await
            .map_err(CheckoutError::from_store("apply_payment_outcome"))?;

        if outcome == PaymentOutcome::Failure {
            self.ledger.release(&order.items).await?;
            tracing::info!(order_id = %order.id, "payment failed, order cancelled and stock released");
        }

        Ok(order)
    }
}
