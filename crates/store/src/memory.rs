//! In-memory store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{DomainError, IntentStatus, Order, PaymentIntent, PaymentStatus, Product, ProductId};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{CaptureCommit, FailIntentOutcome, PaymentOutcome, StockDecrement, Store};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    /// Keyed by gateway reference; the map key is the unique index.
    intents: HashMap<String, PaymentIntent>,
}

/// In-memory store for tests and single-node use.
///
/// A single `RwLock` over all state makes every conditional method one
/// atomic read-modify-write and serializes capture commits per intent,
/// matching the guarantees of the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product (catalog seeding).
    pub async fn put_product(&self, product: Product) {
        self.inner
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Returns a product's current stock, if it exists.
    pub async fn stock_of(&self, id: &ProductId) -> Option<u32> {
        self.inner.read().await.products.get(id).map(|p| p.stock)
    }

    /// Returns the number of stored payment intents.
    pub async fn intent_count(&self) -> usize {
        self.inner.read().await.intents.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }

    async fn try_decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<StockDecrement> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(id)
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;

        if product.stock < quantity {
            return Ok(StockDecrement::Insufficient {
                available: product.stock,
            });
        }

        product.stock -= quantity;
        Ok(StockDecrement::Applied(product.clone()))
    }

    async fn restore_stock(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(id)
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;

        product.stock += quantity;
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.inner
            .write()
            .await
            .orders
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_owner(&self, owner: UserId) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.owner == owner)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn apply_payment_outcome(&self, id: OrderId, outcome: PaymentOutcome) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let mut staged = inner
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))?;

        match outcome {
            PaymentOutcome::Success => {
                staged.set_payment_status(PaymentStatus::Completed)?;
            }
            PaymentOutcome::Failure => {
                staged.set_payment_status(PaymentStatus::Failed)?;
                staged.cancel()?;
            }
        }

        inner.orders.insert(id, staged.clone());
        Ok(staged)
    }

    async fn insert_intent(&self, intent: &PaymentIntent) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.intents.contains_key(&intent.gateway_order_id) {
            return Err(StoreError::DuplicateGatewayReference(
                intent.gateway_order_id.clone(),
            ));
        }

        let has_active = inner
            .intents
            .values()
            .any(|i| i.order_id == intent.order_id && !i.status.is_terminal());
        if has_active {
            return Err(StoreError::ActiveIntentExists(intent.order_id));
        }

        inner
            .intents
            .insert(intent.gateway_order_id.clone(), intent.clone());
        Ok(())
    }

    async fn get_intent(&self, gateway_order_id: &str) -> Result<Option<PaymentIntent>> {
        Ok(self.inner.read().await.intents.get(gateway_order_id).cloned())
    }

    async fn fail_intent(&self, gateway_order_id: &str) -> Result<FailIntentOutcome> {
        let mut inner = self.inner.write().await;
        match inner.intents.get_mut(gateway_order_id) {
            None => Ok(FailIntentOutcome::NotFound),
            Some(intent) if intent.status.is_terminal() => Ok(FailIntentOutcome::AlreadyTerminal),
            Some(intent) => {
                intent.fail()?;
                Ok(FailIntentOutcome::Applied)
            }
        }
    }

    async fn commit_capture(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<CaptureCommit> {
        let mut inner = self.inner.write().await;

        let intent = inner
            .intents
            .get(gateway_order_id)
            .ok_or_else(|| StoreError::IntentNotFound(gateway_order_id.to_string()))?
            .clone();

        if intent.is_repeat_capture(gateway_payment_id) {
            let order = inner
                .orders
                .get(&intent.order_id)
                .cloned()
                .ok_or(StoreError::OrderNotFound(intent.order_id))?;
            return Ok(CaptureCommit::AlreadyCaptured { intent, order });
        }

        if intent.status.is_terminal() {
            return Err(StoreError::Transition(DomainError::IllegalIntentTransition {
                from: intent.status,
                to: IntentStatus::Captured,
            }));
        }

        // Stage both transitions on copies; persist only when both apply.
        let mut staged_intent = intent;
        let mut staged_order = inner
            .orders
            .get(&staged_intent.order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(staged_intent.order_id))?;

        staged_intent.capture(gateway_payment_id, signature)?;
        staged_order.set_payment_status(PaymentStatus::Completed)?;

        inner
            .intents
            .insert(gateway_order_id.to_string(), staged_intent.clone());
        inner.orders.insert(staged_order.id, staged_order.clone());

        Ok(CaptureCommit::Applied {
            intent: staged_intent,
            order: staged_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, OrderItem, ShippingAddress};

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "9999999999".to_string(),
            address: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            state: "LDN".to_string(),
            zip_code: "400001".to_string(),
        }
    }

    fn order_for(owner: UserId) -> Order {
        Order::create(
            owner,
            vec![OrderItem::new(
                "SKU-001",
                "Widget",
                Money::from_minor(1000),
                2,
                "w.png",
            )],
            address(),
        )
        .unwrap()
    }

    async fn store_with_widget(stock: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .put_product(Product::new(
                "SKU-001",
                "Widget",
                "w.png",
                Money::from_minor(1000),
                stock,
            ))
            .await;
        store
    }

    #[tokio::test]
    async fn test_decrement_applies_and_snapshots() {
        let store = store_with_widget(5).await;

        let outcome = store
            .try_decrement_stock(&ProductId::new("SKU-001"), 3)
            .await
            .unwrap();

        match outcome {
            StockDecrement::Applied(product) => {
                assert_eq!(product.stock, 2);
                assert_eq!(product.price.minor(), 1000);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decrement_insufficient_leaves_stock_unchanged() {
        let store = store_with_widget(2).await;
        let id = ProductId::new("SKU-001");

        let outcome = store.try_decrement_stock(&id, 3).await.unwrap();
        assert!(matches!(
            outcome,
            StockDecrement::Insufficient { available: 2 }
        ));
        assert_eq!(store.stock_of(&id).await, Some(2));
    }

    #[tokio::test]
    async fn test_decrement_unknown_product() {
        let store = InMemoryStore::new();
        let err = store
            .try_decrement_stock(&ProductId::new("SKU-404"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_decrements_never_oversell() {
        let store = store_with_widget(1).await;
        let id = ProductId::new("SKU-001");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.try_decrement_stock(&id, 1).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), StockDecrement::Applied(_)) {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(store.stock_of(&id).await, Some(0));
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first() {
        let store = InMemoryStore::new();
        let owner = UserId::new();

        let mut first = order_for(owner);
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(60);
        let second = order_for(owner);
        store.insert_order(&first).await.unwrap();
        store.insert_order(&second).await.unwrap();
        store.insert_order(&order_for(UserId::new())).await.unwrap();

        let orders = store.orders_for_owner(owner).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].id, first.id);
    }

    #[tokio::test]
    async fn test_insert_intent_enforces_unique_reference() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();

        let intent = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&intent).await.unwrap();

        let duplicate = PaymentIntent::open(OrderId::new(), "pg_1", Money::from_minor(1), "INR");
        let err = store.insert_intent(&duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateGatewayReference(_)));
    }

    #[tokio::test]
    async fn test_insert_intent_rejects_second_active_per_order() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();

        let first = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&first).await.unwrap();

        let second = PaymentIntent::open(order.id, "pg_2", order.total_amount, "INR");
        let err = store.insert_intent(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::ActiveIntentExists(_)));

        // A terminal intent no longer blocks a new session.
        store.fail_intent("pg_1").await.unwrap();
        let third = PaymentIntent::open(order.id, "pg_3", order.total_amount, "INR");
        store.insert_intent(&third).await.unwrap();
    }

    #[tokio::test]
    async fn test_fail_intent_is_idempotent() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();
        let intent = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&intent).await.unwrap();

        assert_eq!(
            store.fail_intent("pg_1").await.unwrap(),
            FailIntentOutcome::Applied
        );
        assert_eq!(
            store.fail_intent("pg_1").await.unwrap(),
            FailIntentOutcome::AlreadyTerminal
        );
        assert_eq!(
            store.fail_intent("pg_404").await.unwrap(),
            FailIntentOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_commit_capture_transitions_both_records() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();
        let intent = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&intent).await.unwrap();

        let commit = store
            .commit_capture("pg_1", "pay_1", "sig_1")
            .await
            .unwrap();

        match commit {
            CaptureCommit::Applied { intent, order } => {
                assert_eq!(intent.status, IntentStatus::Captured);
                assert_eq!(intent.gateway_payment_id.as_deref(), Some("pay_1"));
                assert_eq!(order.payment_status, PaymentStatus::Completed);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_commit_capture_repeat_is_noop() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();
        let intent = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&intent).await.unwrap();

        store.commit_capture("pg_1", "pay_1", "sig_1").await.unwrap();
        let repeat = store
            .commit_capture("pg_1", "pay_1", "sig_1")
            .await
            .unwrap();
        assert!(matches!(repeat, CaptureCommit::AlreadyCaptured { .. }));
    }

    #[tokio::test]
    async fn test_commit_capture_rejects_terminal_conflicts() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();
        let intent = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&intent).await.unwrap();

        store.commit_capture("pg_1", "pay_1", "sig_1").await.unwrap();

        // Same reference, different payment id: terminal conflict.
        let err = store
            .commit_capture("pg_1", "pay_2", "sig_2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));

        // Failed intent cannot be captured.
        let order2 = order_for(UserId::new());
        store.insert_order(&order2).await.unwrap();
        let intent2 = PaymentIntent::open(order2.id, "pg_2", order2.total_amount, "INR");
        store.insert_intent(&intent2).await.unwrap();
        store.fail_intent("pg_2").await.unwrap();

        let err = store
            .commit_capture("pg_2", "pay_9", "sig_9")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
    }

    #[tokio::test]
    async fn test_concurrent_capture_commits_yield_one_transition() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();
        let intent = PaymentIntent::open(order.id, "pg_1", order.total_amount, "INR");
        store.insert_intent(&intent).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.commit_capture("pg_1", "pay_1", "sig_1").await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                CaptureCommit::Applied { .. } => applied += 1,
                CaptureCommit::AlreadyCaptured { order, .. } => {
                    assert_eq!(order.payment_status, PaymentStatus::Completed);
                }
            }
        }
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn test_apply_payment_outcome_failure_cancels_order() {
        let store = InMemoryStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();

        let updated = store
            .apply_payment_outcome(order.id, PaymentOutcome::Failure)
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Failed);
        assert_eq!(updated.order_status, domain::OrderStatus::Cancelled);

        // Terminal payment status stays put.
        let err = store
            .apply_payment_outcome(order.id, PaymentOutcome::Success)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
    }
}
