//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use common::{OrderId, PaymentIntentId, UserId};
use domain::{
    DomainError, IntentStatus, Money, Order, OrderItem, PaymentIntent, PaymentStatus, Product,
    ProductId, ShippingAddress,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{CaptureCommit, FailIntentOutcome, PaymentOutcome, StockDecrement, Store};

/// PostgreSQL store.
///
/// Conditional stock decrements are single guarded `UPDATE` statements;
/// the joint capture commit runs in a transaction with a `FOR UPDATE` row
/// lock on the intent, serializing duplicate callbacks.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            title: row.try_get("title")?,
            image: row.try_get("image")?,
            price: Money::from_minor(row.try_get("price")?),
            stock: u32::try_from(row.try_get::<i32, _>("stock")?)
                .map_err(|_| StoreError::Corrupt("negative stock".to_string()))?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let items: Vec<OrderItem> =
            serde_json::from_value(row.try_get::<serde_json::Value, _>("items")?)?;
        let shipping_address: ShippingAddress =
            serde_json::from_value(row.try_get::<serde_json::Value, _>("shipping_address")?)?;
        let payment_status: PaymentStatus = row
            .try_get::<String, _>("payment_status")?
            .parse()
            .map_err(StoreError::Corrupt)?;
        let order_status = row
            .try_get::<String, _>("order_status")?
            .parse()
            .map_err(StoreError::Corrupt)?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner: UserId::from_uuid(row.try_get::<Uuid, _>("owner")?),
            items,
            total_amount: Money::from_minor(row.try_get("total_amount")?),
            payment_status,
            order_status,
            shipping_address,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_intent(row: &PgRow) -> Result<PaymentIntent> {
        let status: IntentStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(StoreError::Corrupt)?;

        Ok(PaymentIntent {
            id: PaymentIntentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            gateway_order_id: row.try_get("gateway_order_id")?,
            gateway_payment_id: row.try_get("gateway_payment_id")?,
            signature: row.try_get("signature")?,
            amount: Money::from_minor(row.try_get("amount")?),
            currency: row.try_get("currency")?,
            status,
        })
    }
}

const SELECT_ORDER: &str = "SELECT id, owner, items, total_amount, payment_status, order_status, \
     shipping_address, created_at FROM orders";

const SELECT_INTENT: &str = "SELECT id, order_id, gateway_order_id, gateway_payment_id, signature, \
     amount, currency, status FROM payment_intents";

#[async_trait]
impl Store for PostgresStore {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, title, image, price, stock FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn try_decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<StockDecrement> {
        // The guarded UPDATE is the atomic read-modify-write; the follow-up
        // SELECT only distinguishes "missing" from "insufficient".
        let row = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 \
             RETURNING id, title, image, price, stock",
        )
        .bind(id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(StockDecrement::Applied(Self::row_to_product(&row)?));
        }

        let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            None => Err(StoreError::ProductNotFound(id.clone())),
            Some(stock) => Ok(StockDecrement::Insufficient {
                available: u32::try_from(stock).unwrap_or(0),
            }),
        }
    }

    async fn restore_stock(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id.clone()));
        }
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, owner, items, total_amount, payment_status, order_status, \
             shipping_address, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id.as_uuid())
        .bind(order.owner.as_uuid())
        .bind(serde_json::to_value(&order.items)?)
        .bind(order.total_amount.minor())
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(serde_json::to_value(&order.shipping_address)?)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn orders_for_owner(&self, owner: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE owner = $1 ORDER BY created_at DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn apply_payment_outcome(&self, id: OrderId, outcome: PaymentOutcome) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;
        let mut order = Self::row_to_order(&row)?;

        match outcome {
            PaymentOutcome::Success => {
                order.set_payment_status(PaymentStatus::Completed)?;
            }
            PaymentOutcome::Failure => {
                order.set_payment_status(PaymentStatus::Failed)?;
                order.cancel()?;
            }
        }

        sqlx::query("UPDATE orders SET payment_status = $2, order_status = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(order.payment_status.as_str())
            .bind(order.order_status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn insert_intent(&self, intent: &PaymentIntent) -> Result<()> {
        sqlx::query(
            "INSERT INTO payment_intents (id, order_id, gateway_order_id, gateway_payment_id, \
             signature, amount, currency, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(intent.id.as_uuid())
        .bind(intent.order_id.as_uuid())
        .bind(&intent.gateway_order_id)
        .bind(&intent.gateway_payment_id)
        .bind(&intent.signature)
        .bind(intent.amount.minor())
        .bind(&intent.currency)
        .bind(intent.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("payment_intents_gateway_order_id_key") => {
                        return StoreError::DuplicateGatewayReference(
                            intent.gateway_order_id.clone(),
                        );
                    }
                    Some("one_active_intent_per_order") => {
                        return StoreError::ActiveIntentExists(intent.order_id);
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_intent(&self, gateway_order_id: &str) -> Result<Option<PaymentIntent>> {
        let row = sqlx::query(&format!("{SELECT_INTENT} WHERE gateway_order_id = $1"))
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_intent).transpose()
    }

    async fn fail_intent(&self, gateway_order_id: &str) -> Result<FailIntentOutcome> {
        let result = sqlx::query(
            "UPDATE payment_intents SET status = 'failed' \
             WHERE gateway_order_id = $1 AND status = 'created'",
        )
        .bind(gateway_order_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(FailIntentOutcome::Applied);
        }

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM payment_intents WHERE gateway_order_id = $1")
                .bind(gateway_order_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match exists {
            Some(_) => FailIntentOutcome::AlreadyTerminal,
            None => FailIntentOutcome::NotFound,
        })
    }

    async fn commit_capture(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<CaptureCommit> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "{SELECT_INTENT} WHERE gateway_order_id = $1 FOR UPDATE"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::IntentNotFound(gateway_order_id.to_string()))?;
        let mut intent = Self::row_to_intent(&row)?;

        if intent.is_repeat_capture(gateway_payment_id) {
            let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
                .bind(intent.order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::OrderNotFound(intent.order_id))?;
            let order = Self::row_to_order(&row)?;
            return Ok(CaptureCommit::AlreadyCaptured { intent, order });
        }

        if intent.status.is_terminal() {
            return Err(StoreError::Transition(DomainError::IllegalIntentTransition {
                from: intent.status,
                to: IntentStatus::Captured,
            }));
        }

        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1 FOR UPDATE"))
            .bind(intent.order_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(intent.order_id))?;
        let mut order = Self::row_to_order(&row)?;

        intent.capture(gateway_payment_id, signature)?;
        order.set_payment_status(PaymentStatus::Completed)?;

        sqlx::query(
            "UPDATE payment_intents SET status = $2, gateway_payment_id = $3, signature = $4 \
             WHERE id = $1",
        )
        .bind(intent.id.as_uuid())
        .bind(intent.status.as_str())
        .bind(&intent.gateway_payment_id)
        .bind(&intent.signature)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE orders SET payment_status = $2 WHERE id = $1")
            .bind(order.id.as_uuid())
            .bind(order.payment_status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CaptureCommit::Applied { intent, order })
    }
}
