//! Inventory ledger: all-or-nothing stock reservation.

use domain::{DomainError, OrderItem, ProductId};
use serde::{Deserialize, Serialize};
use store::{StockDecrement, Store};

use crate::error::CheckoutError;

/// One untrusted cart line.
///
/// This is the entire surface the client-held cart snapshot feeds into
/// the core: a product reference and a quantity. Prices, titles, and
/// images are resolved by the ledger, never accepted from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Authoritative per-product stock, decremented at reservation time.
#[derive(Clone)]
pub struct InventoryLedger<S> {
    store: S,
}

impl<S: Store> InventoryLedger<S> {
    /// Creates a ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserves stock for every line, all together or not at all.
    ///
    /// Existence is validated for every line first, then sufficiency,
    /// before any mutation. The apply phase uses the store's conditional
    /// decrement per product; if a late line loses a race, the decrements
    /// already applied in this call are rolled back, so inventory is
    /// never left partially reserved.
    ///
    /// Returns order lines priced from the catalog at this instant.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn reserve(&self, lines: &[CartLine]) -> Result<Vec<OrderItem>, CheckoutError> {
        for line in lines {
            if line.quantity == 0 {
                return Err(CheckoutError::Validation(DomainError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                }));
            }
        }

        // Pre-check every line before touching stock. The conditional
        // decrement below re-checks under the store's atomicity, so a
        // racing reservation cannot slip through here.
        for line in lines {
            let product = self
                .store
                .get_product(&line.product_id)
                .await
                .map_err(CheckoutError::from_store("reserve"))?
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;

            if !product.has_stock(line.quantity) {
                metrics::counter!("reservations_rejected_total").increment(1);
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available: product.stock,
                });
            }
        }

        let mut reserved: Vec<OrderItem> = Vec::with_capacity(lines.len());

        for line in lines {
            let outcome = match self
                .store
                .try_decrement_stock(&line.product_id, line.quantity)
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.rollback(&reserved).await;
                    return Err(CheckoutError::from_store("reserve")(err));
                }
            };

            match outcome {
                StockDecrement::Applied(product) => {
                    reserved.push(OrderItem::new(
                        product.id,
                        product.title,
                        product.price,
                        line.quantity,
                        product.image,
                    ));
                }
                StockDecrement::Insufficient { available } => {
                    self.rollback(&reserved).await;
                    metrics::counter!("reservations_rejected_total").increment(1);
                    return Err(CheckoutError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        available,
                    });
                }
            }
        }

        Ok(reserved)
    }

    /// Returns previously reserved stock (reservation rollback and
    /// failed-payment disposition).
    #[tracing::instrument(skip(self, items), fields(line_count = items.len()))]
    pub async fn release(&self, items: &[OrderItem]) -> Result<(), CheckoutError> {
        for item in items {
            self.store
                .restore_stock(&item.product_id, item.quantity)
                .await
                .map_err(CheckoutError::from_store("release"))?;
        }
        Ok(())
    }

    /// Best-effort release by cart line, used on failure paths where the
    /// original error must be the one surfaced.
    ///
    /// A failed restore leaves stock under-counted until an operator
    /// reconciles it; the counter makes that visible.
    pub(crate) async fn release_lines_quietly(&self, lines: &[CartLine]) {
        for line in lines {
            if let Err(err) = self.store.restore_stock(&line.product_id, line.quantity).await {
                metrics::counter!("reservation_rollback_failures_total").increment(1);
                tracing::error!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %err,
                    "failed to release reservation line"
                );
            }
        }
    }

    async fn rollback(&self, reserved: &[OrderItem]) {
        for item in reserved {
            if let Err(err) = self.store.restore_stock(&item.product_id, item.quantity).await {
                metrics::counter!("reservation_rollback_failures_total").increment(1);
                tracing::error!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %err,
                    "failed to roll back reservation line"
                );
            }
        }
    }
}
