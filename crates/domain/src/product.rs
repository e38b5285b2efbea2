//! Catalog product as seen by the inventory ledger.

use serde::{Deserialize, Serialize};

use crate::value_objects::{Money, ProductId};

/// A product with its authoritative unit price and stock count.
///
/// Catalog management lives outside this core; the ledger only reads
/// products and conditionally decrements their stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,

    /// Display title, snapshotted onto order lines.
    pub title: String,

    /// Primary image, snapshotted onto order lines.
    pub image: String,

    /// Authoritative unit price in minor units.
    pub price: Money,

    /// Units currently available for reservation.
    pub stock: u32,
}

impl Product {
    /// Creates a new product.
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        image: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image: image.into(),
            price,
            stock,
        }
    }

    /// Returns true if `quantity` units can be reserved right now.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
