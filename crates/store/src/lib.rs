//! Persistent store boundary for the order-payment core.
//!
//! The store exposes the small set of atomic conditional primitives the
//! services are built on: per-product conditional stock decrement, the
//! joint capture commit of a payment intent and its order, and a combined
//! status write for payment outcomes. Two implementations are provided:
//! an in-memory store for tests and single-node use, and a PostgreSQL
//! store backed by sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CaptureCommit, FailIntentOutcome, PaymentOutcome, StockDecrement, Store};
