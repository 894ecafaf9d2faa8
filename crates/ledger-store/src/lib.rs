//! Relational storage for the catalog and order ledger.
//!
//! The [`LedgerStore`] trait is the single seam between the domain services
//! and persistence. Two implementations are provided:
//! - [`InMemoryLedgerStore`] for tests and local runs
//! - [`PostgresLedgerStore`] backed by a `sqlx` connection pool

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{CustomerId, EntityKind, OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use record::{Customer, CustomerData, Order, OrderData, Product, ProductData};
pub use store::{LedgerStore, LedgerStoreExt};
