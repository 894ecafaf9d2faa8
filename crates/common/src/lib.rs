//! Shared identifier types for the catalog and order ledger.

mod types;

pub use types::{CustomerId, EntityKind, OrderId, ProductId};
