//! Domain layer for the order ledger.
//!
//! This crate validates caller input and applies it to a [`LedgerStore`]:
//! - [`CustomerService`] for customer records
//! - [`ProductService`] for the catalog and stock levels
//! - [`OrderService`] for orders, their product sets and totals
//!
//! Every input type collects all field problems into [`ValidationErrors`]
//! before anything is written.
//!
//! [`LedgerStore`]: ledger_store::LedgerStore

pub mod customer;
pub mod error;
pub mod order;
pub mod product;
pub mod validation;

pub use common::{CustomerId, EntityKind, OrderId, ProductId};
pub use customer::{CustomerInput, CustomerService};
pub use error::LedgerError;
pub use order::{OrderInput, OrderService};
pub use product::{ProductInput, ProductService, StockInput};
pub use validation::{ValidationErrors, is_valid_email};
