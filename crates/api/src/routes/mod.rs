//! HTTP handlers, one module per resource.

pub mod customers;
pub mod health;
pub mod home;
pub mod metrics;
pub mod orders;
pub mod products;

use domain::{CustomerService, OrderService, ProductService};
use ledger_store::LedgerStore;
use serde::Serialize;

/// Shared application state accessible from all handlers.
pub struct AppState<S: LedgerStore> {
    pub customers: CustomerService<S>,
    pub products: ProductService<S>,
    pub orders: OrderService<S>,
}

/// Confirmation body for updates, deletes and cancellations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
