//! Persisted record shapes.
//!
//! `*Data` structs carry every writable column of a row. They are produced by
//! the domain layer after validation and are written as a whole: updates
//! replace every column, never a subset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CustomerId, OrderId, ProductId};

/// A stored customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub customer_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Writable customer columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerData {
    pub customer_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerData {
    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            customer_name: self.customer_name,
            email: self.email,
            phone: self.phone,
        }
    }
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    pub price: f64,
    pub availability: bool,
    /// Quantity on hand.
    pub stock: i64,
}

/// Writable product columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductData {
    pub product_name: String,
    pub price: f64,
    pub availability: bool,
    pub stock: i64,
}

impl ProductData {
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            product_name: self.product_name,
            price: self.price,
            availability: self.availability,
            stock: self.stock,
        }
    }
}

/// A stored order together with the products associated with it.
///
/// `product_ids` is sorted ascending and holds each product at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub customer_id: CustomerId,
    pub product_ids: Vec<ProductId>,
}

/// Writable order columns plus the full association set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderData {
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub customer_id: CustomerId,
    pub product_ids: Vec<ProductId>,
}

impl OrderData {
    /// Returns the association set sorted and without duplicates.
    pub fn normalized_product_ids(&self) -> Vec<ProductId> {
        let mut ids = self.product_ids.clone();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn into_order(self, id: OrderId) -> Order {
        let product_ids = self.normalized_product_ids();
        Order {
            id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            customer_id: self.customer_id,
            product_ids,
        }
    }
}
