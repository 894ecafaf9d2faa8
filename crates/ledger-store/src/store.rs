use async_trait::async_trait;

use crate::{
    Customer, CustomerData, CustomerId, Order, OrderData, OrderId, Product, ProductData,
    ProductId, Result,
};

/// Core trait for ledger storage implementations.
///
/// Every method is one atomic unit of work: either all of its rows are
/// written or none are. Lists are returned in ascending id order.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Retrieves every customer.
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Retrieves a customer by id. Returns None if absent.
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// Inserts a customer and returns it with its assigned id.
    async fn insert_customer(&self, data: CustomerData) -> Result<Customer>;

    /// Overwrites every column of an existing customer.
    ///
    /// Fails with `NotFound` if the customer does not exist.
    async fn replace_customer(&self, id: CustomerId, data: CustomerData) -> Result<Customer>;

    /// Removes a customer.
    ///
    /// Fails with `NotFound` if absent, or `StillReferenced` while any order
    /// belongs to the customer.
    async fn delete_customer(&self, id: CustomerId) -> Result<()>;

    /// Retrieves every product.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Retrieves a product by id. Returns None if absent.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Inserts a product and returns it with its assigned id.
    async fn insert_product(&self, data: ProductData) -> Result<Product>;

    /// Overwrites every column of an existing product.
    async fn replace_product(&self, id: ProductId, data: ProductData) -> Result<Product>;

    /// Sets the stock of a product to exactly `stock`.
    ///
    /// Last writer wins; no version check is performed.
    async fn set_product_stock(&self, id: ProductId, stock: i64) -> Result<Product>;

    /// Removes a product.
    ///
    /// Fails with `StillReferenced` while any order is associated with it.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Retrieves every order with its associated product ids.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Retrieves an order by id. Returns None if absent.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Inserts an order and its product associations.
    ///
    /// Fails with `MissingReference` if the customer or any product does not
    /// exist; nothing is written in that case.
    async fn insert_order(&self, data: OrderData) -> Result<Order>;

    /// Overwrites an order's columns and replaces its association set.
    async fn replace_order(&self, id: OrderId, data: OrderData) -> Result<Order>;

    /// Removes an order together with its product associations.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    /// Sums the current price of every product associated with an order.
    ///
    /// Returns None if the order does not exist, and `0.0` for an order
    /// without products.
    async fn order_total(&self, id: OrderId) -> Result<Option<f64>>;
}

/// Extension trait providing convenience methods for ledger stores.
#[async_trait]
pub trait LedgerStoreExt: LedgerStore {
    /// Checks if a customer exists.
    async fn customer_exists(&self, id: CustomerId) -> Result<bool> {
        Ok(self.get_customer(id).await?.is_some())
    }

    /// Checks if a product exists.
    async fn product_exists(&self, id: ProductId) -> Result<bool> {
        Ok(self.get_product(id).await?.is_some())
    }

    /// Checks if an order exists.
    async fn order_exists(&self, id: OrderId) -> Result<bool> {
        Ok(self.get_order(id).await?.is_some())
    }
}

// Blanket implementation for all LedgerStore implementations
impl<T: LedgerStore + ?Sized> LedgerStoreExt for T {}
