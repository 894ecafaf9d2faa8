use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::{
    Customer, CustomerData, CustomerId, EntityKind, Order, OrderData, OrderId, Product,
    ProductData, ProductId, Result, StoreError, store::LedgerStore,
};

/// Order columns without the association set.
#[derive(Debug, Clone)]
struct OrderRow {
    order_date: NaiveDate,
    delivery_date: Option<NaiveDate>,
    customer_id: CustomerId,
}

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderRow>,
    order_products: BTreeSet<(OrderId, ProductId)>,
    last_customer_id: i64,
    last_product_id: i64,
    last_order_id: i64,
}

impl Tables {
    fn products_of(&self, order_id: OrderId) -> impl Iterator<Item = ProductId> + '_ {
        self.order_products
            .range((order_id, ProductId::new(i64::MIN))..=(order_id, ProductId::new(i64::MAX)))
            .map(|(_, product_id)| *product_id)
    }

    fn materialize(&self, id: OrderId, row: &OrderRow) -> Order {
        Order {
            id,
            order_date: row.order_date,
            delivery_date: row.delivery_date,
            customer_id: row.customer_id,
            product_ids: self.products_of(id).collect(),
        }
    }

    /// Mirrors the foreign keys of the relational schema.
    fn check_order_references(&self, data: &OrderData) -> Result<()> {
        if !self.customers.contains_key(&data.customer_id) {
            return Err(StoreError::missing(EntityKind::Customer, data.customer_id));
        }
        if let Some(missing) = data
            .normalized_product_ids()
            .into_iter()
            .find(|id| !self.products.contains_key(id))
        {
            return Err(StoreError::missing(EntityKind::Product, missing));
        }
        Ok(())
    }

    fn link_products(&mut self, order_id: OrderId, product_ids: Vec<ProductId>) {
        let stale: Vec<_> = self.products_of(order_id).collect();
        for product_id in stale {
            self.order_products.remove(&(order_id, product_id));
        }
        self.order_products
            .extend(product_ids.into_iter().map(|product_id| (order_id, product_id)));
    }
}

/// In-memory ledger store implementation for testing.
///
/// Every operation runs under a single write or read lock, so each call is
/// atomic with respect to the others, matching one transaction per call in
/// the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of order/product association rows.
    pub async fn association_count(&self) -> usize {
        self.tables.read().await.order_products.len()
    }

    /// Clears all records. Id sequences keep counting.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.customers.clear();
        tables.products.clear();
        tables.orders.clear();
        tables.order_products.clear();
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.tables.read().await.customers.values().cloned().collect())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn insert_customer(&self, data: CustomerData) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        tables.last_customer_id += 1;
        let customer = data.into_customer(CustomerId::new(tables.last_customer_id));
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn replace_customer(&self, id: CustomerId, data: CustomerData) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .customers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Customer, id))?;
        *slot = data.into_customer(id);
        Ok(slot.clone())
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Customer, id));
        }
        if tables.orders.values().any(|order| order.customer_id == id) {
            return Err(StoreError::still_referenced(
                EntityKind::Customer,
                id,
                EntityKind::Order,
            ));
        }
        tables.customers.remove(&id);
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, data: ProductData) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.last_product_id += 1;
        let product = data.into_product(ProductId::new(tables.last_product_id));
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn replace_product(&self, id: ProductId, data: ProductData) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Product, id))?;
        *slot = data.into_product(id);
        Ok(slot.clone())
    }

    async fn set_product_stock(&self, id: ProductId, stock: i64) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Product, id))?;
        product.stock = stock;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Product, id));
        }
        if tables
            .order_products
            .iter()
            .any(|(_, product_id)| *product_id == id)
        {
            return Err(StoreError::still_referenced(
                EntityKind::Product,
                id,
                EntityKind::Order,
            ));
        }
        tables.products.remove(&id);
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .map(|(id, row)| tables.materialize(*id, row))
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).map(|row| tables.materialize(id, row)))
    }

    async fn insert_order(&self, data: OrderData) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.check_order_references(&data)?;

        tables.last_order_id += 1;
        let id = OrderId::new(tables.last_order_id);
        tables.orders.insert(
            id,
            OrderRow {
                order_date: data.order_date,
                delivery_date: data.delivery_date,
                customer_id: data.customer_id,
            },
        );
        tables.link_products(id, data.normalized_product_ids());

        Ok(data.into_order(id))
    }

    async fn replace_order(&self, id: OrderId, data: OrderData) -> Result<Order> {
        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Order, id));
        }
        tables.check_order_references(&data)?;

        tables.orders.insert(
            id,
            OrderRow {
                order_date: data.order_date,
                delivery_date: data.delivery_date,
                customer_id: data.customer_id,
            },
        );
        tables.link_products(id, data.normalized_product_ids());

        Ok(data.into_order(id))
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.remove(&id).is_none() {
            return Err(StoreError::not_found(EntityKind::Order, id));
        }
        tables.link_products(id, Vec::new());
        Ok(())
    }

    async fn order_total(&self, id: OrderId) -> Result<Option<f64>> {
        let tables = self.tables.read().await;
        if !tables.orders.contains_key(&id) {
            return Ok(None);
        }

        let total = tables
            .products_of(id)
            .filter_map(|product_id| tables.products.get(&product_id))
            .map(|product| product.price)
            .sum();
        Ok(Some(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerStoreExt;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn customer_data(name: &str) -> CustomerData {
        CustomerData {
            customer_name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            phone: None,
        }
    }

    fn product_data(name: &str, price: f64, stock: i64) -> ProductData {
        ProductData {
            product_name: name.to_string(),
            price,
            availability: true,
            stock,
        }
    }

    fn order_data(customer_id: CustomerId, product_ids: Vec<ProductId>) -> OrderData {
        OrderData {
            order_date: date(2024, 5, 1),
            delivery_date: None,
            customer_id,
            product_ids,
        }
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = InMemoryLedgerStore::new();

        let first = store.insert_customer(customer_data("Ada")).await.unwrap();
        let second = store.insert_customer(customer_data("Grace")).await.unwrap();

        assert_eq!(first.id, CustomerId::new(1));
        assert_eq!(second.id, CustomerId::new(2));
        assert_eq!(store.list_customers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryLedgerStore::new();

        let first = store.insert_product(product_data("Pen", 1.0, 3)).await.unwrap();
        store.delete_product(first.id).await.unwrap();
        let second = store.insert_product(product_data("Ink", 2.0, 3)).await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn replace_missing_customer_is_not_found() {
        let store = InMemoryLedgerStore::new();

        let result = store
            .replace_customer(CustomerId::new(99), customer_data("Ghost"))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                entity: EntityKind::Customer,
                id: 99
            })
        ));
        assert!(store.list_customers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_order_requires_existing_customer() {
        let store = InMemoryLedgerStore::new();

        let result = store
            .insert_order(order_data(CustomerId::new(5), vec![]))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::MissingReference {
                entity: EntityKind::Customer,
                id: 5
            })
        ));
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_order_requires_existing_products() {
        let store = InMemoryLedgerStore::new();
        let customer = store.insert_customer(customer_data("Ada")).await.unwrap();
        let pen = store.insert_product(product_data("Pen", 1.0, 3)).await.unwrap();

        let result = store
            .insert_order(order_data(customer.id, vec![pen.id, ProductId::new(77)]))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::MissingReference {
                entity: EntityKind::Product,
                id: 77
            })
        ));
        assert_eq!(store.association_count().await, 0);
    }

    #[tokio::test]
    async fn order_total_sums_current_prices() {
        let store = InMemoryLedgerStore::new();
        let customer = store.insert_customer(customer_data("Ada")).await.unwrap();
        let p1 = store.insert_product(product_data("Lamp", 10.0, 5)).await.unwrap();
        let p2 = store.insert_product(product_data("Bulb", 5.5, 5)).await.unwrap();

        let order = store
            .insert_order(order_data(customer.id, vec![p1.id, p2.id]))
            .await
            .unwrap();
        assert_eq!(store.order_total(order.id).await.unwrap(), Some(15.5));

        store
            .replace_product(p2.id, product_data("Bulb", 6.0, 5))
            .await
            .unwrap();
        assert_eq!(store.order_total(order.id).await.unwrap(), Some(16.0));
    }

    #[tokio::test]
    async fn order_total_of_missing_order_is_none() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(store.order_total(OrderId::new(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_order_swaps_association_set() {
        let store = InMemoryLedgerStore::new();
        let customer = store.insert_customer(customer_data("Ada")).await.unwrap();
        let p1 = store.insert_product(product_data("Lamp", 10.0, 5)).await.unwrap();
        let p2 = store.insert_product(product_data("Bulb", 5.5, 5)).await.unwrap();
        let order = store
            .insert_order(order_data(customer.id, vec![p1.id]))
            .await
            .unwrap();

        let replaced = store
            .replace_order(order.id, order_data(customer.id, vec![p2.id]))
            .await
            .unwrap();

        assert_eq!(replaced.product_ids, vec![p2.id]);
        assert_eq!(
            store.get_order(order.id).await.unwrap().unwrap().product_ids,
            vec![p2.id]
        );
        assert_eq!(store.association_count().await, 1);
    }

    #[tokio::test]
    async fn delete_order_removes_associations() {
        let store = InMemoryLedgerStore::new();
        let customer = store.insert_customer(customer_data("Ada")).await.unwrap();
        let p1 = store.insert_product(product_data("Lamp", 10.0, 5)).await.unwrap();
        let order = store
            .insert_order(order_data(customer.id, vec![p1.id]))
            .await
            .unwrap();

        store.delete_order(order.id).await.unwrap();

        assert!(!store.order_exists(order.id).await.unwrap());
        assert_eq!(store.association_count().await, 0);
        store.delete_product(p1.id).await.unwrap();
    }

    #[tokio::test]
    async fn referenced_records_cannot_be_deleted() {
        let store = InMemoryLedgerStore::new();
        let customer = store.insert_customer(customer_data("Ada")).await.unwrap();
        let p1 = store.insert_product(product_data("Lamp", 10.0, 5)).await.unwrap();
        store
            .insert_order(order_data(customer.id, vec![p1.id]))
            .await
            .unwrap();

        assert!(matches!(
            store.delete_customer(customer.id).await,
            Err(StoreError::StillReferenced {
                entity: EntityKind::Customer,
                ..
            })
        ));
        assert!(matches!(
            store.delete_product(p1.id).await,
            Err(StoreError::StillReferenced {
                entity: EntityKind::Product,
                ..
            })
        ));
        assert!(store.customer_exists(customer.id).await.unwrap());
        assert!(store.product_exists(p1.id).await.unwrap());
    }

    #[tokio::test]
    async fn set_stock_overwrites_value() {
        let store = InMemoryLedgerStore::new();
        let product = store.insert_product(product_data("Lamp", 10.0, 50)).await.unwrap();

        let updated = store.set_product_stock(product.id, 5).await.unwrap();

        assert_eq!(updated.stock, 5);
        assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryLedgerStore::new();
        let customer = store.insert_customer(customer_data("Ada")).await.unwrap();
        store.insert_order(order_data(customer.id, vec![])).await.unwrap();

        store.clear().await;

        assert!(store.list_customers().await.unwrap().is_empty());
        assert!(store.list_orders().await.unwrap().is_empty());
    }
}
