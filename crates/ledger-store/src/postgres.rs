use async_trait::async_trait;
use sqlx::postgres::{PgDatabaseError, PgRow};
use sqlx::{PgConnection, PgPool, Row};

use crate::{
    Customer, CustomerData, CustomerId, EntityKind, Order, OrderData, OrderId, Product,
    ProductData, ProductId, Result, StoreError, store::LedgerStore,
};

const SELECT_ORDERS: &str = r#"
    SELECT o.id, o.order_date, o.delivery_date, o.customer_id,
           COALESCE(
               ARRAY_AGG(op.product_id ORDER BY op.product_id)
                   FILTER (WHERE op.product_id IS NOT NULL),
               '{}'::BIGINT[]
           ) AS product_ids
    FROM orders o
    LEFT JOIN order_products op ON op.order_id = o.id
"#;

/// PostgreSQL-backed ledger store implementation.
///
/// Multi-row writes run inside a transaction. Referenced rows are locked
/// `FOR KEY SHARE` before an order is written so a concurrent delete of the
/// customer or product cannot slip in between the check and the insert.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::new(row.try_get("id")?),
            customer_name: row.try_get("customer_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            product_name: row.try_get("product_name")?,
            price: row.try_get("price")?,
            availability: row.try_get("availability")?,
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let product_ids: Vec<i64> = row.try_get("product_ids")?;
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            order_date: row.try_get("order_date")?,
            delivery_date: row.try_get("delivery_date")?,
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            product_ids: product_ids.into_iter().map(ProductId::new).collect(),
        })
    }

    /// Locks the customer and every product an order is about to reference.
    async fn lock_order_references(conn: &mut PgConnection, data: &OrderData) -> Result<()> {
        let customer: Option<i64> =
            sqlx::query_scalar("SELECT id FROM customer WHERE id = $1 FOR KEY SHARE")
                .bind(data.customer_id.as_i64())
                .fetch_optional(&mut *conn)
                .await?;
        if customer.is_none() {
            return Err(StoreError::missing(EntityKind::Customer, data.customer_id));
        }

        let wanted = data.normalized_product_ids();
        if wanted.is_empty() {
            return Ok(());
        }

        let raw: Vec<i64> = wanted.iter().map(ProductId::as_i64).collect();
        let found: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = ANY($1) FOR KEY SHARE")
                .bind(&raw)
                .fetch_all(&mut *conn)
                .await?;

        match raw.into_iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(StoreError::missing(EntityKind::Product, missing)),
            None => Ok(()),
        }
    }

    async fn link_products(
        conn: &mut PgConnection,
        order_id: OrderId,
        product_ids: &[ProductId],
    ) -> Result<()> {
        sqlx::query("DELETE FROM order_products WHERE order_id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *conn)
            .await?;

        if product_ids.is_empty() {
            return Ok(());
        }

        let raw: Vec<i64> = product_ids.iter().map(ProductId::as_i64).collect();
        sqlx::query(
            r#"
            INSERT INTO order_products (order_id, product_id)
            SELECT $1, UNNEST($2::BIGINT[])
            "#,
        )
        .bind(order_id.as_i64())
        .bind(&raw)
        .execute(&mut *conn)
        .await
        .map_err(|e| match violated_key(&e, "fk_order_products_product") {
            Some(product_id) => StoreError::missing(EntityKind::Product, product_id),
            None => StoreError::Database(e),
        })?;

        Ok(())
    }
}

/// Maps a violation of the named foreign-key constraint to a store error.
///
/// The explicit existence checks normally fire first; this covers writes
/// that race with a concurrent delete.
fn reference_violation(
    err: sqlx::Error,
    constraint: &str,
    to_error: impl FnOnce() -> StoreError,
) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some(constraint)
    {
        return to_error();
    }
    StoreError::Database(err)
}

/// Returns the key a foreign-key violation of `constraint` reports as absent.
fn violated_key(err: &sqlx::Error, constraint: &str) -> Option<i64> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.constraint() != Some(constraint) {
        return None;
    }
    let detail = db_err.try_downcast_ref::<PgDatabaseError>()?.detail()?;
    key_from_detail(detail)
}

/// Parses the value out of `Key (product_id)=(42) is not present in ...`.
fn key_from_detail(detail: &str) -> Option<i64> {
    let (_, rest) = detail.split_once(")=(")?;
    let (key, _) = rest.split_once(')')?;
    key.parse().ok()
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query("SELECT id, customer_name, email, phone FROM customer ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT id, customer_name, email, phone FROM customer WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn insert_customer(&self, data: CustomerData) -> Result<Customer> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO customer (customer_name, email, phone) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&data.customer_name)
        .bind(&data.email)
        .bind(&data.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(data.into_customer(CustomerId::new(id)))
    }

    async fn replace_customer(&self, id: CustomerId, data: CustomerData) -> Result<Customer> {
        let result = sqlx::query(
            "UPDATE customer SET customer_name = $2, email = $3, phone = $4 WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(&data.customer_name)
        .bind(&data.email)
        .bind(&data.phone)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Customer, id));
        }
        Ok(data.into_customer(id))
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM customer WHERE id = $1 FOR UPDATE")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::not_found(EntityKind::Customer, id));
        }

        let has_orders: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE customer_id = $1)")
                .bind(id.as_i64())
                .fetch_one(&mut *tx)
                .await?;
        if has_orders {
            return Err(StoreError::still_referenced(
                EntityKind::Customer,
                id,
                EntityKind::Order,
            ));
        }

        sqlx::query("DELETE FROM customer WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                reference_violation(e, "fk_orders_customer", || {
                    StoreError::still_referenced(EntityKind::Customer, id, EntityKind::Order)
                })
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, product_name, price, availability, stock FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, product_name, price, availability, stock FROM products WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn insert_product(&self, data: ProductData) -> Result<Product> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (product_name, price, availability, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&data.product_name)
        .bind(data.price)
        .bind(data.availability)
        .bind(data.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(data.into_product(ProductId::new(id)))
    }

    async fn replace_product(&self, id: ProductId, data: ProductData) -> Result<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET product_name = $2, price = $3, availability = $4, stock = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(&data.product_name)
        .bind(data.price)
        .bind(data.availability)
        .bind(data.stock)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Product, id));
        }
        Ok(data.into_product(id))
    }

    async fn set_product_stock(&self, id: ProductId, stock: i64) -> Result<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products SET stock = $2 WHERE id = $1
            RETURNING id, product_name, price, availability, stock
            "#,
        )
        .bind(id.as_i64())
        .bind(stock)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::not_found(EntityKind::Product, id)),
        }
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::not_found(EntityKind::Product, id));
        }

        let in_orders: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM order_products WHERE product_id = $1)",
        )
        .bind(id.as_i64())
        .fetch_one(&mut *tx)
        .await?;
        if in_orders {
            return Err(StoreError::still_referenced(
                EntityKind::Product,
                id,
                EntityKind::Order,
            ));
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                reference_violation(e, "fk_order_products_product", || {
                    StoreError::still_referenced(EntityKind::Product, id, EntityKind::Order)
                })
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let sql = format!("{SELECT_ORDERS} GROUP BY o.id ORDER BY o.id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("{SELECT_ORDERS} WHERE o.id = $1 GROUP BY o.id");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn insert_order(&self, data: OrderData) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        Self::lock_order_references(&mut tx, &data).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (order_date, delivery_date, customer_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(data.order_date)
        .bind(data.delivery_date)
        .bind(data.customer_id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            reference_violation(e, "fk_orders_customer", || {
                StoreError::missing(EntityKind::Customer, data.customer_id)
            })
        })?;

        let order_id = OrderId::new(id);
        Self::link_products(&mut tx, order_id, &data.normalized_product_ids()).await?;

        tx.commit().await?;
        tracing::debug!(%order_id, "order row written");
        Ok(data.into_order(order_id))
    }

    async fn replace_order(&self, id: OrderId, data: OrderData) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::not_found(EntityKind::Order, id));
        }

        Self::lock_order_references(&mut tx, &data).await?;

        sqlx::query(
            r#"
            UPDATE orders
            SET order_date = $2, delivery_date = $3, customer_id = $4
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(data.order_date)
        .bind(data.delivery_date)
        .bind(data.customer_id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            reference_violation(e, "fk_orders_customer", || {
                StoreError::missing(EntityKind::Customer, data.customer_id)
            })
        })?;

        Self::link_products(&mut tx, id, &data.normalized_product_ids()).await?;

        tx.commit().await?;
        Ok(data.into_order(id))
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        // Association rows go with the order through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Order, id));
        }
        Ok(())
    }

    async fn order_total(&self, id: OrderId) -> Result<Option<f64>> {
        let total: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(p.price), 0)::DOUBLE PRECISION
            FROM orders o
            LEFT JOIN order_products op ON op.order_id = o.id
            LEFT JOIN products p ON p.id = op.product_id
            WHERE o.id = $1
            GROUP BY o.id
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(total)
    }
}
