//! Order input validation and service: creation, full replace, total and
//! cancellation.

use common::{CustomerId, EntityKind, OrderId, ProductId};
use ledger_store::{LedgerStore, LedgerStoreExt, Order, OrderData, StoreError};
use serde::{Deserialize, Deserializer};

use crate::error::{LedgerError, rejected};
use crate::validation::{DATE_INVALID, JsonFields, ValidationErrors};

/// Caller-supplied order fields, as received.
///
/// Dates are `YYYY-MM-DD` strings so that a malformed date is reported
/// alongside every other field problem. `product_ids` is the complete
/// association set; duplicates collapse to one.
#[derive(Debug, Clone, Default)]
pub struct OrderInput {
    pub order_date: Option<String>,
    pub delivery_date: Option<String>,
    pub customer_id: Option<i64>,
    pub product_ids: Vec<i64>,
    decode_errors: ValidationErrors,
}

impl<'de> Deserialize<'de> for OrderInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = JsonFields::deserialize(deserializer)?;
        Ok(Self {
            order_date: fields.take_or("order_date", DATE_INVALID),
            delivery_date: fields.take_or("delivery_date", DATE_INVALID),
            customer_id: fields.take("customer_id"),
            product_ids: fields.take("product_ids").unwrap_or_default(),
            decode_errors: fields.into_errors(),
        })
    }
}

impl OrderInput {
    /// Creates an input for a customer on the given date.
    pub fn new(customer_id: CustomerId, order_date: impl Into<String>) -> Self {
        Self {
            order_date: Some(order_date.into()),
            customer_id: Some(customer_id.as_i64()),
            ..Default::default()
        }
    }

    /// Sets the expected delivery date.
    pub fn with_delivery_date(mut self, delivery_date: impl Into<String>) -> Self {
        self.delivery_date = Some(delivery_date.into());
        self
    }

    /// Sets the products associated with the order.
    pub fn with_products(mut self, product_ids: impl IntoIterator<Item = ProductId>) -> Self {
        self.product_ids = product_ids.into_iter().map(|id| id.as_i64()).collect();
        self
    }

    /// Checks every field and returns the columns to write.
    ///
    /// Reference checks are left to the store, which runs them in the same
    /// transaction as the write.
    pub fn validate(self) -> Result<OrderData, ValidationErrors> {
        let mut errors = self.decode_errors;

        let order_date = errors.required("order_date", self.order_date.as_deref());
        let order_date = errors.date("order_date", order_date);
        let delivery_date = errors.date("delivery_date", self.delivery_date.as_deref());
        if let (Some(ordered), Some(delivered)) = (order_date, delivery_date)
            && delivered < ordered
        {
            errors.add("delivery_date", "Must not be earlier than order_date.");
        }

        let customer_id = errors.required("customer_id", self.customer_id);

        errors.into_result(|| OrderData {
            order_date: order_date.unwrap_or_default(),
            delivery_date,
            customer_id: CustomerId::new(customer_id.unwrap_or_default()),
            product_ids: self.product_ids.into_iter().map(ProductId::new).collect(),
        })
    }
}

/// Service for managing orders.
pub struct OrderService<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, LedgerError> {
        Ok(self.store.list_orders().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order, LedgerError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Order, id))
    }

    /// Places an order for an existing customer.
    ///
    /// Fails with a reference error, writing nothing, if the customer or any
    /// listed product does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, input: OrderInput) -> Result<Order, LedgerError> {
        let data = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Order, errors))?;

        let order = self
            .store
            .insert_order(data)
            .await
            .inspect_err(log_reference_rejection)?;
        metrics::counter!("ledger_orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            products = order.product_ids.len(),
            "order created"
        );
        Ok(order)
    }

    /// Replaces an order's dates, customer and product set.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: OrderId, input: OrderInput) -> Result<Order, LedgerError> {
        if !self.store.order_exists(id).await? {
            return Err(LedgerError::not_found(EntityKind::Order, id));
        }
        let data = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Order, errors))?;

        let order = self
            .store
            .replace_order(id, data)
            .await
            .inspect_err(log_reference_rejection)?;
        tracing::info!(order_id = %id, "order updated");
        Ok(order)
    }

    /// Sums the current price of every product on the order.
    ///
    /// Prices are read at call time, so the total follows later price
    /// changes. An order without products totals zero.
    #[tracing::instrument(skip(self))]
    pub async fn total(&self, id: OrderId) -> Result<f64, LedgerError> {
        let total = self
            .store
            .order_total(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Order, id))?;

        metrics::histogram!("ledger_order_total_amount").record(total);
        Ok(total)
    }

    /// Cancels an order by deleting it and its product associations.
    ///
    /// Stock is not restored.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId) -> Result<(), LedgerError> {
        self.store.delete_order(id).await?;
        metrics::counter!("ledger_orders_cancelled_total").increment(1);
        tracing::info!(order_id = %id, "order cancelled");
        Ok(())
    }
}

fn log_reference_rejection(err: &StoreError) {
    if let StoreError::MissingReference { entity, id } = err {
        tracing::warn!(%entity, id, "order references a missing record");
    }
}
