//! Product input validation and service, including stock adjustment.

use common::{EntityKind, ProductId};
use ledger_store::{LedgerStore, LedgerStoreExt, Product, ProductData, StoreError};
use serde::{Deserialize, Deserializer};

use crate::error::{LedgerError, rejected};
use crate::validation::{JsonFields, NEGATIVE, ValidationErrors};

pub const PRODUCT_NAME_MAX_LEN: usize = 225;

/// Caller-supplied product fields, as received.
///
/// `availability` is a plain flag and is not derived from `stock`; when
/// omitted it is stored as `false`.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub product_name: Option<String>,
    pub price: Option<f64>,
    pub availability: Option<bool>,
    pub stock: Option<i64>,
    decode_errors: ValidationErrors,
}

impl<'de> Deserialize<'de> for ProductInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = JsonFields::deserialize(deserializer)?;
        Ok(Self {
            product_name: fields.take("product_name"),
            price: fields.take("price"),
            availability: fields.take("availability"),
            stock: fields.take("stock"),
            decode_errors: fields.into_errors(),
        })
    }
}

impl ProductInput {
    /// Creates an input with every required field set and availability on.
    pub fn new(product_name: impl Into<String>, price: f64, stock: i64) -> Self {
        Self {
            product_name: Some(product_name.into()),
            price: Some(price),
            availability: Some(true),
            stock: Some(stock),
            decode_errors: ValidationErrors::new(),
        }
    }

    /// Sets the availability flag.
    pub fn with_availability(mut self, availability: bool) -> Self {
        self.availability = Some(availability);
        self
    }

    /// Checks every field and returns the columns to write.
    pub fn validate(self) -> Result<ProductData, ValidationErrors> {
        let mut errors = self.decode_errors;

        let product_name =
            errors.required_text("product_name", self.product_name, PRODUCT_NAME_MAX_LEN);

        let price = match errors.required("price", self.price) {
            Some(price) if !price.is_finite() => {
                errors.add("price", "Not a valid number.");
                None
            }
            Some(price) if price < 0.0 => {
                errors.add("price", NEGATIVE);
                None
            }
            other => other,
        };

        let stock = non_negative_stock(&mut errors, self.stock);

        errors.into_result(|| ProductData {
            product_name: product_name.unwrap_or_default(),
            price: price.unwrap_or_default(),
            availability: self.availability.unwrap_or(false),
            stock: stock.unwrap_or_default(),
        })
    }
}

/// Body of a stock update: the new quantity on hand, not a delta.
#[derive(Debug, Clone, Default)]
pub struct StockInput {
    pub stock: Option<i64>,
    decode_errors: ValidationErrors,
}

impl<'de> Deserialize<'de> for StockInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = JsonFields::deserialize(deserializer)?;
        Ok(Self {
            stock: fields.take("stock"),
            decode_errors: fields.into_errors(),
        })
    }
}

impl StockInput {
    pub fn new(stock: i64) -> Self {
        Self {
            stock: Some(stock),
            decode_errors: ValidationErrors::new(),
        }
    }

    pub fn validate(self) -> Result<i64, ValidationErrors> {
        let mut errors = self.decode_errors;
        let stock = non_negative_stock(&mut errors, self.stock);
        errors.into_result(|| stock.unwrap_or_default())
    }
}

fn non_negative_stock(errors: &mut ValidationErrors, stock: Option<i64>) -> Option<i64> {
    match errors.required("stock", stock) {
        Some(stock) if stock < 0 => {
            errors.add("stock", NEGATIVE);
            None
        }
        other => other,
    }
}

/// Service for managing products and their stock.
pub struct ProductService<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> ProductService<S> {
    /// Creates a new product service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, LedgerError> {
        Ok(self.store.list_products().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product, LedgerError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Product, id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, LedgerError> {
        let data = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Product, errors))?;

        let product = self.store.insert_product(data).await?;
        metrics::counter!("ledger_products_created_total").increment(1);
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replaces every field of an existing product.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: ProductId, input: ProductInput) -> Result<Product, LedgerError> {
        if !self.store.product_exists(id).await? {
            return Err(LedgerError::not_found(EntityKind::Product, id));
        }
        let data = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Product, errors))?;

        let product = self.store.replace_product(id, data).await?;
        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Overwrites the stock of a product with the given quantity.
    ///
    /// The new value replaces the old one outright; concurrent updates are
    /// last-writer-wins.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock(&self, id: ProductId, input: StockInput) -> Result<Product, LedgerError> {
        if !self.store.product_exists(id).await? {
            return Err(LedgerError::not_found(EntityKind::Product, id));
        }
        let stock = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Product, errors))?;

        let product = self.store.set_product_stock(id, stock).await?;
        metrics::counter!("ledger_stock_updates_total").increment(1);
        tracing::info!(product_id = %id, stock, "product stock set");
        Ok(product)
    }

    /// Deletes a product that no order refers to.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), LedgerError> {
        self.store.delete_product(id).await.inspect_err(|e| {
            if matches!(e, StoreError::StillReferenced { .. }) {
                tracing::warn!(product_id = %id, error = %e, "product delete blocked");
            }
        })?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
