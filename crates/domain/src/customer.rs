//! Customer input validation and service.

use common::{CustomerId, EntityKind};
use ledger_store::{Customer, CustomerData, LedgerStore, LedgerStoreExt};
use serde::{Deserialize, Deserializer};

use crate::error::{LedgerError, rejected};
use crate::validation::{JsonFields, ValidationErrors, is_valid_email};

pub const CUSTOMER_NAME_MAX_LEN: usize = 75;
pub const EMAIL_MAX_LEN: usize = 150;
pub const PHONE_MAX_LEN: usize = 16;

/// Caller-supplied customer fields, as received.
///
/// Used for both create and full-replace update: an omitted optional field
/// clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct CustomerInput {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    decode_errors: ValidationErrors,
}

impl<'de> Deserialize<'de> for CustomerInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = JsonFields::deserialize(deserializer)?;
        Ok(Self {
            customer_name: fields.take("customer_name"),
            email: fields.take("email"),
            phone: fields.take("phone"),
            decode_errors: fields.into_errors(),
        })
    }
}

impl CustomerInput {
    /// Creates an input with just the required name.
    pub fn named(customer_name: impl Into<String>) -> Self {
        Self {
            customer_name: Some(customer_name.into()),
            ..Default::default()
        }
    }

    /// Sets the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Checks every field and returns the columns to write.
    pub fn validate(self) -> Result<CustomerData, ValidationErrors> {
        let mut errors = self.decode_errors;

        let customer_name =
            errors.required_text("customer_name", self.customer_name, CUSTOMER_NAME_MAX_LEN);
        let email = errors.optional_text("email", self.email, EMAIL_MAX_LEN);
        if let Some(ref address) = email
            && !is_valid_email(address)
        {
            errors.add("email", "Not a valid email address.");
        }
        let phone = errors.optional_text("phone", self.phone, PHONE_MAX_LEN);

        errors.into_result(|| CustomerData {
            customer_name: customer_name.unwrap_or_default(),
            email,
            phone,
        })
    }
}

/// Service for managing customers.
pub struct CustomerService<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> CustomerService<S> {
    /// Creates a new customer service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Customer>, LedgerError> {
        Ok(self.store.list_customers().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: CustomerId) -> Result<Customer, LedgerError> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Customer, id))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create(&self, input: CustomerInput) -> Result<Customer, LedgerError> {
        let data = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Customer, errors))?;

        let customer = self.store.insert_customer(data).await?;
        metrics::counter!("ledger_customers_created_total").increment(1);
        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Replaces every field of an existing customer.
    ///
    /// A missing customer is reported before the input is looked at.
    #[tracing::instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: CustomerId,
        input: CustomerInput,
    ) -> Result<Customer, LedgerError> {
        if !self.store.customer_exists(id).await? {
            return Err(LedgerError::not_found(EntityKind::Customer, id));
        }
        let data = input
            .validate()
            .map_err(|errors| rejected(EntityKind::Customer, errors))?;

        let customer = self.store.replace_customer(id, data).await?;
        tracing::info!(customer_id = %id, "customer updated");
        Ok(customer)
    }

    /// Deletes a customer that has no orders.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<(), LedgerError> {
        self.store.delete_customer(id).await.inspect_err(|e| {
            if matches!(e, ledger_store::StoreError::StillReferenced { .. }) {
                tracing::warn!(customer_id = %id, error = %e, "customer delete blocked");
            }
        })?;
        tracing::info!(customer_id = %id, "customer deleted");
        Ok(())
    }
}
