use serde::{Deserialize, Serialize};

/// Declares a store-assigned integer identifier.
///
/// Each entity gets its own newtype so a product id can never be passed
/// where a customer id is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row id.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a customer row.
    CustomerId
);

entity_id!(
    /// Identifier of a product row.
    ProductId
);

entity_id!(
    /// Identifier of an order row.
    OrderId
);

/// The kinds of record the ledger keeps.
///
/// Used to name the entity in not-found and reference errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Customer,
    Product,
    Order,
}

impl EntityKind {
    /// Returns the entity name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "Customer",
            EntityKind::Product => "Product",
            EntityKind::Order => "Order",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
