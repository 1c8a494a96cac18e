//! Storage layer errors

use thiserror::Error;
use tiffin_domain::{CustomerId, DriverId, OrderId};

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity (restaurant, meal, customer, driver, order)
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Claim lost: the order is no longer ready and unassigned
    #[error("Order {order_id} has been picked up by another driver")]
    AlreadyClaimed {
        /// The contested order
        order_id: OrderId,
    },

    /// Customer still has a non-terminal order
    #[error("Customer {customer_id} has an outstanding order")]
    CustomerBusy {
        /// The blocked customer
        customer_id: CustomerId,
    },

    /// Driver still has an order on the way
    #[error("Driver {driver_id} has an outstanding order")]
    DriverBusy {
        /// The blocked driver
        driver_id: DriverId,
    },

    /// Duplicate entity (unique constraint violation)
    #[error("Duplicate entity: {entity_type} with id {id}")]
    Duplicate {
        /// Type of entity
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] tiffin_domain::DomainError),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity_type: "unknown".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                // Check for unique constraint violation
                if db_err.code().map(|c| c == "23505").unwrap_or(false) {
                    StoreError::Duplicate {
                        entity_type: "unknown".to_string(),
                        id: "unknown".to_string(),
                    }
                } else {
                    StoreError::Database(db_err.to_string())
                }
            },
            _ => StoreError::Database(err.to_string()),
        }
    }
}
