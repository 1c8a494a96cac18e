//! Daemon error taxonomy.
//!
//! Every failure a request can hit collapses into `ServiceError`; the
//! API layer translates the variant into an HTTP status and a
//! structured `{status: "failed", error}` body. Store conflicts map
//! onto the canonical customer-facing messages here, in one place.

use thiserror::Error;
use tiffin_domain::DomainError;
use tiffin_pay::PayError;
use tiffin_store::StoreError;

/// Outstanding-order message shown to customers.
pub const LAST_ORDER_NOT_COMPLETED: &str = "Your last order must be completed.";

/// Outstanding-order message shown to drivers.
pub const OUTSTANDING_ORDER_NOT_DELIVERED: &str = "Your outstanding order is not delivered yet.";

/// Message shown to a driver who lost the claim race.
pub const PICKED_UP_BY_ANOTHER: &str = "This order has been picked up by another";

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad or expired caller token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid request payload (missing address, malformed cart, ...)
    #[error("{0}")]
    Validation(String),

    /// Outstanding order exists, or the order was claimed by another driver
    #[error("{0}")]
    Conflict(String),

    /// Entity missing, or the caller is not authorized for it
    #[error("{0}")]
    NotFound(String),

    /// Payment provider failure
    #[error("Payment provider error: {0}")]
    Provider(#[from] PayError),

    /// Storage failure (fatal for this request only)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CustomerBusy { .. } => {
                ServiceError::Conflict(LAST_ORDER_NOT_COMPLETED.to_string())
            }
            StoreError::DriverBusy { .. } => {
                ServiceError::Conflict(OUTSTANDING_ORDER_NOT_DELIVERED.to_string())
            }
            StoreError::AlreadyClaimed { .. } => {
                ServiceError::Conflict(PICKED_UP_BY_ANOTHER.to_string())
            }
            StoreError::NotFound { entity_type, id } => {
                ServiceError::NotFound(format!("{entity_type} not found: {id}"))
            }
            StoreError::Domain(e) => ServiceError::Validation(e.to_string()),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Tests
// =============================================================================
