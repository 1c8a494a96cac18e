//! Tiffin Payment Layer
//!
//! Port definition for the external payment collaborator, plus two
//! adapters:
//!
//! - `StripeGateway` - Real Stripe payment intents over REST
//! - `StubPaymentGateway` - For testing (deterministic client secrets)
//!
//! The core makes exactly one attempt per intent; provider failures
//! surface to the caller unchanged.

#![warn(clippy::all)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

mod stripe;

pub use stripe::StripeGateway;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when creating a payment intent.
#[derive(Debug, Clone, Error)]
pub enum PayError {
    /// Amount must be a positive monetary value
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// HTTP request failed before the provider answered
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The provider rejected the request
    #[error("Payment provider error: {message}")]
    Provider {
        /// Provider error code, when one was returned
        code: Option<String>,
        /// Provider error message
        message: String,
    },

    /// Failed to parse the provider response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

// =============================================================================
// Payment Port
// =============================================================================

/// A created payment intent.
///
/// The `client_secret` goes back to the customer app, which finishes
/// the payment directly with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider-assigned intent ID
    pub id: String,
    /// Secret the customer app uses to confirm the payment
    pub client_secret: String,
}

/// Port for the payment provider.
///
/// Implementations:
/// - `StubPaymentGateway` - For testing (deterministic intents)
/// - `StripeGateway` - Real Stripe integration
#[async_trait]
pub trait PaymentPort: Send + Sync {
    /// Create a payment intent for `amount` in `currency`.
    ///
    /// One attempt only; retries are the caller's decision.
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<PaymentIntent, PayError>;
}

// =============================================================================
// Stub Gateway
// =============================================================================

/// Stub payment gateway for testing.
///
/// Issues deterministic intents and can simulate a provider failure on
/// the next call.
pub struct StubPaymentGateway {
    /// Intent counter for generating IDs
    counter: RwLock<u64>,
    /// Whether to simulate a failure on the next call
    fail_next: RwLock<bool>,
}

impl StubPaymentGateway {
    /// Create a new stub gateway.
    pub fn new() -> Self {
        Self {
            counter: RwLock::new(0),
            fail_next: RwLock::new(false),
        }
    }

    /// Configure the next intent creation to fail.
    pub fn set_fail_next(&self, fail: bool) {
        let mut fail_next = self.fail_next.write().unwrap();
        *fail_next = fail;
    }

    /// Number of intents created so far.
    pub fn created_count(&self) -> u64 {
        *self.counter.read().unwrap()
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false; // Reset after check
        fail
    }
}

impl Default for StubPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentPort for StubPaymentGateway {
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<PaymentIntent, PayError> {
        if amount <= Decimal::ZERO {
            return Err(PayError::InvalidAmount(format!("amount must be positive, got {amount}")));
        }
        if self.should_fail() {
            return Err(PayError::Provider {
                code: Some("card_declined".to_string()),
                message: "Simulated provider failure".to_string(),
            });
        }

        let id = {
            let mut counter = self.counter.write().unwrap();
            *counter += 1;
            format!("pi_stub_{}", *counter)
        };

        tracing::debug!(%amount, currency, description, intent = %id, "Stub: payment intent created");

        Ok(PaymentIntent {
            client_secret: format!("{id}_secret"),
            id,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_stub_creates_sequential_intents() {
        let gateway = StubPaymentGateway::new();

        let first = gateway.create_payment_intent(dec!(13), "usd", "Tiffin Order").await.unwrap();
        let second = gateway.create_payment_intent(dec!(20), "usd", "Tiffin Order").await.unwrap();

        assert_eq!(first.id, "pi_stub_1");
        assert_eq!(first.client_secret, "pi_stub_1_secret");
        assert_eq!(second.id, "pi_stub_2");
        assert_eq!(gateway.created_count(), 2);
    }

    #[tokio::test]
    async fn test_stub_rejects_non_positive_amount() {
        let gateway = StubPaymentGateway::new();
        assert!(gateway.create_payment_intent(dec!(0), "usd", "x").await.is_err());
        assert!(gateway.create_payment_intent(dec!(-5), "usd", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_stub_simulated_failure_resets() {
        let gateway = StubPaymentGateway::new();
        gateway.set_fail_next(true);

        let failed = gateway.create_payment_intent(dec!(13), "usd", "x").await;
        assert!(matches!(failed, Err(PayError::Provider { .. })));

        // Next call succeeds again.
        let ok = gateway.create_payment_intent(dec!(13), "usd", "x").await;
        assert!(ok.is_ok());
    }
}
