//! Stripe REST adapter for payment intents.
//!
//! Creates payment intents via `POST /v1/payment_intents`:
//! - Bearer authentication with the account's secret key
//! - Form-encoded body (Stripe does not take JSON requests)
//! - Amounts in minor units (cents for USD)
//!
//! The secret key is injected at construction (never read from global
//! state) and zeroized on drop.

use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{PayError, PaymentIntent, PaymentPort};
use async_trait::async_trait;

// =============================================================================
// Constants
// =============================================================================

/// Stripe REST API base URL
const STRIPE_API_URL: &str = "https://api.stripe.com";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Secret key
// =============================================================================

/// Stripe secret key, zeroized on drop and redacted in Debug output.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecretKey(String);

impl SecretKey {
    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(****)")
    }
}

// =============================================================================
// Response DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
}

// =============================================================================
// Stripe Gateway
// =============================================================================

/// Stripe payment-intent client.
#[derive(Debug)]
pub struct StripeGateway {
    /// HTTP client
    client: Client,
    /// Account secret key
    secret_key: SecretKey,
    /// API base URL (overridable for tests)
    base_url: String,
}

impl StripeGateway {
    /// Create a new Stripe gateway.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - Stripe secret key (`sk_live_...` / `sk_test_...`)
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(),
            secret_key: SecretKey(secret_key),
            base_url: STRIPE_API_URL.to_string(),
        }
    }

    /// Create a gateway against a custom base URL (for testing).
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            secret_key: SecretKey(secret_key),
            base_url,
        }
    }
}

/// Convert a decimal monetary amount into provider minor units.
///
/// # Errors
/// Returns `PayError::InvalidAmount` when the amount is not positive or
/// does not fit minor units exactly.
fn minor_units(amount: Decimal) -> Result<i64, PayError> {
    if amount <= Decimal::ZERO {
        return Err(PayError::InvalidAmount(format!("amount must be positive, got {amount}")));
    }

    let cents = amount * Decimal::from(100);
    if cents.fract() != Decimal::ZERO {
        return Err(PayError::InvalidAmount(format!(
            "amount {amount} has sub-cent precision"
        )));
    }

    cents
        .to_i64()
        .ok_or_else(|| PayError::InvalidAmount(format!("amount {amount} out of range")))
}

#[async_trait]
impl PaymentPort for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<PaymentIntent, PayError> {
        let amount_minor = minor_units(amount)?;
        let url = format!("{}/v1/payment_intents", self.base_url);

        let params = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_string()),
            ("description", description.to_string()),
        ];

        let request = self
            .client
            .post(&url)
            .bearer_auth(self.secret_key.expose())
            .form(&params)
            .send();

        let response = timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), request)
            .await
            .map_err(|_| PayError::Timeout)?
            .map_err(|e| PayError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PayError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            // Stripe error bodies carry {"error": {"message", "code"}}.
            let parsed: Result<ApiErrorResponse, _> = serde_json::from_str(&body);
            return Err(match parsed {
                Ok(err) => PayError::Provider {
                    code: err.error.code,
                    message: err
                        .error
                        .message
                        .unwrap_or_else(|| format!("HTTP {status}")),
                },
                Err(_) => PayError::Provider {
                    code: None,
                    message: format!("HTTP {status}: {body}"),
                },
            });
        }

        let intent: IntentResponse = serde_json::from_str(&body)
            .map_err(|e| PayError::ParseError(e.to_string()))?;

        tracing::info!(intent = %intent.id, amount_minor, currency, "Payment intent created");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
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

    #[test]
    fn test_minor_units_whole_dollars() {
        assert_eq!(minor_units(dec!(13)).unwrap(), 1300);
        assert_eq!(minor_units(dec!(0.50)).unwrap(), 50);
        assert_eq!(minor_units(dec!(19.99)).unwrap(), 1999);
    }

    #[test]
    fn test_minor_units_rejects_bad_amounts() {
        assert!(minor_units(dec!(0)).is_err());
        assert!(minor_units(dec!(-5)).is_err());
        assert!(minor_units(dec!(0.005)).is_err());
    }

    #[test]
    fn test_secret_key_is_redacted() {
        let gateway = StripeGateway::new("sk_test_123".to_string());
        let debug = format!("{gateway:?}");
        assert!(!debug.contains("sk_test_123"));
        assert!(debug.contains("SecretKey(****)"));
    }

    #[test]
    fn test_error_body_parsing() {
        let body = r#"{"error": {"message": "Amount must be at least 50 cents", "code": "amount_too_small", "type": "invalid_request_error"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.code.as_deref(), Some("amount_too_small"));
    }
}
