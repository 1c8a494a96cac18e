//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{ServiceError, ServiceResult};
use chrono::FixedOffset;
use std::env;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Payment gateway configuration
    pub payments: PaymentConfig,

    /// Report/revenue configuration
    pub reports: ReportConfig,

    /// Media URL resolution configuration
    pub media: MediaConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Stripe secret key; when absent the stub gateway is used
    pub stripe_secret_key: Option<String>,
    /// Charge currency (ISO 4217, lowercase)
    pub currency: String,
}

/// Report/revenue configuration.
///
/// The weekly revenue window anchors to "today" in a fixed UTC offset.
/// Which offset that should be is a deployment policy, not something
/// the core guesses from the server clock.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Offset from UTC, in minutes, used to anchor the revenue week
    pub utc_offset_minutes: i32,
}

impl ReportConfig {
    /// The configured offset as a chrono `FixedOffset`.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("UTC offset"))
    }
}

/// Media URL resolution configuration.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Public base URL stored references resolve against
    pub base_url: String,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> ServiceResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let payments = Self::load_payment_config();
        let reports = Self::load_report_config()?;
        let media = Self::load_media_config();

        Ok(Self {
            api,
            payments,
            reports,
            media,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            payments: PaymentConfig {
                stripe_secret_key: None,
                currency: "usd".to_string(),
            },
            reports: ReportConfig { utc_offset_minutes: 0 },
            media: MediaConfig {
                base_url: "http://media.localhost".to_string(),
            },
            environment: Environment::Test,
        }
    }

    fn load_environment() -> ServiceResult<Environment> {
        let env_str = env::var("TIFFIN_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ServiceError::Config(format!(
                "Invalid TIFFIN_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> ServiceResult<ApiConfig> {
        let host = env::var("TIFFIN_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("TIFFIN_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| ServiceError::Config(format!("Invalid TIFFIN_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_payment_config() -> PaymentConfig {
        PaymentConfig {
            stripe_secret_key: env::var("TIFFIN_STRIPE_SECRET_KEY").ok(),
            currency: env::var("TIFFIN_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        }
    }

    fn load_report_config() -> ServiceResult<ReportConfig> {
        let raw = env::var("TIFFIN_REVENUE_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".to_string());

        let utc_offset_minutes = raw.parse::<i32>().map_err(|_| {
            ServiceError::Config(format!("Invalid TIFFIN_REVENUE_UTC_OFFSET_MINUTES: {}", raw))
        })?;

        if utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ServiceError::Config(format!(
                "TIFFIN_REVENUE_UTC_OFFSET_MINUTES out of range: {}",
                utc_offset_minutes
            )));
        }

        Ok(ReportConfig { utc_offset_minutes })
    }

    fn load_media_config() -> MediaConfig {
        MediaConfig {
            base_url: env::var("TIFFIN_MEDIA_BASE_URL")
                .unwrap_or_else(|_| "http://media.localhost".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            payments: PaymentConfig {
                stripe_secret_key: None,
                currency: "usd".to_string(),
            },
            reports: ReportConfig { utc_offset_minutes: 0 },
            media: MediaConfig {
                base_url: "http://media.localhost".to_string(),
            },
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.payments.currency, "usd");
        assert!(config.payments.stripe_secret_key.is_none());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_report_offset() {
        let utc = ReportConfig { utc_offset_minutes: 0 };
        assert_eq!(utc.offset().local_minus_utc(), 0);

        let kolkata = ReportConfig { utc_offset_minutes: 330 };
        assert_eq!(kolkata.offset().local_minus_utc(), 330 * 60);

        let west = ReportConfig { utc_offset_minutes: -480 };
        assert_eq!(west.offset().local_minus_utc(), -480 * 60);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
