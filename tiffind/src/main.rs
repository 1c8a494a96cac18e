//! Tiffin Daemon
//!
//! HTTP backend for the Tiffin food-delivery marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p tiffind
//!
//! # Start with custom environment
//! TIFFIN_ENV=test TIFFIN_API_PORT=8081 cargo run -p tiffind
//! ```
//!
//! # Environment Variables
//!
//! - `TIFFIN_ENV`: Environment (test, development, production)
//! - `TIFFIN_API_HOST`: API host (default: 0.0.0.0)
//! - `TIFFIN_API_PORT`: API port (default: 8080)
//! - `TIFFIN_STRIPE_SECRET_KEY`: Stripe secret key (stub gateway when unset)
//! - `TIFFIN_CURRENCY`: Charge currency (default: usd)
//! - `TIFFIN_REVENUE_UTC_OFFSET_MINUTES`: Revenue week anchor offset (default: 0)
//! - `TIFFIN_MEDIA_BASE_URL`: Public base URL for stored media references

use std::sync::Arc;

use tiffin_pay::{PaymentPort, StripeGateway, StubPaymentGateway};
#[cfg(not(feature = "postgres"))]
use tiffin_store::MemoryStore;
use tiffind::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tiffind=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Tiffin Daemon"
    );

    // Payment gateway: real Stripe when a key is configured, stub otherwise
    let payments: Arc<dyn PaymentPort> = match &config.payments.stripe_secret_key {
        Some(key) => {
            info!("Using Stripe payment gateway");
            Arc::new(StripeGateway::new(key.clone()))
        }
        None => {
            info!("No Stripe key configured, using stub payment gateway");
            Arc::new(StubPaymentGateway::new())
        }
    };

    // Store: PostgreSQL when the feature is enabled, in-memory otherwise
    #[cfg(feature = "postgres")]
    let store = Arc::new(tiffind::db::connect_store().await?);
    #[cfg(not(feature = "postgres"))]
    let store = Arc::new(MemoryStore::new());

    // Create and run daemon
    let daemon = Daemon::new(config, store, payments);
    daemon.run().await?;

    Ok(())
}
