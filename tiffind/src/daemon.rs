//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Order Manager (order lifecycle)
//! - Report Service (revenue, notifications)
//! - Identity and media collaborators
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize components
//! 3. Seed demo data outside production
//! 4. Start API server
//! 5. Block until SIGINT, then shut down

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

use tiffin_domain::{Address, Customer, Driver, Meal, Price, Restaurant};
use tiffin_pay::{PaymentPort, StubPaymentGateway};
use tiffin_store::{MemoryStore, Store};

use crate::api::{create_router, AppState};
use crate::auth::{IdentityPort, Principal, Role, StaticTokenAuth};
use crate::config::{Config, Environment};
use crate::error::{ServiceError, ServiceResult};
use crate::media::PublicMediaResolver;
use crate::order_manager::OrderManager;
use crate::reports::ReportService;

use rust_decimal_macros::dec;

// =============================================================================
// Daemon
// =============================================================================

/// The main Tiffin daemon.
pub struct Daemon<S: Store + 'static> {
    /// Configuration
    config: Config,
    /// Shared API state
    state: Arc<AppState<S>>,
    /// Token table (identity collaborator stand-in)
    auth: Arc<StaticTokenAuth>,
}

impl Daemon<MemoryStore> {
    /// Create a new daemon with stub components (for testing/development).
    pub fn new_stub(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(StubPaymentGateway::new()),
        )
    }
}

impl<S: Store + 'static> Daemon<S> {
    /// Create a new daemon over a store and payment gateway.
    pub fn new(config: Config, store: Arc<S>, payments: Arc<dyn PaymentPort>) -> Self {
        let auth = Arc::new(StaticTokenAuth::new());
        let manager = Arc::new(OrderManager::new(
            store.clone(),
            payments,
            config.payments.currency.clone(),
        ));
        let reports = Arc::new(ReportService::new(store.clone(), config.reports.offset()));
        let media = Arc::new(PublicMediaResolver::new(config.media.base_url.clone()));

        let state = Arc::new(AppState {
            store,
            manager,
            reports,
            auth: auth.clone() as Arc<dyn IdentityPort>,
            media,
        });

        Self { config, state, auth }
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> ServiceResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Tiffin daemon"
        );

        // 1. Seed demo data outside production
        if self.config.environment != Environment::Production {
            self.seed_demo_data().await?;
        }

        // 2. Start API server
        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        // 3. Block until shutdown signal
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| ServiceError::Config(format!("Failed to listen for signals: {e}")))?;
        info!("Received shutdown signal");

        // 4. Graceful shutdown
        self.shutdown().await
    }

    /// Start the API server.
    pub async fn start_api_server(&self) -> ServiceResult<SocketAddr> {
        let router = create_router(self.state.clone());
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServiceError::Config(format!("Failed to bind to {addr}: {e}")))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Config(format!("Failed to get local address: {e}")))?;

        // Spawn the server task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }

    /// Seed a demo marketplace and log access tokens for it.
    ///
    /// Identity issuance is an external collaborator's job; in test and
    /// development the daemon stands one in so the API is immediately
    /// usable.
    async fn seed_demo_data(&self) -> ServiceResult<()> {
        let store = &self.state.store;

        let restaurant = Restaurant::new(
            "Masala House",
            "555-0100",
            Address::new("12 Tandoor Street")?,
            None,
        );
        store.restaurants().save(&restaurant).await?;

        let meals = [
            Meal::new(restaurant.id, "Butter Chicken", "slow-simmered", Price::new(dec!(5))?, None),
            Meal::new(restaurant.id, "Garlic Naan", "tandoor-baked", Price::new(dec!(3))?, None),
        ];
        for meal in &meals {
            store.meals().save(meal).await?;
        }

        let customer = Customer::new("Priya", "555-0101", Address::new("1 Curry Lane")?, None);
        store.customers().save(&customer).await?;

        let driver = Driver::new("Dana", "555-0102", None);
        store.drivers().save(&driver).await?;

        let ttl = Duration::days(7);
        let principals = [
            (Role::Customer, customer.id),
            (Role::Driver, driver.id),
            (Role::Restaurant, restaurant.id),
        ];
        for (role, entity_id) in principals {
            let token = self.auth.issue(Principal { role, entity_id }, ttl);
            info!(%role, %entity_id, token, "Demo token issued");
        }

        info!(restaurant = %restaurant.name, meals = meals.len(), "Demo marketplace seeded");

        Ok(())
    }

    /// Graceful shutdown.
    async fn shutdown(&self) -> ServiceResult<()> {
        info!("Initiating graceful shutdown");

        let ready = self.state.store.orders().find_ready_unclaimed().await?;
        info!(unclaimed_ready_orders = ready.len(), "Shutdown complete");

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_daemon_stub_creation() {
        let config = Config::test();
        let daemon = Daemon::new_stub(config);

        let ready = daemon.state.manager.ready_orders().await.unwrap();
        assert!(ready.is_empty());
    }

    #[tokio::test]
    async fn test_daemon_api_server_start() {
        let config = Config::test();
        let daemon = Daemon::new_stub(config);

        let addr = daemon.start_api_server().await.unwrap();

        // Server should be running on a port
        assert!(addr.port() > 0);

        // Can make a health check request
        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_seed_demo_data_populates_marketplace() {
        let config = Config::test();
        let daemon = Daemon::new_stub(config);

        daemon.seed_demo_data().await.unwrap();

        let restaurants = daemon.state.manager.list_restaurants().await.unwrap();
        assert_eq!(restaurants.len(), 1);

        let meals = daemon
            .state
            .manager
            .list_meals(restaurants[0].id)
            .await
            .unwrap();
        assert_eq!(meals.len(), 2);
    }
}
