//! Tiffin Daemon Library
//!
//! Runtime orchestrator for the Tiffin food-delivery marketplace.
//!
//! # Architecture
//!
//! ```text
//! Customer/Driver/Restaurant apps
//!             |
//!        API Server (axum)
//!             |
//!     +-------+--------+
//!     |                |
//! Order Manager   Report Service
//!     |                |
//!     +-------+--------+
//!             |
//!        Store (memory / postgres)
//!
//! collaborators: IdentityPort, PaymentPort, MediaResolver
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Order Manager**: Order lifecycle (placement, claim race, delivery)
//! - **Report Service**: Weekly revenue, notifications, restaurant report
//! - **API**: HTTP endpoints for the three caller roles
//! - **Auth/Media**: External collaborator ports with shipped stand-ins
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use tiffind::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_stub(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod config;
pub mod daemon;
pub mod error;
pub mod media;
pub mod order_manager;
pub mod reports;

#[cfg(feature = "postgres")]
pub mod db;

// Re-exports for convenience
pub use auth::{AuthError, IdentityPort, Principal, Role, StaticTokenAuth};
pub use config::{ApiConfig, Config, Environment, MediaConfig, PaymentConfig, ReportConfig};
pub use daemon::Daemon;
pub use error::{ServiceError, ServiceResult};
pub use media::{MediaResolver, PublicMediaResolver};
pub use order_manager::OrderManager;
pub use reports::{ReportService, RestaurantReport, TopDriver};
