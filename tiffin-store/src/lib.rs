//! Tiffin Storage Layer
//!
//! Provides persistence for restaurants, meals, customers, drivers,
//! and orders.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **In-memory store**: Fast implementation for testing and development
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//!
//! Every state-changing order operation is a single atomic conditional
//! update: creation is guarded by the customer's outstanding-order
//! check, a claim is keyed on `(order, status = ready, driver IS NULL)`
//! plus the driver-busy check, and completion is keyed on the assigned
//! driver. The in-memory store holds one write guard across
//! check-and-mutate; the PostgreSQL store expresses the same conditions
//! in SQL `WHERE` clauses.
//!
//! # Usage
//!
//! ```rust
//! use tiffin_store::{MemoryStore, Store};
//! use tiffin_domain::{Address, Restaurant};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!
//!     let restaurant = Restaurant::new(
//!         "Masala House",
//!         "555-0100",
//!         Address::new("1 Curry Lane").unwrap(),
//!         None,
//!     );
//!     store.restaurants().save(&restaurant).await.unwrap();
//!
//!     let all = store.restaurants().find_all().await.unwrap();
//!     println!("Restaurants: {}", all.len());
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use repository::{
    CustomerRepository, DriverRepository, MealRepository, OrderRepository,
    RestaurantRepository, Store,
};
