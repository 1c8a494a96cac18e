//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the domain.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.
//!
//! Contention lives entirely in `OrderRepository`: `create`, `claim`,
//! `mark_ready`, and `complete` are conditional updates that commit all
//! their field changes atomically or not at all.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tiffin_domain::{
    Customer, CustomerId, Driver, DriverId, Location, Meal, MealId, Order, OrderId,
    Restaurant, RestaurantId, Vehicle,
};

/// Repository for Restaurant entities
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    /// Save a restaurant (insert or update)
    async fn save(&self, restaurant: &Restaurant) -> Result<(), StoreError>;

    /// Find a restaurant by ID
    async fn find_by_id(&self, id: RestaurantId) -> Result<Option<Restaurant>, StoreError>;

    /// All restaurants, newest first
    async fn find_all(&self) -> Result<Vec<Restaurant>, StoreError>;
}

/// Repository for Meal entities
#[async_trait]
pub trait MealRepository: Send + Sync {
    /// Save a meal (insert or update)
    async fn save(&self, meal: &Meal) -> Result<(), StoreError>;

    /// Find a meal by ID
    async fn find_by_id(&self, id: MealId) -> Result<Option<Meal>, StoreError>;

    /// A restaurant's catalog, newest first
    async fn find_by_restaurant(&self, restaurant_id: RestaurantId)
        -> Result<Vec<Meal>, StoreError>;
}

/// Repository for Customer entities
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Save a customer (insert or update)
    async fn save(&self, customer: &Customer) -> Result<(), StoreError>;

    /// Find a customer by ID
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;
}

/// Repository for Driver entities
#[async_trait]
pub trait DriverRepository: Send + Sync {
    /// Save a driver (insert or update)
    async fn save(&self, driver: &Driver) -> Result<(), StoreError>;

    /// Find a driver by ID
    async fn find_by_id(&self, id: DriverId) -> Result<Option<Driver>, StoreError>;

    /// Replace the driver's reported location
    async fn update_location(&self, id: DriverId, location: Location) -> Result<(), StoreError>;

    /// Replace the driver's vehicle metadata
    async fn update_vehicle(&self, id: DriverId, vehicle: Vehicle) -> Result<(), StoreError>;
}

/// Repository for Order entities
///
/// The order record is the unit of contention; every mutation below is
/// one atomic conditional update.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order, guarded by the customer's outstanding-order
    /// constraint.
    ///
    /// Fails with `StoreError::CustomerBusy` when the customer already
    /// has a non-terminal order; the check and the insert are a single
    /// atomic step, never a separate read followed by a write.
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    /// Find an order by ID
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// The customer's most recent order, if any
    async fn find_latest_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Order>, StoreError>;

    /// All ready, unassigned orders, newest first
    async fn find_ready_unclaimed(&self) -> Result<Vec<Order>, StoreError>;

    /// The driver's order currently on the way, if any
    async fn find_en_route_by_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<Order>, StoreError>;

    /// All orders of a restaurant, newest first
    async fn find_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, StoreError>;

    /// All delivered orders of a driver
    async fn find_delivered_by_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<Order>, StoreError>;

    /// Count of the restaurant's orders created strictly after `since`
    async fn count_created_after(
        &self,
        restaurant_id: RestaurantId,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Move the order from `cooking` to `ready`.
    ///
    /// Keyed on `(order_id, restaurant_id, status = cooking)`. Returns
    /// `Ok(true)` when the transition happened, `Ok(false)` as a silent
    /// no-op when the order is owned but not cooking, and `NotFound`
    /// when the order does not exist or belongs to another restaurant.
    async fn mark_ready(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
    ) -> Result<bool, StoreError>;

    /// Claim a ready, unassigned order for a driver.
    ///
    /// One conditional update keyed on `(order_id, status = ready,
    /// driver IS NULL)` and on the driver having no order on the way.
    /// At most one concurrent caller can match; losers are classified,
    /// in precedence order:
    /// - driver already en route -> `DriverBusy`
    /// - order missing -> `NotFound`
    /// - otherwise -> `AlreadyClaimed`
    ///
    /// On success the order is `on_the_way`, assigned to the driver,
    /// with `picked_at` set; the updated order is returned.
    async fn claim(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        picked_at: DateTime<Utc>,
    ) -> Result<Order, StoreError>;

    /// Complete an order the driver is carrying.
    ///
    /// Keyed on `(order_id, driver_id, status = on_the_way)`; any
    /// mismatch, wrong driver included, is `NotFound`. On success the
    /// order is `delivered` and returned.
    async fn complete(&self, order_id: OrderId, driver_id: DriverId)
        -> Result<Order, StoreError>;
}

/// Combined store interface
#[async_trait]
pub trait Store: Send + Sync {
    /// Get restaurant repository
    fn restaurants(&self) -> &dyn RestaurantRepository;

    /// Get meal repository
    fn meals(&self) -> &dyn MealRepository;

    /// Get customer repository
    fn customers(&self) -> &dyn CustomerRepository;

    /// Get driver repository
    fn drivers(&self) -> &dyn DriverRepository;

    /// Get order repository
    fn orders(&self) -> &dyn OrderRepository;
}
