//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Thread-safe using RwLock for concurrent access.
//!
//! All order mutations run inside a single write guard on the order
//! map, so the outstanding-order guard, the claim, and the completion
//! check-and-mutate atomically, matching the guarantee the PostgreSQL
//! store gets from conditional `UPDATE ... WHERE` statements.

use crate::error::StoreError;
use crate::repository::{
    CustomerRepository, DriverRepository, MealRepository, OrderRepository,
    RestaurantRepository, Store,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use tiffin_domain::{
    Customer, CustomerId, Driver, DriverId, Location, Meal, MealId, Order, OrderId,
    OrderStatus, Restaurant, RestaurantId, Vehicle,
};

/// In-memory store for testing and development
pub struct MemoryStore {
    restaurants: RwLock<HashMap<RestaurantId, Restaurant>>,
    meals: RwLock<HashMap<MealId, Meal>>,
    customers: RwLock<HashMap<CustomerId, Customer>>,
    drivers: RwLock<HashMap<DriverId, Driver>>,
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            restaurants: RwLock::new(HashMap::new()),
            meals: RwLock::new(HashMap::new()),
            customers: RwLock::new(HashMap::new()),
            drivers: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of orders
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.restaurants.write().unwrap().clear();
        self.meals.write().unwrap().clear();
        self.customers.write().unwrap().clear();
        self.drivers.write().unwrap().clear();
        self.orders.write().unwrap().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest first, by time-ordered id
fn sort_newest_first<T, F: Fn(&T) -> uuid::Uuid>(items: &mut [T], id_of: F) {
    items.sort_by(|a, b| id_of(b).cmp(&id_of(a)));
}

// =============================================================================
// Restaurant Repository Implementation
// =============================================================================

#[async_trait]
impl RestaurantRepository for MemoryStore {
    async fn save(&self, restaurant: &Restaurant) -> Result<(), StoreError> {
        let mut restaurants = self.restaurants.write().unwrap();
        restaurants.insert(restaurant.id, restaurant.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RestaurantId) -> Result<Option<Restaurant>, StoreError> {
        let restaurants = self.restaurants.read().unwrap();
        Ok(restaurants.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Restaurant>, StoreError> {
        let restaurants = self.restaurants.read().unwrap();
        let mut all: Vec<Restaurant> = restaurants.values().cloned().collect();
        sort_newest_first(&mut all, |r| r.id);
        Ok(all)
    }
}

// =============================================================================
// Meal Repository Implementation
// =============================================================================

#[async_trait]
impl MealRepository for MemoryStore {
    async fn save(&self, meal: &Meal) -> Result<(), StoreError> {
        let mut meals = self.meals.write().unwrap();
        meals.insert(meal.id, meal.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: MealId) -> Result<Option<Meal>, StoreError> {
        let meals = self.meals.read().unwrap();
        Ok(meals.get(&id).cloned())
    }

    async fn find_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Meal>, StoreError> {
        let meals = self.meals.read().unwrap();
        let mut catalog: Vec<Meal> = meals
            .values()
            .filter(|m| m.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        sort_newest_first(&mut catalog, |m| m.id);
        Ok(catalog)
    }
}

// =============================================================================
// Customer Repository Implementation
// =============================================================================

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn save(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut customers = self.customers.write().unwrap();
        customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().unwrap();
        Ok(customers.get(&id).cloned())
    }
}

// =============================================================================
// Driver Repository Implementation
// =============================================================================

#[async_trait]
impl DriverRepository for MemoryStore {
    async fn save(&self, driver: &Driver) -> Result<(), StoreError> {
        let mut drivers = self.drivers.write().unwrap();
        drivers.insert(driver.id, driver.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let drivers = self.drivers.read().unwrap();
        Ok(drivers.get(&id).cloned())
    }

    async fn update_location(&self, id: DriverId, location: Location) -> Result<(), StoreError> {
        let mut drivers = self.drivers.write().unwrap();
        let driver = drivers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("driver", id.to_string()))?;
        driver.location = Some(location);
        Ok(())
    }

    async fn update_vehicle(&self, id: DriverId, vehicle: Vehicle) -> Result<(), StoreError> {
        let mut drivers = self.drivers.write().unwrap();
        let driver = drivers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("driver", id.to_string()))?;
        driver.vehicle = vehicle;
        Ok(())
    }
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        // Guard and insert under one write lock: no interleaving between
        // the outstanding-order check and the insert.
        let mut orders = self.orders.write().unwrap();

        let outstanding = orders
            .values()
            .any(|o| o.customer_id == order.customer_id && !o.is_terminal());
        if outstanding {
            return Err(StoreError::CustomerBusy { customer_id: order.customer_id });
        }

        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.get(&id).cloned())
    }

    async fn find_latest_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .max_by_key(|o| o.id)
            .cloned())
    }

    async fn find_ready_unclaimed(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut ready: Vec<Order> = orders
            .values()
            .filter(|o| o.is_claimable())
            .cloned()
            .collect();
        sort_newest_first(&mut ready, |o| o.id);
        Ok(ready)
    }

    async fn find_en_route_by_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .find(|o| o.driver_id == Some(driver_id) && o.status == OrderStatus::OnTheWay)
            .cloned())
    }

    async fn find_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut found: Vec<Order> = orders
            .values()
            .filter(|o| o.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        sort_newest_first(&mut found, |o| o.id);
        Ok(found)
    }

    async fn find_delivered_by_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.driver_id == Some(driver_id) && o.status == OrderStatus::Delivered)
            .cloned()
            .collect())
    }

    async fn count_created_after(
        &self,
        restaurant_id: RestaurantId,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.restaurant_id == restaurant_id && o.created_at > since)
            .count() as u64)
    }

    async fn mark_ready(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
    ) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().unwrap();

        let order = orders
            .get_mut(&order_id)
            .filter(|o| o.restaurant_id == restaurant_id)
            .ok_or_else(|| StoreError::not_found("order", order_id.to_string()))?;

        if order.status != OrderStatus::Cooking {
            // Silent no-op: the restaurant hit "ready" on an order that
            // already moved on.
            return Ok(false);
        }

        order.status = OrderStatus::Ready;
        Ok(true)
    }

    async fn claim(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        picked_at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        // Everything under one write guard: the busy check, the
        // claimability check, and the assignment are a single atomic
        // step, so two drivers can never both match the same order.
        let mut orders = self.orders.write().unwrap();

        let busy = orders
            .values()
            .any(|o| o.driver_id == Some(driver_id) && o.status == OrderStatus::OnTheWay);
        if busy {
            return Err(StoreError::DriverBusy { driver_id });
        }

        let order = orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id.to_string()))?;

        if !order.is_claimable() {
            return Err(StoreError::AlreadyClaimed { order_id });
        }

        order.driver_id = Some(driver_id);
        order.status = OrderStatus::OnTheWay;
        order.picked_at = Some(picked_at);

        Ok(order.clone())
    }

    async fn complete(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
    ) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().unwrap();

        // An order that exists but is assigned elsewhere looks identical
        // to a missing one: callers only learn about orders they carry.
        let order = orders
            .get_mut(&order_id)
            .filter(|o| o.driver_id == Some(driver_id) && o.status == OrderStatus::OnTheWay)
            .ok_or_else(|| StoreError::not_found("order", order_id.to_string()))?;

        order.status = OrderStatus::Delivered;
        Ok(order.clone())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for MemoryStore {
    fn restaurants(&self) -> &dyn RestaurantRepository {
        self
    }

    fn meals(&self) -> &dyn MealRepository {
        self
    }

    fn customers(&self) -> &dyn CustomerRepository {
        self
    }

    fn drivers(&self) -> &dyn DriverRepository {
        self
    }

    fn orders(&self) -> &dyn OrderRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
