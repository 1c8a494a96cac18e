//! Domain Entities for Tiffin
//!
//! Core marketplace entities with identity and lifecycle.
//! Orders carry the delivery state machine; everything else is
//! read-mostly catalog and profile data.

use crate::value_objects::{
    Address, DomainError, Location, MediaRef, OrderStatus, Price, Quantity, Vehicle,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for a Customer
pub type CustomerId = Uuid;

/// Unique identifier for a Driver
pub type DriverId = Uuid;

/// Unique identifier for a Restaurant
pub type RestaurantId = Uuid;

/// Unique identifier for a Meal
pub type MealId = Uuid;

/// Unique identifier for an Order
pub type OrderId = Uuid;

// =============================================================================
// Restaurant
// =============================================================================

/// A restaurant offering a catalog of meals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    /// Identifier (UUID v7, time-ordered)
    pub id: RestaurantId,
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Street address
    pub address: Address,
    /// Stored logo reference, if uploaded
    pub logo: Option<MediaRef>,
    /// When the restaurant registered
    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    /// Create a new restaurant
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: Address,
        logo: Option<MediaRef>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            phone: phone.into(),
            address,
            logo,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Meal
// =============================================================================

/// A meal belonging to exactly one restaurant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    /// Identifier
    pub id: MealId,
    /// Owning restaurant
    pub restaurant_id: RestaurantId,
    /// Display name
    pub name: String,
    /// One-line description shown in the catalog
    pub short_description: String,
    /// Catalog price; line-item sub-totals freeze a copy at order time
    pub price: Price,
    /// Stored photo reference, if uploaded
    pub image: Option<MediaRef>,
    /// When the meal was added to the catalog
    pub created_at: DateTime<Utc>,
}

impl Meal {
    /// Create a new catalog meal
    pub fn new(
        restaurant_id: RestaurantId,
        name: impl Into<String>,
        short_description: impl Into<String>,
        price: Price,
        image: Option<MediaRef>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            restaurant_id,
            name: name.into(),
            short_description: short_description.into(),
            price,
            image,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer placing orders
///
/// The id doubles as the identity reference handed out by the
/// identity collaborator. At most one non-terminal order may exist
/// per customer; the store enforces this at order creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier
    pub id: CustomerId,
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Current delivery address; copied onto orders at creation
    pub address: Address,
    /// Stored avatar reference, if uploaded
    pub avatar: Option<MediaRef>,
    /// When the customer registered
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Create a new customer
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: Address,
        avatar: Option<MediaRef>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            phone: phone.into(),
            address,
            avatar,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Driver
// =============================================================================

/// A delivery driver
///
/// Location and vehicle metadata start empty and are filled from the
/// driver app. At most one order may be on the way per driver; the
/// store enforces this at claim time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    /// Identifier
    pub id: DriverId,
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Stored avatar reference, if uploaded
    pub avatar: Option<MediaRef>,
    /// Last reported location, if any
    pub location: Option<Location>,
    /// Vehicle metadata (car model, plate)
    pub vehicle: Vehicle,
    /// When the driver registered
    pub created_at: DateTime<Utc>,
}

impl Driver {
    /// Create a new driver with an empty profile
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        avatar: Option<MediaRef>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            phone: phone.into(),
            avatar,
            location: None,
            vehicle: Vehicle::default(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// One line of an order: a meal, how many, and the frozen sub-total
///
/// `sub_total` is `meal.price * quantity` evaluated at order creation;
/// later catalog price changes never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// The ordered meal
    pub meal_id: MealId,
    /// How many units
    pub quantity: Quantity,
    /// Frozen price * quantity at creation time
    pub sub_total: Decimal,
}

/// An order moving through the delivery lifecycle
///
/// Belongs to exactly one customer and one restaurant. The driver
/// field is `None` until a claim succeeds and is then set exactly
/// once; no reassignment path exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Identifier (UUID v7, time-ordered)
    pub id: OrderId,
    /// Ordering customer
    pub customer_id: CustomerId,
    /// Preparing restaurant
    pub restaurant_id: RestaurantId,
    /// Assigned driver, set by a successful claim
    pub driver_id: Option<DriverId>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Delivery address copied from the request at creation
    pub address: Address,
    /// Frozen sum of line-item sub-totals
    pub total: Decimal,
    /// Line items, in the order the customer submitted them
    pub line_items: Vec<OrderLineItem>,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
    /// When a driver picked the order up, if claimed
    pub picked_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a new order in the initial `Cooking` status
    ///
    /// `line_items` and `total` come from the pricing engine; the
    /// constructor does not recompute them.
    pub fn place(
        customer_id: CustomerId,
        restaurant_id: RestaurantId,
        address: Address,
        line_items: Vec<OrderLineItem>,
        total: Decimal,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            customer_id,
            restaurant_id,
            driver_id: None,
            status: OrderStatus::Cooking,
            address,
            total,
            line_items,
            created_at: Utc::now(),
            picked_at: None,
        }
    }

    /// Whether the order has reached its terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a driver may attempt to claim this order
    pub fn is_claimable(&self) -> bool {
        self.status == OrderStatus::Ready && self.driver_id.is_none()
    }

    /// Whether this order is assigned to the given driver
    pub fn assigned_to(&self, driver_id: DriverId) -> bool {
        self.driver_id == Some(driver_id)
    }

    /// Validate a proposed status transition against the state machine
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStatusTransition` when the chain
    /// does not permit `self.status -> next`.
    pub fn check_transition(&self, next: OrderStatus) -> Result<(), DomainError> {
        if self.status.can_advance_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidStatusTransition {
                from: self.status.name(),
                to: next.name(),
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
