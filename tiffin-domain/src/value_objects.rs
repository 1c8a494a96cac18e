//! Value Objects for the Tiffin Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::MealId;

/// Domain errors for value object validation and domain rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be a positive integer
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Delivery address must be non-empty
    #[error("Address is required.")]
    MissingAddress,

    /// Location string must be non-empty
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Media reference must be non-empty
    #[error("Invalid media reference: {0}")]
    InvalidMediaRef(String),

    /// A cart must contain at least one line item
    #[error("Order must contain at least one line item.")]
    EmptyCart,

    /// A requested meal does not belong to the target restaurant
    #[error("Meals must be in only one restaurant.")]
    ForeignMeal {
        /// The offending meal ID
        meal_id: MealId,
    },

    /// Attempted an order status transition the state machine forbids
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        /// Current status name
        from: &'static str,
        /// Requested status name
        to: &'static str,
    },

    /// Unknown order status name (when parsing from storage)
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal amount of money
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice("Price must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive whole number of units of one meal
///
/// # Invariants
/// - Must be >= 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value == 0
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::InvalidQuantity(
                "Quantity must be at least 1".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the underlying count
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Quantity as a Decimal, for money arithmetic
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Order lifecycle status
///
/// The state machine is a strict linear chain:
///
/// ```text
/// Cooking -> Ready -> OnTheWay -> Delivered
/// ```
///
/// No transition skips a state and no backward transition exists.
/// `Delivered` is the only terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Restaurant is preparing the order (initial status)
    Cooking,
    /// Prepared and waiting for a driver to claim it
    Ready,
    /// Claimed by a driver, in transit to the customer
    OnTheWay,
    /// Handed to the customer (terminal)
    Delivered,
}

impl OrderStatus {
    /// Storage/wire name of the status
    pub fn name(&self) -> &'static str {
        match self {
            OrderStatus::Cooking => "cooking",
            OrderStatus::Ready => "ready",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Human-readable label of the status
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Cooking => "Cooking",
            OrderStatus::Ready => "Ready",
            OrderStatus::OnTheWay => "On the way",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Whether no further transitions are permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// The single status that may follow this one, if any
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Cooking => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::OnTheWay),
            OrderStatus::OnTheWay => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    /// Whether the chain permits moving from `self` to `next`
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        self.successor() == Some(next)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cooking" => Ok(OrderStatus::Cooking),
            "ready" => Ok(OrderStatus::Ready),
            "on_the_way" => Ok(OrderStatus::OnTheWay),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Address
// =============================================================================

/// Delivery address, free-form but never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create a new Address with validation
    ///
    /// # Errors
    /// Returns `DomainError::MissingAddress` if the trimmed value is empty
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::MissingAddress);
        }
        Ok(Self(value))
    }

    /// Get the address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Location
// =============================================================================

/// Driver location, as reported by the driver app
///
/// Free-form text; drivers typically report `"lat,long"`, which
/// [`Location::as_coordinates`] can recover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location(String);

impl Location {
    /// Create a new Location with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidLocation` if the trimmed value is empty
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidLocation("Location must be non-empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the raw location string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the location as a `(lat, long)` pair when it has that shape
    pub fn as_coordinates(&self) -> Option<(f64, f64)> {
        let (lat, long) = self.0.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let long = long.trim().parse::<f64>().ok()?;
        Some((lat, long))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Vehicle
// =============================================================================

/// Driver vehicle metadata
///
/// Both fields start empty and are filled when the driver updates
/// their profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Car model (e.g. "Toyota Prius")
    pub car_model: String,
    /// License plate number
    pub plate_number: String,
}

impl Vehicle {
    /// Create vehicle metadata
    pub fn new(car_model: impl Into<String>, plate_number: impl Into<String>) -> Self {
        Self {
            car_model: car_model.into(),
            plate_number: plate_number.into(),
        }
    }
}

// =============================================================================
// Media Reference
// =============================================================================

/// Opaque reference to a stored image (avatar, logo, meal photo)
///
/// The core never holds raw bytes; a media resolver turns the
/// reference into a fetchable URL at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef(String);

impl MediaRef {
    /// Create a new media reference
    ///
    /// # Errors
    /// Returns `DomainError::InvalidMediaRef` if the value is empty
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidMediaRef("Media reference must be non-empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the storage key
    pub fn key(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Tests
// =============================================================================
