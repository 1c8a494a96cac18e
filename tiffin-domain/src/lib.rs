//! Tiffin Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains entities, value objects, cart pricing, and revenue bucketing.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod pricing;
pub mod revenue;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{
    Customer, CustomerId, Driver, DriverId, Meal, MealId, Order, OrderId, OrderLineItem,
    Restaurant, RestaurantId,
};
pub use pricing::{price_cart, CartItem, PricedCart};
pub use value_objects::{
    Address, DomainError, Location, MediaRef, OrderStatus, Price, Quantity, Vehicle,
};
