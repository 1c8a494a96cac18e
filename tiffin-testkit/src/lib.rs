//! Test helpers for the tiffin workspace.
//!
//! Fixture builders and store seeding shared by integration tests.

#![warn(clippy::all)]

mod helpers;

pub use helpers::{
    sample_customer, sample_driver, sample_meal, sample_restaurant, seed_marketplace,
    SeededMarketplace,
};

/// Result type for test helpers.
pub type Result<T> = anyhow::Result<T>;
