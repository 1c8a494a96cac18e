//! Cart pricing: the totals engine.
//!
//! Prices a submitted cart against a single restaurant's catalog.
//! Validation is all-or-nothing: one foreign meal rejects the whole
//! cart, and nothing is persisted by the caller on failure.
//!
//! Pricing runs exactly once, at order creation. Sub-totals and the
//! order total are frozen; later catalog price changes never
//! retroactively affect an existing order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{Meal, MealId, OrderLineItem};
use crate::value_objects::{DomainError, Quantity};

/// One requested cart line: which meal, how many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Requested meal
    pub meal_id: MealId,
    /// How many units
    pub quantity: Quantity,
}

/// A fully priced cart, ready to become an order.
#[derive(Debug, Clone)]
pub struct PricedCart {
    /// Frozen line items, in submission order
    pub line_items: Vec<OrderLineItem>,
    /// Sum of line-item sub-totals
    pub total: Decimal,
}

/// Price a cart against the target restaurant's catalog.
///
/// Every requested meal must appear in `catalog` (the meals of the one
/// target restaurant); any miss fails the entire cart. Duplicate meal
/// ids are additive: each occurrence becomes its own line item.
///
/// ```
/// # use rust_decimal_macros::dec;
/// # use uuid::Uuid;
/// # use tiffin_domain::entities::Meal;
/// # use tiffin_domain::pricing::{price_cart, CartItem};
/// # use tiffin_domain::value_objects::{Price, Quantity};
/// let restaurant_id = Uuid::now_v7();
/// let pizza = Meal::new(restaurant_id, "Pizza", "", Price::new(dec!(5)).unwrap(), None);
/// let salad = Meal::new(restaurant_id, "Salad", "", Price::new(dec!(3)).unwrap(), None);
///
/// let cart = price_cart(
///     &[pizza.clone(), salad.clone()],
///     &[
///         CartItem { meal_id: pizza.id, quantity: Quantity::new(2).unwrap() },
///         CartItem { meal_id: salad.id, quantity: Quantity::new(1).unwrap() },
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(cart.total, dec!(13));
/// ```
///
/// # Errors
///
/// - `DomainError::EmptyCart` when `items` is empty
/// - `DomainError::ForeignMeal` when a meal is not in `catalog`
pub fn price_cart(catalog: &[Meal], items: &[CartItem]) -> Result<PricedCart, DomainError> {
    if items.is_empty() {
        return Err(DomainError::EmptyCart);
    }

    let mut line_items = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for item in items {
        let meal = catalog
            .iter()
            .find(|meal| meal.id == item.meal_id)
            .ok_or(DomainError::ForeignMeal { meal_id: item.meal_id })?;

        let sub_total = meal.price.as_decimal() * item.quantity.as_decimal();
        total += sub_total;
        line_items.push(OrderLineItem {
            meal_id: meal.id,
            quantity: item.quantity,
            sub_total,
        });
    }

    Ok(PricedCart { line_items, total })
}

// =============================================================================
// Tests
// =============================================================================
