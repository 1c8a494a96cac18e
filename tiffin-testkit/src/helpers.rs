//! Fixture builders and store seeding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::Result;
use tiffin_domain::{Address, Customer, Driver, Meal, Price, Restaurant, RestaurantId};
use tiffin_store::Store;

/// Build a restaurant with plausible contact data.
pub fn sample_restaurant(name: &str) -> Restaurant {
    Restaurant::new(
        name,
        "555-0100",
        Address::new("12 Tandoor Street").expect("fixture address"),
        None,
    )
}

/// Build a catalog meal for `restaurant_id`.
pub fn sample_meal(restaurant_id: RestaurantId, name: &str, price: Decimal) -> Meal {
    Meal::new(
        restaurant_id,
        name,
        "a house favorite",
        Price::new(price).expect("fixture price"),
        None,
    )
}

/// Build a customer with a delivery address.
pub fn sample_customer(name: &str) -> Customer {
    Customer::new(
        name,
        "555-0101",
        Address::new("1 Curry Lane").expect("fixture address"),
        None,
    )
}

/// Build a driver with an empty profile.
pub fn sample_driver(name: &str) -> Driver {
    Driver::new(name, "555-0102", None)
}

/// Everything `seed_marketplace` created.
pub struct SeededMarketplace {
    /// The one seeded restaurant
    pub restaurant: Restaurant,
    /// Its catalog: \[meal_a at 5.00, meal_b at 3.00\]
    pub meals: Vec<Meal>,
    /// A customer with no orders yet
    pub customer: Customer,
    /// Two idle drivers
    pub drivers: Vec<Driver>,
}

/// Seed a store with the canonical test marketplace:
/// one restaurant with meals at 5.00 and 3.00, one customer, two
/// drivers.
pub async fn seed_marketplace(store: &dyn Store) -> Result<SeededMarketplace> {
    let restaurant = sample_restaurant("Masala House");
    store.restaurants().save(&restaurant).await?;

    let meal_a = sample_meal(restaurant.id, "Butter Chicken", dec!(5));
    let meal_b = sample_meal(restaurant.id, "Garlic Naan", dec!(3));
    store.meals().save(&meal_a).await?;
    store.meals().save(&meal_b).await?;

    let customer = sample_customer("Priya");
    store.customers().save(&customer).await?;

    let driver_one = sample_driver("Dana");
    let driver_two = sample_driver("Miguel");
    store.drivers().save(&driver_one).await?;
    store.drivers().save(&driver_two).await?;

    Ok(SeededMarketplace {
        restaurant,
        meals: vec![meal_a, meal_b],
        customer,
        drivers: vec![driver_one, driver_two],
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tiffin_store::MemoryStore;

    #[tokio::test]
    async fn test_seed_marketplace_populates_store() {
        let store = MemoryStore::new();
        let seeded = seed_marketplace(&store).await.unwrap();

        let restaurants = store.restaurants().find_all().await.unwrap();
        assert_eq!(restaurants.len(), 1);

        let catalog = store.meals().find_by_restaurant(seeded.restaurant.id).await.unwrap();
        assert_eq!(catalog.len(), 2);

        assert!(store.customers().find_by_id(seeded.customer.id).await.unwrap().is_some());
        assert_eq!(seeded.drivers.len(), 2);
    }
}
