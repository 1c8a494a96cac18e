//! Order Manager: the order lifecycle service.
//!
//! One object owns every order-touching operation:
//! - Customers: place orders, follow the latest one, watch the driver
//! - Drivers: list ready orders, claim, complete, maintain a profile
//! - Restaurants: mark orders ready
//!
//! The manager sequences guards, pricing, and the state machine; the
//! store's conditional updates provide the actual atomicity. Pricing
//! runs once, before the insert, so a rejected cart leaves nothing
//! behind.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use tiffin_domain::{
    price_cart, Address, CartItem, Customer, CustomerId, Driver, DriverId, Location, Meal,
    Order, OrderId, OrderStatus, Restaurant, RestaurantId, Vehicle,
};
use tiffin_pay::{PayError, PaymentIntent, PaymentPort};
use tiffin_store::Store;

use crate::error::{ServiceError, ServiceResult, LAST_ORDER_NOT_COMPLETED, OUTSTANDING_ORDER_NOT_DELIVERED};

// =============================================================================
// Order Manager
// =============================================================================

/// Coordinates the order lifecycle over the store and the payment port.
pub struct OrderManager<S: Store + 'static> {
    /// Store for persistence
    store: Arc<S>,
    /// Payment provider port
    payments: Arc<dyn PaymentPort>,
    /// Charge currency for payment intents
    currency: String,
}

impl<S: Store + 'static> OrderManager<S> {
    /// Create a new order manager.
    pub fn new(store: Arc<S>, payments: Arc<dyn PaymentPort>, currency: String) -> Self {
        Self { store, payments, currency }
    }

    // =========================================================================
    // Customer operations
    // =========================================================================

    /// All restaurants, newest first.
    pub async fn list_restaurants(&self) -> ServiceResult<Vec<Restaurant>> {
        Ok(self.store.restaurants().find_all().await?)
    }

    /// A restaurant's catalog, newest first.
    pub async fn list_meals(&self, restaurant_id: RestaurantId) -> ServiceResult<Vec<Meal>> {
        self.require_restaurant(restaurant_id).await?;
        Ok(self.store.meals().find_by_restaurant(restaurant_id).await?)
    }

    /// Place a new order for a customer.
    ///
    /// The outstanding-order guard runs before anything else, so a busy
    /// customer gets the conflict regardless of cart validity. The
    /// store's conditional insert re-checks the guard atomically.
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        restaurant_id: RestaurantId,
        address: &str,
        items: &[CartItem],
    ) -> ServiceResult<Order> {
        self.require_customer(customer_id).await?;

        if let Some(latest) = self.store.orders().find_latest_by_customer(customer_id).await? {
            if !latest.is_terminal() {
                return Err(ServiceError::Conflict(LAST_ORDER_NOT_COMPLETED.to_string()));
            }
        }

        let address = Address::new(address)?;
        let restaurant = self.require_restaurant(restaurant_id).await?;

        let catalog = self.store.meals().find_by_restaurant(restaurant_id).await?;
        let priced = price_cart(&catalog, items)?;

        let order = Order::place(
            customer_id,
            restaurant.id,
            address,
            priced.line_items,
            priced.total,
        );
        self.store.orders().create(&order).await?;

        info!(
            order_id = %order.id,
            %customer_id,
            %restaurant_id,
            total = %order.total,
            "Order placed"
        );

        Ok(order)
    }

    /// The customer's most recent order, if any.
    pub async fn latest_order(&self, customer_id: CustomerId) -> ServiceResult<Option<Order>> {
        Ok(self.store.orders().find_latest_by_customer(customer_id).await?)
    }

    /// Status of the customer's most recent order, if any.
    pub async fn latest_order_status(
        &self,
        customer_id: CustomerId,
    ) -> ServiceResult<Option<(OrderId, OrderStatus)>> {
        let latest = self.store.orders().find_latest_by_customer(customer_id).await?;
        Ok(latest.map(|order| (order.id, order.status)))
    }

    /// Where the driver carrying the customer's order is.
    ///
    /// Only meaningful while an order is on the way; `None` otherwise.
    pub async fn driver_location_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> ServiceResult<Option<Location>> {
        let latest = self.store.orders().find_latest_by_customer(customer_id).await?;

        let Some(order) = latest.filter(|o| o.status == OrderStatus::OnTheWay) else {
            return Ok(None);
        };
        let Some(driver_id) = order.driver_id else {
            return Ok(None);
        };

        let driver = self.store.drivers().find_by_id(driver_id).await?;
        Ok(driver.and_then(|d| d.location))
    }

    /// Create a payment intent for the customer's order total.
    ///
    /// Single attempt; a provider rejection surfaces as-is.
    pub async fn create_payment_intent(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        description: &str,
    ) -> ServiceResult<PaymentIntent> {
        self.require_customer(customer_id).await?;

        self.payments
            .create_payment_intent(amount, &self.currency, description)
            .await
            .map_err(|err| match err {
                PayError::InvalidAmount(msg) => ServiceError::Validation(msg),
                other => ServiceError::Provider(other),
            })
    }

    // =========================================================================
    // Driver operations
    // =========================================================================

    /// All ready, unassigned orders, newest first.
    pub async fn ready_orders(&self) -> ServiceResult<Vec<Order>> {
        Ok(self.store.orders().find_ready_unclaimed().await?)
    }

    /// Claim a ready order for a driver.
    ///
    /// The busy-driver guard runs first; the store's conditional update
    /// then settles the race, letting at most one driver win.
    pub async fn claim_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> ServiceResult<Order> {
        self.require_driver(driver_id).await?;

        if self.store.orders().find_en_route_by_driver(driver_id).await?.is_some() {
            return Err(ServiceError::Conflict(OUTSTANDING_ORDER_NOT_DELIVERED.to_string()));
        }

        let order = self.store.orders().claim(order_id, driver_id, Utc::now()).await?;

        info!(%order_id, %driver_id, "Order claimed");

        Ok(order)
    }

    /// Complete the order the driver is carrying.
    ///
    /// Only the assigned driver can complete; anyone else sees NotFound.
    pub async fn complete_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> ServiceResult<Order> {
        let order = self.store.orders().complete(order_id, driver_id).await?;

        info!(%order_id, %driver_id, total = %order.total, "Order delivered");

        Ok(order)
    }

    /// The driver's current en-route order, if any.
    pub async fn current_delivery(&self, driver_id: DriverId) -> ServiceResult<Option<Order>> {
        Ok(self.store.orders().find_en_route_by_driver(driver_id).await?)
    }

    /// The driver's profile.
    pub async fn driver_profile(&self, driver_id: DriverId) -> ServiceResult<Driver> {
        self.require_driver(driver_id).await
    }

    /// Update the driver's vehicle metadata.
    pub async fn update_driver_profile(
        &self,
        driver_id: DriverId,
        car_model: &str,
        plate_number: &str,
    ) -> ServiceResult<()> {
        self.store
            .drivers()
            .update_vehicle(driver_id, Vehicle::new(car_model, plate_number))
            .await?;

        debug!(%driver_id, car_model, plate_number, "Driver profile updated");
        Ok(())
    }

    /// Update the driver's reported location.
    pub async fn update_driver_location(
        &self,
        driver_id: DriverId,
        location: &str,
    ) -> ServiceResult<()> {
        let location = Location::new(location)?;
        self.store.drivers().update_location(driver_id, location).await?;

        debug!(%driver_id, "Driver location updated");
        Ok(())
    }

    // =========================================================================
    // Restaurant operations
    // =========================================================================

    /// Mark one of the restaurant's cooking orders ready for pickup.
    ///
    /// A silent no-op when the order has already moved on; NotFound
    /// when the order is missing or belongs to another restaurant.
    pub async fn mark_ready(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
    ) -> ServiceResult<()> {
        let transitioned = self.store.orders().mark_ready(restaurant_id, order_id).await?;

        if transitioned {
            info!(%order_id, %restaurant_id, "Order ready for pickup");
        } else {
            debug!(%order_id, %restaurant_id, "Mark-ready ignored: order not cooking");
        }

        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    async fn require_customer(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.store
            .customers()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer not found: {id}")))
    }

    async fn require_driver(&self, id: DriverId) -> ServiceResult<Driver> {
        self.store
            .drivers()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("driver not found: {id}")))
    }

    async fn require_restaurant(&self, id: RestaurantId) -> ServiceResult<Restaurant> {
        self.store
            .restaurants()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("restaurant not found: {id}")))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PICKED_UP_BY_ANOTHER;
    use rust_decimal_macros::dec;
    use tiffin_domain::{Price, Quantity};
    use tiffin_pay::StubPaymentGateway;
    use tiffin_store::MemoryStore;
    use uuid::Uuid;

    struct Fixture {
        manager: OrderManager<MemoryStore>,
        store: Arc<MemoryStore>,
        restaurant: Restaurant,
        meals: Vec<Meal>,
        customer: Customer,
        driver: Driver,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());

        let restaurant = Restaurant::new(
            "Masala House",
            "555-0100",
            Address::new("12 Tandoor Street").unwrap(),
            None,
        );
        store.restaurants().save(&restaurant).await.unwrap();

        let meal_a = Meal::new(restaurant.id, "Butter Chicken", "", Price::new(dec!(5)).unwrap(), None);
        let meal_b = Meal::new(restaurant.id, "Garlic Naan", "", Price::new(dec!(3)).unwrap(), None);
        store.meals().save(&meal_a).await.unwrap();
        store.meals().save(&meal_b).await.unwrap();

        let customer = Customer::new("Priya", "555-0101", Address::new("1 Curry Lane").unwrap(), None);
        store.customers().save(&customer).await.unwrap();

        let driver = Driver::new("Dana", "555-0102", None);
        store.drivers().save(&driver).await.unwrap();

        let manager = OrderManager::new(
            store.clone(),
            Arc::new(StubPaymentGateway::new()),
            "usd".to_string(),
        );

        Fixture { manager, store, restaurant, meals: vec![meal_a, meal_b], customer, driver }
    }

    fn cart(fix: &Fixture) -> Vec<CartItem> {
        vec![
            CartItem { meal_id: fix.meals[0].id, quantity: Quantity::new(2).unwrap() },
            CartItem { meal_id: fix.meals[1].id, quantity: Quantity::new(1).unwrap() },
        ]
    }

    #[tokio::test]
    async fn test_place_order_totals_and_initial_status() {
        let fix = fixture().await;

        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();

        assert_eq!(order.total, dec!(13));
        assert_eq!(order.status, OrderStatus::Cooking);
        assert_eq!(order.line_items.len(), 2);
    }

    #[tokio::test]
    async fn test_place_order_conflict_precedes_cart_validation() {
        let fix = fixture().await;
        fix.manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();

        // Even a nonsense cart reports the outstanding-order conflict.
        let foreign = vec![CartItem { meal_id: Uuid::now_v7(), quantity: Quantity::new(1).unwrap() }];
        let err = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &foreign)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(err.to_string(), LAST_ORDER_NOT_COMPLETED);
    }

    #[tokio::test]
    async fn test_place_order_rejects_cross_restaurant_cart_atomically() {
        let fix = fixture().await;

        let other_restaurant = Restaurant::new(
            "Noodle Bar",
            "555-0103",
            Address::new("3 Broth Road").unwrap(),
            None,
        );
        fix.store.restaurants().save(&other_restaurant).await.unwrap();
        let foreign_meal =
            Meal::new(other_restaurant.id, "Ramen", "", Price::new(dec!(9)).unwrap(), None);
        fix.store.meals().save(&foreign_meal).await.unwrap();

        let mixed = vec![
            CartItem { meal_id: fix.meals[0].id, quantity: Quantity::new(1).unwrap() },
            CartItem { meal_id: foreign_meal.id, quantity: Quantity::new(1).unwrap() },
        ];
        let err = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &mixed)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Meals must be in only one restaurant.");
        // Nothing persisted.
        assert!(fix.manager.latest_order(fix.customer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_requires_address() {
        let fix = fixture().await;
        let err = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "  ", &cart(&fix))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(err.to_string(), "Address is required.");
    }

    #[tokio::test]
    async fn test_claim_and_complete_happy_path() {
        let fix = fixture().await;
        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();

        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();

        let claimed = fix.manager.claim_order(fix.driver.id, order.id).await.unwrap();
        assert_eq!(claimed.status, OrderStatus::OnTheWay);
        assert!(claimed.picked_at.is_some());

        let delivered = fix.manager.complete_order(fix.driver.id, order.id).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_claim_loser_gets_picked_up_by_another() {
        let fix = fixture().await;
        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();
        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();

        let rival = Driver::new("Miguel", "555-0104", None);
        fix.store.drivers().save(&rival).await.unwrap();

        fix.manager.claim_order(fix.driver.id, order.id).await.unwrap();
        let err = fix.manager.claim_order(rival.id, order.id).await.unwrap_err();

        assert_eq!(err.to_string(), PICKED_UP_BY_ANOTHER);
    }

    #[tokio::test]
    async fn test_busy_driver_cannot_claim_again() {
        let fix = fixture().await;
        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();
        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();
        fix.manager.claim_order(fix.driver.id, order.id).await.unwrap();

        // A second ready order from another customer.
        let other_customer =
            Customer::new("Ben", "555-0105", Address::new("2 Curry Lane").unwrap(), None);
        fix.store.customers().save(&other_customer).await.unwrap();
        let second = fix
            .manager
            .place_order(other_customer.id, fix.restaurant.id, "2 Curry Lane", &cart(&fix))
            .await
            .unwrap();
        fix.manager.mark_ready(fix.restaurant.id, second.id).await.unwrap();

        let err = fix.manager.claim_order(fix.driver.id, second.id).await.unwrap_err();
        assert_eq!(err.to_string(), OUTSTANDING_ORDER_NOT_DELIVERED);
    }

    #[tokio::test]
    async fn test_complete_by_wrong_driver_is_not_found() {
        let fix = fixture().await;
        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();
        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();
        fix.manager.claim_order(fix.driver.id, order.id).await.unwrap();

        let impostor = Driver::new("Sam", "555-0106", None);
        fix.store.drivers().save(&impostor).await.unwrap();

        let err = fix.manager.complete_order(impostor.id, order.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_driver_location_for_customer_tracks_en_route_only() {
        let fix = fixture().await;
        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();

        // Cooking: no location.
        assert!(fix
            .manager
            .driver_location_for_customer(fix.customer.id)
            .await
            .unwrap()
            .is_none());

        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();
        fix.manager.claim_order(fix.driver.id, order.id).await.unwrap();
        fix.manager
            .update_driver_location(fix.driver.id, "37.7749,-122.4194")
            .await
            .unwrap();

        let location = fix
            .manager
            .driver_location_for_customer(fix.customer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(location.as_str(), "37.7749,-122.4194");

        // Delivered: no location again.
        fix.manager.complete_order(fix.driver.id, order.id).await.unwrap();
        assert!(fix
            .manager
            .driver_location_for_customer(fix.customer.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_payment_intent_via_stub() {
        let fix = fixture().await;
        let intent = fix
            .manager
            .create_payment_intent(fix.customer.id, dec!(13), "Tiffin Order")
            .await
            .unwrap();
        assert!(intent.client_secret.ends_with("_secret"));

        let err = fix
            .manager
            .create_payment_intent(fix.customer.id, dec!(0), "Tiffin Order")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_profile_round_trips() {
        let fix = fixture().await;
        fix.manager
            .update_driver_profile(fix.driver.id, "Toyota Prius", "TASTY-1")
            .await
            .unwrap();

        let profile = fix.manager.driver_profile(fix.driver.id).await.unwrap();
        assert_eq!(profile.vehicle.car_model, "Toyota Prius");
        assert_eq!(profile.vehicle.plate_number, "TASTY-1");
    }

    #[tokio::test]
    async fn test_mark_ready_is_silent_noop_when_not_cooking() {
        let fix = fixture().await;
        let order = fix
            .manager
            .place_order(fix.customer.id, fix.restaurant.id, "1 Curry Lane", &cart(&fix))
            .await
            .unwrap();

        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();
        // Pressing ready again succeeds without changing anything.
        fix.manager.mark_ready(fix.restaurant.id, order.id).await.unwrap();

        let latest = fix.manager.latest_order(fix.customer.id).await.unwrap().unwrap();
        assert_eq!(latest.status, OrderStatus::Ready);
    }
}
