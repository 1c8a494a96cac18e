//! Read-only reporting queries.
//!
//! Derived views over committed orders: driver weekly revenue, the
//! restaurant new-order counter, and the restaurant report. Everything
//! recomputes on each request from repository reads; aggregation
//! itself is pure and lives in `tiffin_domain::revenue`.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use tiffin_domain::revenue::{top_drivers, top_meals, weekly_breakdown, DayBucket, MealSales};
use tiffin_domain::{DriverId, OrderStatus, RestaurantId};
use tiffin_store::Store;

use crate::error::{ServiceError, ServiceResult};

/// How many meals/drivers the restaurant report ranks.
const TOP_N: usize = 3;

/// One ranked driver in the restaurant report.
#[derive(Debug, Clone, Serialize)]
pub struct TopDriver {
    /// The driver
    pub driver_id: DriverId,
    /// Driver display name
    pub name: String,
    /// Delivered orders for this restaurant
    pub deliveries: u64,
}

/// The restaurant report: rankings plus the current week's series.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantReport {
    /// Best-selling meals by total ordered quantity
    pub top_meals: Vec<MealSales>,
    /// Drivers by delivered-order count
    pub top_drivers: Vec<TopDriver>,
    /// Current week's delivered revenue and order counts, Monday first
    pub week: Vec<DayBucket>,
}

/// Read-only report service over the store.
pub struct ReportService<S: Store + 'static> {
    /// Store for repository reads
    store: Arc<S>,
    /// Fixed offset anchoring the revenue week
    offset: FixedOffset,
}

impl<S: Store + 'static> ReportService<S> {
    /// Create a new report service.
    pub fn new(store: Arc<S>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    /// The driver's delivered revenue for the current week, Monday
    /// first, zero-filled.
    pub async fn driver_weekly_revenue(
        &self,
        driver_id: DriverId,
    ) -> ServiceResult<Vec<DayBucket>> {
        self.store
            .drivers()
            .find_by_id(driver_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("driver not found: {driver_id}")))?;

        let delivered = self.store.orders().find_delivered_by_driver(driver_id).await?;
        let rows: Vec<_> = delivered.iter().map(|o| (o.created_at, o.total)).collect();

        Ok(weekly_breakdown(&rows, Utc::now(), self.offset))
    }

    /// Count of the restaurant's orders created strictly after `since`.
    pub async fn new_order_count(
        &self,
        restaurant_id: RestaurantId,
        since: DateTime<Utc>,
    ) -> ServiceResult<u64> {
        Ok(self.store.orders().count_created_after(restaurant_id, since).await?)
    }

    /// The restaurant report: top meals, top drivers, weekly series.
    pub async fn restaurant_report(
        &self,
        restaurant_id: RestaurantId,
    ) -> ServiceResult<RestaurantReport> {
        let catalog = self.store.meals().find_by_restaurant(restaurant_id).await?;
        let orders = self.store.orders().find_by_restaurant(restaurant_id).await?;

        let meals = top_meals(&catalog, &orders, TOP_N);

        let mut drivers = Vec::new();
        for ranked in top_drivers(&orders, TOP_N) {
            let name = self
                .store
                .drivers()
                .find_by_id(ranked.driver_id)
                .await?
                .map(|d| d.name)
                .unwrap_or_else(|| "unknown".to_string());
            drivers.push(TopDriver {
                driver_id: ranked.driver_id,
                name,
                deliveries: ranked.deliveries,
            });
        }

        let delivered_rows: Vec<_> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .map(|o| (o.created_at, o.total))
            .collect();
        let week = weekly_breakdown(&delivered_rows, Utc::now(), self.offset);

        Ok(RestaurantReport { top_meals: meals, top_drivers: drivers, week })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tiffin_domain::{
        Address, Customer, Driver, Meal, Order, OrderLineItem, Price, Quantity, Restaurant,
    };
    use tiffin_store::MemoryStore;
    use uuid::Uuid;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    async fn delivered_order(
        store: &MemoryStore,
        restaurant_id: RestaurantId,
        driver_id: DriverId,
        total: Decimal,
        line_items: Vec<OrderLineItem>,
    ) -> Order {
        let mut order = Order::place(
            Uuid::now_v7(),
            restaurant_id,
            Address::new("1 Curry Lane").unwrap(),
            line_items,
            total,
        );
        order.status = OrderStatus::Delivered;
        order.driver_id = Some(driver_id);
        store.orders().create(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_driver_weekly_revenue_buckets_today() {
        let store = Arc::new(MemoryStore::new());
        let driver = Driver::new("Dana", "555-0102", None);
        store.drivers().save(&driver).await.unwrap();

        delivered_order(&store, Uuid::now_v7(), driver.id, dec!(10), Vec::new()).await;

        let service = ReportService::new(store, utc());
        let week = service.driver_weekly_revenue(driver.id).await.unwrap();

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].label, "Mon");

        let today_label = Utc::now().format("%a").to_string();
        let total: Decimal = week.iter().map(|d| d.revenue).sum();
        assert_eq!(total, dec!(10));
        for day in &week {
            if day.label == today_label {
                assert_eq!(day.revenue, dec!(10));
            } else {
                assert_eq!(day.revenue, Decimal::ZERO);
            }
        }
    }

    #[tokio::test]
    async fn test_driver_weekly_revenue_unknown_driver() {
        let store = Arc::new(MemoryStore::new());
        let service = ReportService::new(store, utc());

        let result = service.driver_weekly_revenue(Uuid::now_v7()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_new_order_count_strictly_after() {
        let store = Arc::new(MemoryStore::new());
        let restaurant_id = Uuid::now_v7();

        let order = Order::place(
            Uuid::now_v7(),
            restaurant_id,
            Address::new("1 Curry Lane").unwrap(),
            Vec::new(),
            dec!(5),
        );
        store.orders().create(&order).await.unwrap();

        let service = ReportService::new(store, utc());
        let before = order.created_at - chrono::Duration::seconds(5);
        assert_eq!(service.new_order_count(restaurant_id, before).await.unwrap(), 1);
        assert_eq!(
            service.new_order_count(restaurant_id, order.created_at).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_restaurant_report_ranks_and_series() {
        let store = Arc::new(MemoryStore::new());

        let restaurant = Restaurant::new(
            "Masala House",
            "555-0100",
            Address::new("12 Tandoor Street").unwrap(),
            None,
        );
        store.restaurants().save(&restaurant).await.unwrap();

        let pizza = Meal::new(restaurant.id, "Pizza", "", Price::new(dec!(5)).unwrap(), None);
        let salad = Meal::new(restaurant.id, "Salad", "", Price::new(dec!(3)).unwrap(), None);
        store.meals().save(&pizza).await.unwrap();
        store.meals().save(&salad).await.unwrap();

        let dana = Driver::new("Dana", "555-0102", None);
        let miguel = Driver::new("Miguel", "555-0103", None);
        store.drivers().save(&dana).await.unwrap();
        store.drivers().save(&miguel).await.unwrap();

        let line = |meal: &Meal, qty: u32| OrderLineItem {
            meal_id: meal.id,
            quantity: Quantity::new(qty).unwrap(),
            sub_total: meal.price.as_decimal() * Decimal::from(qty),
        };

        delivered_order(&store, restaurant.id, dana.id, dec!(13), vec![
            line(&pizza, 2),
            line(&salad, 1),
        ])
        .await;
        delivered_order(&store, restaurant.id, dana.id, dec!(5), vec![line(&pizza, 1)]).await;
        delivered_order(&store, restaurant.id, miguel.id, dec!(3), vec![line(&salad, 1)]).await;

        let customer = Customer::new("Priya", "555-0101", Address::new("1 Curry Lane").unwrap(), None);
        store.customers().save(&customer).await.unwrap();

        let service = ReportService::new(store, utc());
        let report = service.restaurant_report(restaurant.id).await.unwrap();

        assert_eq!(report.top_meals[0].name, "Pizza");
        assert_eq!(report.top_meals[0].quantity, 3);
        assert_eq!(report.top_meals[1].name, "Salad");
        assert_eq!(report.top_meals[1].quantity, 2);

        assert_eq!(report.top_drivers[0].name, "Dana");
        assert_eq!(report.top_drivers[0].deliveries, 2);
        assert_eq!(report.top_drivers[1].name, "Miguel");
        assert_eq!(report.top_drivers[1].deliveries, 1);

        let revenue: Decimal = report.week.iter().map(|d| d.revenue).sum();
        let orders: u64 = report.week.iter().map(|d| d.orders).sum();
        assert_eq!(revenue, dec!(21));
        assert_eq!(orders, 3);
    }
}
