//! Revenue and report aggregation.
//!
//! Pure functions over slices of committed order data; the store
//! supplies the rows, callers supply "today". Results are recomputed
//! on every request, never cached.
//!
//! The weekly window is the Monday-start calendar week containing
//! "today", evaluated in a configurable fixed UTC offset (the original
//! system anchored the week to server-local "today"; here the offset
//! is an explicit policy). Orders bucket by their creation time.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entities::{DriverId, Meal, MealId, Order};
use crate::value_objects::OrderStatus;

/// One day of a weekly revenue series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    /// Abbreviated weekday label ("Mon" .. "Sun")
    pub label: String,
    /// The calendar date of this bucket, in the reporting offset
    pub date: NaiveDate,
    /// Sum of order totals created on this date
    pub revenue: Decimal,
    /// Number of orders created on this date
    pub orders: u64,
}

/// Total quantity ordered for one catalog meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealSales {
    /// The meal
    pub meal_id: MealId,
    /// Meal name, denormalized for report output
    pub name: String,
    /// Total units ordered across all orders
    pub quantity: u64,
}

/// Delivered-order count for one driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverDeliveries {
    /// The driver
    pub driver_id: DriverId,
    /// Number of delivered orders
    pub deliveries: u64,
}

/// The seven dates of the Monday-start week containing `today`.
pub fn week_of(today: DateTime<Utc>, offset: FixedOffset) -> [NaiveDate; 7] {
    let local_today = today.with_timezone(&offset).date_naive();
    let monday = local_today - Duration::days(i64::from(local_today.weekday().num_days_from_monday()));

    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Bucket `(created_at, total)` pairs into the week containing `today`.
///
/// Returns exactly seven buckets, Monday first; days without orders
/// report zero. Pairs outside the week are ignored.
pub fn weekly_breakdown(
    deliveries: &[(DateTime<Utc>, Decimal)],
    today: DateTime<Utc>,
    offset: FixedOffset,
) -> Vec<DayBucket> {
    let week = week_of(today, offset);

    week.iter()
        .map(|&date| {
            let mut revenue = Decimal::ZERO;
            let mut orders = 0u64;
            for (created_at, total) in deliveries {
                if created_at.with_timezone(&offset).date_naive() == date {
                    revenue += *total;
                    orders += 1;
                }
            }
            DayBucket {
                label: date.format("%a").to_string(),
                date,
                revenue,
                orders,
            }
        })
        .collect()
}

/// Best-selling meals of a catalog by total ordered quantity.
///
/// Every catalog meal participates (unsold meals count zero). Ties
/// break by meal id, which is time-ordered, so earlier catalog entries
/// win.
pub fn top_meals(catalog: &[Meal], orders: &[Order], limit: usize) -> Vec<MealSales> {
    let mut sales: Vec<MealSales> = catalog
        .iter()
        .map(|meal| {
            let quantity = orders
                .iter()
                .flat_map(|order| order.line_items.iter())
                .filter(|item| item.meal_id == meal.id)
                .map(|item| u64::from(item.quantity.get()))
                .sum();
            MealSales { meal_id: meal.id, name: meal.name.clone(), quantity }
        })
        .collect();

    sales.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.meal_id.cmp(&b.meal_id)));
    sales.truncate(limit);
    sales
}

/// Drivers ranked by delivered-order count.
///
/// Only delivered orders count; ties break by driver id.
pub fn top_drivers(orders: &[Order], limit: usize) -> Vec<DriverDeliveries> {
    let mut counts: Vec<DriverDeliveries> = Vec::new();

    for order in orders {
        if order.status != OrderStatus::Delivered {
            continue;
        }
        let Some(driver_id) = order.driver_id else {
            continue;
        };
        match counts.iter_mut().find(|entry| entry.driver_id == driver_id) {
            Some(entry) => entry.deliveries += 1,
            None => counts.push(DriverDeliveries { driver_id, deliveries: 1 }),
        }
    }

    counts.sort_by(|a, b| b.deliveries.cmp(&a.deliveries).then(a.driver_id.cmp(&b.driver_id)));
    counts.truncate(limit);
    counts
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderLineItem;
    use crate::value_objects::{Address, Price, Quantity};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn order_with(
        driver_id: Option<DriverId>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        total: Decimal,
        line_items: Vec<OrderLineItem>,
    ) -> Order {
        let mut order = Order::place(
            Uuid::now_v7(),
            Uuid::now_v7(),
            Address::new("1 Curry Lane").unwrap(),
            line_items,
            total,
        );
        order.driver_id = driver_id;
        order.status = status;
        order.created_at = created_at;
        order
    }

    #[test]
    fn test_week_of_starts_on_monday() {
        // 2024-03-14 is a Thursday
        let today = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        let week = week_of(today, utc_offset());

        assert_eq!(week[0], NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(week[6], NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());
        assert_eq!(week[0].format("%a").to_string(), "Mon");
        assert_eq!(week[6].format("%a").to_string(), "Sun");
    }

    #[test]
    fn test_weekly_breakdown_zero_fills() {
        let today = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        // One delivery on Monday of that week, total 10.
        let monday = Utc.with_ymd_and_hms(2024, 3, 11, 9, 30, 0).unwrap();

        let buckets = weekly_breakdown(&[(monday, dec!(10))], today, utc_offset());

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].label, "Mon");
        assert_eq!(buckets[0].revenue, dec!(10));
        assert_eq!(buckets[0].orders, 1);
        for bucket in &buckets[1..] {
            assert_eq!(bucket.revenue, Decimal::ZERO);
            assert_eq!(bucket.orders, 0);
        }
    }

    #[test]
    fn test_weekly_breakdown_ignores_other_weeks() {
        let today = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        let last_week = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();

        let buckets = weekly_breakdown(&[(last_week, dec!(99))], today, utc_offset());
        assert!(buckets.iter().all(|b| b.revenue == Decimal::ZERO));
    }

    #[test]
    fn test_weekly_breakdown_respects_offset() {
        let today = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        // 23:30 UTC Sunday is already Monday in UTC+1.
        let late_sunday = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        let plus_one = FixedOffset::east_opt(3600).unwrap();

        let buckets = weekly_breakdown(&[(late_sunday, dec!(7))], today, plus_one);
        assert_eq!(buckets[0].label, "Mon");
        assert_eq!(buckets[0].revenue, dec!(7));
    }

    #[test]
    fn test_top_meals_ranks_and_breaks_ties_by_id() {
        let restaurant_id = Uuid::now_v7();
        let pizza = Meal::new(restaurant_id, "Pizza", "", Price::new(dec!(5)).unwrap(), None);
        let salad = Meal::new(restaurant_id, "Salad", "", Price::new(dec!(3)).unwrap(), None);
        let ramen = Meal::new(restaurant_id, "Ramen", "", Price::new(dec!(9)).unwrap(), None);
        let catalog = vec![pizza.clone(), salad.clone(), ramen.clone()];

        let line = |meal: &Meal, qty: u32| OrderLineItem {
            meal_id: meal.id,
            quantity: Quantity::new(qty).unwrap(),
            sub_total: meal.price.as_decimal() * Decimal::from(qty),
        };
        let orders = vec![
            order_with(None, OrderStatus::Delivered, Utc::now(), dec!(13), vec![
                line(&pizza, 2),
                line(&salad, 1),
            ]),
            // Ramen ties salad at quantity 1; salad has the earlier id.
            order_with(None, OrderStatus::Cooking, Utc::now(), dec!(9), vec![line(&ramen, 1)]),
        ];

        let top = top_meals(&catalog, &orders, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Pizza");
        assert_eq!(top[0].quantity, 2);
        assert_eq!(top[1].name, "Salad");
        assert_eq!(top[2].name, "Ramen");
    }

    #[test]
    fn test_top_meals_counts_unsold_as_zero() {
        let restaurant_id = Uuid::now_v7();
        let catalog = vec![
            Meal::new(restaurant_id, "Pizza", "", Price::new(dec!(5)).unwrap(), None),
        ];

        let top = top_meals(&catalog, &[], 3);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].quantity, 0);
    }

    #[test]
    fn test_top_drivers_counts_only_delivered() {
        let d1 = Uuid::now_v7();
        let d2 = Uuid::now_v7();

        let orders = vec![
            order_with(Some(d1), OrderStatus::Delivered, Utc::now(), dec!(10), Vec::new()),
            order_with(Some(d1), OrderStatus::Delivered, Utc::now(), dec!(12), Vec::new()),
            order_with(Some(d2), OrderStatus::Delivered, Utc::now(), dec!(8), Vec::new()),
            // On-the-way orders do not count.
            order_with(Some(d2), OrderStatus::OnTheWay, Utc::now(), dec!(5), Vec::new()),
            // Unclaimed orders never count.
            order_with(None, OrderStatus::Ready, Utc::now(), dec!(5), Vec::new()),
        ];

        let top = top_drivers(&orders, 3);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].driver_id, d1);
        assert_eq!(top[0].deliveries, 2);
        assert_eq!(top[1].driver_id, d2);
        assert_eq!(top[1].deliveries, 1);
    }
}
