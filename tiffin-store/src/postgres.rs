//! PostgreSQL store implementation.
//!
//! Production persistence behind the `postgres` feature. The schema
//! lives in `schema.sql` next to this crate's manifest.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.
//!
//! Concurrency: every order mutation is one conditional statement.
//! - `create` is `INSERT ... WHERE NOT EXISTS (outstanding order)`, with
//!   a partial unique index as the last line of defense under
//!   READ COMMITTED.
//! - `claim` is a single `UPDATE ... WHERE id = $1 AND status = 'ready'
//!   AND driver_id IS NULL AND NOT EXISTS (busy driver) RETURNING *`;
//!   zero rows are classified by a follow-up read.
//! - `complete` is keyed on the assigned driver and `on_the_way`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::error::StoreError;
use crate::repository::{
    CustomerRepository, DriverRepository, MealRepository, OrderRepository,
    RestaurantRepository, Store,
};
use tiffin_domain::{
    Address, Customer, CustomerId, Driver, DriverId, Location, Meal, MealId, MediaRef, Order,
    OrderId, OrderStatus, Price, Restaurant, RestaurantId, Vehicle,
};

/// PostgreSQL-backed store.
pub struct PgStore {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl PgStore {
    /// Create a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Row parsing
// =============================================================================

fn media_ref(value: Option<String>) -> Result<Option<MediaRef>, StoreError> {
    value.map(MediaRef::new).transpose().map_err(StoreError::from)
}

fn parse_restaurant_row(row: &PgRow) -> Result<Restaurant, StoreError> {
    Ok(Restaurant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        address: Address::new(row.try_get::<String, _>("address")?)?,
        logo: media_ref(row.try_get("logo")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_meal_row(row: &PgRow) -> Result<Meal, StoreError> {
    Ok(Meal {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        name: row.try_get("name")?,
        short_description: row.try_get("short_description")?,
        price: Price::new(row.try_get::<Decimal, _>("price")?)?,
        image: media_ref(row.try_get("image")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_customer_row(row: &PgRow) -> Result<Customer, StoreError> {
    Ok(Customer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        address: Address::new(row.try_get::<String, _>("address")?)?,
        avatar: media_ref(row.try_get("avatar")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_driver_row(row: &PgRow) -> Result<Driver, StoreError> {
    let location: Option<String> = row.try_get("location")?;
    Ok(Driver {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        avatar: media_ref(row.try_get("avatar")?)?,
        location: location.map(Location::new).transpose()?,
        vehicle: Vehicle {
            car_model: row.try_get("car_model")?,
            plate_number: row.try_get("plate_number")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn parse_order_row(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    let line_items: serde_json::Value = row.try_get("line_items")?;

    Ok(Order {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        driver_id: row.try_get("driver_id")?,
        status: status.parse::<OrderStatus>()?,
        address: Address::new(row.try_get::<String, _>("address")?)?,
        total: row.try_get("total")?,
        line_items: serde_json::from_value(line_items)
            .map_err(|e| StoreError::Serialization(format!("line_items: {}", e)))?,
        created_at: row.try_get("created_at")?,
        picked_at: row.try_get("picked_at")?,
    })
}

fn line_items_json(order: &Order) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(&order.line_items)
        .map_err(|e| StoreError::Serialization(format!("line_items: {}", e)))
}

const ORDER_COLUMNS: &str = "id, customer_id, restaurant_id, driver_id, status, address, \
                             total, line_items, created_at, picked_at";

// =============================================================================
// Restaurant Repository Implementation
// =============================================================================

#[async_trait]
impl RestaurantRepository for PgStore {
    async fn save(&self, restaurant: &Restaurant) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO restaurants (id, name, phone, address, logo, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                logo = EXCLUDED.logo
            "#,
        )
        .bind(restaurant.id)
        .bind(&restaurant.name)
        .bind(&restaurant.phone)
        .bind(restaurant.address.as_str())
        .bind(restaurant.logo.as_ref().map(|l| l.key()))
        .bind(restaurant.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: RestaurantId) -> Result<Option<Restaurant>, StoreError> {
        let row = sqlx::query("SELECT * FROM restaurants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_restaurant_row(&r)).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Restaurant>, StoreError> {
        let rows = sqlx::query("SELECT * FROM restaurants ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_restaurant_row).collect()
    }
}

// =============================================================================
// Meal Repository Implementation
// =============================================================================

#[async_trait]
impl MealRepository for PgStore {
    async fn save(&self, meal: &Meal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO meals (id, restaurant_id, name, short_description, price, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                short_description = EXCLUDED.short_description,
                price = EXCLUDED.price,
                image = EXCLUDED.image
            "#,
        )
        .bind(meal.id)
        .bind(meal.restaurant_id)
        .bind(&meal.name)
        .bind(&meal.short_description)
        .bind(meal.price.as_decimal())
        .bind(meal.image.as_ref().map(|i| i.key()))
        .bind(meal.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: MealId) -> Result<Option<Meal>, StoreError> {
        let row = sqlx::query("SELECT * FROM meals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_meal_row(&r)).transpose()
    }

    async fn find_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Meal>, StoreError> {
        let rows = sqlx::query("SELECT * FROM meals WHERE restaurant_id = $1 ORDER BY id DESC")
            .bind(restaurant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_meal_row).collect()
    }
}

// =============================================================================
// Customer Repository Implementation
// =============================================================================

#[async_trait]
impl CustomerRepository for PgStore {
    async fn save(&self, customer: &Customer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, address, avatar, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                avatar = EXCLUDED.avatar
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.address.as_str())
        .bind(customer.avatar.as_ref().map(|a| a.key()))
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_customer_row(&r)).transpose()
    }
}

// =============================================================================
// Driver Repository Implementation
// =============================================================================

#[async_trait]
impl DriverRepository for PgStore {
    async fn save(&self, driver: &Driver) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO drivers (id, name, phone, avatar, location, car_model, plate_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                avatar = EXCLUDED.avatar,
                location = EXCLUDED.location,
                car_model = EXCLUDED.car_model,
                plate_number = EXCLUDED.plate_number
            "#,
        )
        .bind(driver.id)
        .bind(&driver.name)
        .bind(&driver.phone)
        .bind(driver.avatar.as_ref().map(|a| a.key()))
        .bind(driver.location.as_ref().map(|l| l.as_str()))
        .bind(&driver.vehicle.car_model)
        .bind(&driver.vehicle.plate_number)
        .bind(driver.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: DriverId) -> Result<Option<Driver>, StoreError> {
        let row = sqlx::query("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_driver_row(&r)).transpose()
    }

    async fn update_location(&self, id: DriverId, location: Location) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE drivers SET location = $2 WHERE id = $1")
            .bind(id)
            .bind(location.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("driver", id.to_string()));
        }
        Ok(())
    }

    async fn update_vehicle(&self, id: DriverId, vehicle: Vehicle) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE drivers SET car_model = $2, plate_number = $3 WHERE id = $1")
                .bind(id)
                .bind(&vehicle.car_model)
                .bind(&vehicle.plate_number)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("driver", id.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for PgStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let line_items = line_items_json(order)?;

        // Conditional insert: the guard and the write are one statement.
        // Under READ COMMITTED two racing inserts can both pass the
        // NOT EXISTS check; the partial unique index on
        // (customer_id) WHERE status <> 'delivered' then rejects the
        // second with 23505.
        let result = sqlx::query(
            r#"
            INSERT INTO orders
                (id, customer_id, restaurant_id, driver_id, status, address,
                 total, line_items, created_at, picked_at)
            SELECT $1, $2, $3, NULL, $4, $5, $6, $7, $8, NULL
            WHERE NOT EXISTS (
                SELECT 1 FROM orders
                WHERE customer_id = $2 AND status <> 'delivered'
            )
            "#,
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.restaurant_id)
        .bind(order.status.name())
        .bind(order.address.as_str())
        .bind(order.total)
        .bind(line_items)
        .bind(order.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(StoreError::CustomerBusy { customer_id: order.customer_id })
            }
            Ok(_) => Ok(()),
            Err(err) => match StoreError::from(err) {
                StoreError::Duplicate { .. } => {
                    Err(StoreError::CustomerBusy { customer_id: order.customer_id })
                }
                other => Err(other),
            },
        }
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_order_row(&r)).transpose()
    }

    async fn find_latest_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM orders WHERE customer_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_order_row(&r)).transpose()
    }

    async fn find_ready_unclaimed(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE status = 'ready' AND driver_id IS NULL ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_order_row).collect()
    }

    async fn find_en_route_by_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM orders WHERE driver_id = $1 AND status = 'on_the_way' LIMIT 1",
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_order_row(&r)).transpose()
    }

    async fn find_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT * FROM orders WHERE restaurant_id = $1 ORDER BY id DESC")
            .bind(restaurant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_order_row).collect()
    }

    async fn find_delivered_by_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE driver_id = $1 AND status = 'delivered'",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_order_row).collect()
    }

    async fn count_created_after(
        &self,
        restaurant_id: RestaurantId,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1 AND created_at > $2",
        )
        .bind(restaurant_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn mark_ready(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = 'ready'
            WHERE id = $1 AND restaurant_id = $2 AND status = 'cooking'
            "#,
        )
        .bind(order_id)
        .bind(restaurant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing matched: silent no-op when the order is owned but has
        // moved on, NotFound otherwise.
        let owned: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM orders WHERE id = $1 AND restaurant_id = $2",
        )
        .bind(order_id)
        .bind(restaurant_id)
        .fetch_optional(&self.pool)
        .await?;

        match owned {
            Some(_) => Ok(false),
            None => Err(StoreError::not_found("order", order_id.to_string())),
        }
    }

    async fn claim(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        picked_at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        // The race-sensitive statement. The WHERE clause can match for
        // at most one concurrent caller; everyone else updates zero
        // rows and is classified below.
        let query = format!(
            r#"
            UPDATE orders
            SET driver_id = $2, status = 'on_the_way', picked_at = $3
            WHERE id = $1
              AND status = 'ready'
              AND driver_id IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM orders busy
                  WHERE busy.driver_id = $2 AND busy.status = 'on_the_way'
              )
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let result = sqlx::query(&query)
            .bind(order_id)
            .bind(driver_id)
            .bind(picked_at)
            .fetch_optional(&self.pool)
            .await;

        let row = match result {
            Ok(row) => row,
            // The partial unique index on (driver_id) WHERE
            // status = 'on_the_way' can fire when the same driver races
            // itself past the NOT EXISTS check.
            Err(err) => {
                return match StoreError::from(err) {
                    StoreError::Duplicate { .. } => Err(StoreError::DriverBusy { driver_id }),
                    other => Err(other),
                }
            }
        };

        if let Some(row) = row {
            return parse_order_row(&row);
        }

        // Lost the race or never eligible: classify for the caller.
        // Same precedence as the in-memory store: busy driver first,
        // then missing order, then the lost race.
        let busy: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM orders WHERE driver_id = $1 AND status = 'on_the_way'",
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;
        if busy.is_some() {
            return Err(StoreError::DriverBusy { driver_id });
        }

        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("order", order_id.to_string()));
        }

        Err(StoreError::AlreadyClaimed { order_id })
    }

    async fn complete(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
    ) -> Result<Order, StoreError> {
        let query = format!(
            r#"
            UPDATE orders SET status = 'delivered'
            WHERE id = $1 AND driver_id = $2 AND status = 'on_the_way'
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(order_id)
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => parse_order_row(&row),
            // Wrong driver and missing order are indistinguishable to
            // the caller.
            None => Err(StoreError::not_found("order", order_id.to_string())),
        }
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for PgStore {
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
