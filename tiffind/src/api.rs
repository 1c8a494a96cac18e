//! HTTP API for the Tiffin daemon.
//!
//! Three route families, one per caller role:
//! - `/api/customer/*` - browse, order, track
//! - `/api/driver/*` - claim, complete, profile, revenue
//! - `/api/restaurant/*` - mark ready, notifications, report
//!
//! Callers authenticate with `Authorization: Bearer <token>`; the
//! identity port resolves the token to a principal and each family
//! checks the role. Every failure translates to a structured
//! `{status: "failed", error}` body with a matching HTTP status.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use tiffin_domain::{CartItem, MediaRef, Order, Quantity};
use tiffin_store::Store;

use crate::auth::{IdentityPort, Role};
use crate::error::ServiceError;
use crate::media::MediaResolver;
use crate::order_manager::OrderManager;
use crate::reports::{ReportService, RestaurantReport};

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct AppState<S: Store + 'static> {
    /// Store, for view joins
    pub store: Arc<S>,
    /// Order lifecycle service
    pub manager: Arc<OrderManager<S>>,
    /// Report service
    pub reports: Arc<ReportService<S>>,
    /// Identity collaborator
    pub auth: Arc<dyn IdentityPort>,
    /// Media URL resolver
    pub media: Arc<dyn MediaResolver>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

/// Plain success acknowledgement.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,
}

impl SuccessResponse {
    fn new() -> Self {
        Self { status: "success" }
    }
}

/// One restaurant in the catalog listing.
#[derive(Debug, Serialize)]
pub struct RestaurantView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// One meal in a restaurant's catalog listing.
#[derive(Debug, Serialize)]
pub struct MealView {
    pub id: Uuid,
    pub name: String,
    pub short_description: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Order line item with its meal resolved.
#[derive(Debug, Serialize)]
pub struct LineItemView {
    pub meal_id: Uuid,
    pub meal_name: String,
    pub quantity: u32,
    pub sub_total: Decimal,
}

/// Driver summary nested in an order view.
#[derive(Debug, Serialize)]
pub struct OrderDriverView {
    pub id: Uuid,
    pub name: String,
    pub car_model: String,
    pub plate_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Full order representation.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub status: String,
    pub address: String,
    pub total: Decimal,
    pub line_items: Vec<LineItemView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<OrderDriverView>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_at: Option<DateTime<Utc>>,
}

/// Status-only order representation.
#[derive(Debug, Serialize)]
pub struct OrderStatusView {
    pub id: Uuid,
    pub status: String,
}

/// Request to place an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    pub address: String,
    pub line_items: Vec<LineItemRequest>,
}

/// One requested cart line.
#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub meal_id: Uuid,
    pub quantity: u32,
}

/// Response after placing an order.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub status: &'static str,
    pub order_id: Uuid,
    pub total: Decimal,
}

/// Request to create a payment intent.
#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub total: Decimal,
}

/// Response carrying the provider client secret.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Request to claim or complete an order.
#[derive(Debug, Deserialize)]
pub struct OrderActionRequest {
    pub order_id: Uuid,
}

/// Request to update the driver's location.
#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub location: String,
}

/// Request to update the driver's vehicle profile.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub car_model: String,
    pub plate_number: String,
}

/// Driver profile representation.
#[derive(Debug, Serialize)]
pub struct DriverProfileView {
    pub id: Uuid,
    pub name: String,
    pub car_model: String,
    pub plate_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Query for the new-order notification counter.
#[derive(Debug, Deserialize)]
pub struct NewCountQuery {
    pub since: DateTime<Utc>,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S: Store + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Customer
        .route("/api/customer/restaurants", get(list_restaurants_handler))
        .route("/api/customer/restaurants/:id/meals", get(list_meals_handler))
        .route("/api/customer/orders", post(create_order_handler))
        .route("/api/customer/orders/latest", get(latest_order_handler))
        .route("/api/customer/orders/latest/status", get(latest_order_status_handler))
        .route("/api/customer/driver-location", get(driver_location_handler))
        .route("/api/customer/payment-intent", post(payment_intent_handler))
        // Driver
        .route("/api/driver/orders/ready", get(ready_orders_handler))
        .route("/api/driver/orders/claim", post(claim_order_handler))
        .route("/api/driver/orders/complete", post(complete_order_handler))
        .route("/api/driver/orders/current", get(current_delivery_handler))
        .route("/api/driver/revenue", get(driver_revenue_handler))
        .route("/api/driver/location", post(update_location_handler))
        .route("/api/driver/profile", get(driver_profile_handler).post(update_profile_handler))
        // Restaurant
        .route("/api/restaurant/orders/:id/ready", post(mark_ready_handler))
        .route("/api/restaurant/orders/new-count", get(new_order_count_handler))
        .route("/api/restaurant/report", get(restaurant_report_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers: health
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Handlers: customer
// =============================================================================

async fn list_restaurants_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    authenticate(&state, &headers, Role::Customer).await?;

    let restaurants = state.manager.list_restaurants().await.map_err(to_error_response)?;
    let views: Vec<RestaurantView> = restaurants
        .into_iter()
        .map(|r| RestaurantView {
            id: r.id,
            name: r.name,
            phone: r.phone,
            address: r.address.to_string(),
            logo: resolve_media(&state, r.logo.as_ref()),
        })
        .collect();

    Ok(Json(serde_json::json!({ "restaurants": views })))
}

async fn list_meals_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authenticate(&state, &headers, Role::Customer).await?;

    let meals = state.manager.list_meals(restaurant_id).await.map_err(to_error_response)?;
    let views: Vec<MealView> = meals
        .into_iter()
        .map(|m| MealView {
            id: m.id,
            name: m.name,
            short_description: m.short_description,
            price: m.price.as_decimal(),
            image: resolve_media(&state, m.image.as_ref()),
        })
        .collect();

    Ok(Json(serde_json::json!({ "meals": views })))
}

async fn create_order_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let customer_id = authenticate(&state, &headers, Role::Customer).await?;

    let items = parse_cart(&req.line_items)?;
    let order = state
        .manager
        .place_order(customer_id, req.restaurant_id, &req.address, &items)
        .await
        .map_err(to_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            status: "success",
            order_id: order.id,
            total: order.total,
        }),
    ))
}

async fn latest_order_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let customer_id = authenticate(&state, &headers, Role::Customer).await?;

    let order = state.manager.latest_order(customer_id).await.map_err(to_error_response)?;
    let view = match order {
        Some(order) => Some(order_view(&state, order).await?),
        None => None,
    };

    Ok(Json(serde_json::json!({ "last_order": view })))
}

async fn latest_order_status_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let customer_id = authenticate(&state, &headers, Role::Customer).await?;

    let status = state
        .manager
        .latest_order_status(customer_id)
        .await
        .map_err(to_error_response)?
        .map(|(id, status)| OrderStatusView { id, status: status.label().to_string() });

    Ok(Json(serde_json::json!({ "last_order_status": status })))
}

async fn driver_location_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let customer_id = authenticate(&state, &headers, Role::Customer).await?;

    let location = state
        .manager
        .driver_location_for_customer(customer_id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(serde_json::json!({
        "location": location.map(|l| l.as_str().to_string())
    })))
}

async fn payment_intent_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let customer_id = authenticate(&state, &headers, Role::Customer).await?;

    let intent = state
        .manager
        .create_payment_intent(customer_id, req.total, "Tiffin Order")
        .await
        .map_err(to_error_response)?;

    Ok(Json(PaymentIntentResponse { client_secret: intent.client_secret }))
}

// =============================================================================
// Handlers: driver
// =============================================================================

async fn ready_orders_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    authenticate(&state, &headers, Role::Driver).await?;

    let orders = state.manager.ready_orders().await.map_err(to_error_response)?;
    let mut views = Vec::with_capacity(orders.len());
    for order in orders {
        views.push(order_view(&state, order).await?);
    }

    Ok(Json(serde_json::json!({ "orders": views })))
}

async fn claim_order_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<OrderActionRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    state
        .manager
        .claim_order(driver_id, req.order_id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(SuccessResponse::new()))
}

async fn complete_order_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<OrderActionRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    state
        .manager
        .complete_order(driver_id, req.order_id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(SuccessResponse::new()))
}

async fn current_delivery_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    let order = state.manager.current_delivery(driver_id).await.map_err(to_error_response)?;
    let view = match order {
        Some(order) => Some(order_view(&state, order).await?),
        None => None,
    };

    Ok(Json(serde_json::json!({ "order": view })))
}

async fn driver_revenue_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    let week = state
        .reports
        .driver_weekly_revenue(driver_id)
        .await
        .map_err(to_error_response)?;

    let revenue: BTreeMap<String, Decimal> =
        week.into_iter().map(|day| (day.label, day.revenue)).collect();

    Ok(Json(serde_json::json!({ "revenue": revenue })))
}

async fn update_location_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<LocationUpdateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    state
        .manager
        .update_driver_location(driver_id, &req.location)
        .await
        .map_err(to_error_response)?;

    Ok(Json(SuccessResponse::new()))
}

async fn driver_profile_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    let driver = state.manager.driver_profile(driver_id).await.map_err(to_error_response)?;
    let view = DriverProfileView {
        id: driver.id,
        name: driver.name,
        car_model: driver.vehicle.car_model,
        plate_number: driver.vehicle.plate_number,
        avatar: resolve_media(&state, driver.avatar.as_ref()),
        location: driver.location.map(|l| l.as_str().to_string()),
    };

    Ok(Json(serde_json::json!({ "driver": view })))
}

async fn update_profile_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let driver_id = authenticate(&state, &headers, Role::Driver).await?;

    state
        .manager
        .update_driver_profile(driver_id, &req.car_model, &req.plate_number)
        .await
        .map_err(to_error_response)?;

    Ok(Json(SuccessResponse::new()))
}

// =============================================================================
// Handlers: restaurant
// =============================================================================

async fn mark_ready_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let restaurant_id = authenticate(&state, &headers, Role::Restaurant).await?;

    state
        .manager
        .mark_ready(restaurant_id, order_id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(SuccessResponse::new()))
}

async fn new_order_count_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<NewCountQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let restaurant_id = authenticate(&state, &headers, Role::Restaurant).await?;

    let count = state
        .reports
        .new_order_count(restaurant_id, query.since)
        .await
        .map_err(to_error_response)?;

    Ok(Json(serde_json::json!({ "notification": count })))
}

async fn restaurant_report_handler<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<RestaurantReport>, ApiError> {
    let restaurant_id = authenticate(&state, &headers, Role::Restaurant).await?;

    let report = state
        .reports
        .restaurant_report(restaurant_id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(report))
}

// =============================================================================
// Helpers
// =============================================================================

async fn authenticate<S: Store + 'static>(
    state: &AppState<S>,
    headers: &HeaderMap,
    role: Role,
) -> Result<Uuid, ApiError> {
    let token = bearer_token(headers)?;
    let principal = state
        .auth
        .resolve(token)
        .await
        .map_err(|e| to_error_response(e.into()))?;
    principal.expect_role(role).map_err(|e| to_error_response(e.into()))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| to_error_response(ServiceError::Auth("Missing bearer token".to_string())))
}

fn parse_cart(items: &[LineItemRequest]) -> Result<Vec<CartItem>, ApiError> {
    items
        .iter()
        .map(|item| {
            Ok(CartItem {
                meal_id: item.meal_id,
                quantity: Quantity::new(item.quantity)
                    .map_err(|e| to_error_response(e.into()))?,
            })
        })
        .collect()
}

fn resolve_media<S: Store + 'static>(
    state: &AppState<S>,
    media: Option<&MediaRef>,
) -> Option<String> {
    media.map(|m| state.media.url(m))
}

async fn order_view<S: Store + 'static>(
    state: &AppState<S>,
    order: Order,
) -> Result<OrderView, ApiError> {
    let mut line_items = Vec::with_capacity(order.line_items.len());
    for item in &order.line_items {
        let meal_name = state
            .store
            .meals()
            .find_by_id(item.meal_id)
            .await
            .map_err(|e| to_error_response(e.into()))?
            .map(|m| m.name)
            .unwrap_or_else(|| "unknown".to_string());
        line_items.push(LineItemView {
            meal_id: item.meal_id,
            meal_name,
            quantity: item.quantity.get(),
            sub_total: item.sub_total,
        });
    }

    let driver = match order.driver_id {
        Some(driver_id) => state
            .store
            .drivers()
            .find_by_id(driver_id)
            .await
            .map_err(|e| to_error_response(e.into()))?
            .map(|d| OrderDriverView {
                id: d.id,
                name: d.name,
                car_model: d.vehicle.car_model,
                plate_number: d.vehicle.plate_number,
                avatar: resolve_media(state, d.avatar.as_ref()),
            }),
        None => None,
    };

    Ok(OrderView {
        id: order.id,
        restaurant_id: order.restaurant_id,
        status: order.status.label().to_string(),
        address: order.address.to_string(),
        total: order.total,
        line_items,
        driver,
        created_at: order.created_at,
        picked_at: order.picked_at,
    })
}

fn to_error_response(error: ServiceError) -> ApiError {
    let status = match &error {
        ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Storage(_) | ServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            status: "failed",
            error: error.to_string(),
        }),
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Principal, StaticTokenAuth};
    use crate::error::PICKED_UP_BY_ANOTHER;
    use crate::media::PublicMediaResolver;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, FixedOffset};
    use http_body_util::BodyExt;
    use tiffin_pay::StubPaymentGateway;
    use tiffin_store::MemoryStore;
    use tiffin_testkit::{seed_marketplace, SeededMarketplace};
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        seeded: SeededMarketplace,
        customer_token: String,
        driver_token: String,
        rival_driver_token: String,
        restaurant_token: String,
    }

    async fn create_test_app() -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let seeded = seed_marketplace(store.as_ref()).await.unwrap();

        let auth = Arc::new(StaticTokenAuth::new());
        let ttl = Duration::hours(1);
        let customer_token = auth.issue(
            Principal { role: Role::Customer, entity_id: seeded.customer.id },
            ttl,
        );
        let driver_token = auth.issue(
            Principal { role: Role::Driver, entity_id: seeded.drivers[0].id },
            ttl,
        );
        let rival_driver_token = auth.issue(
            Principal { role: Role::Driver, entity_id: seeded.drivers[1].id },
            ttl,
        );
        let restaurant_token = auth.issue(
            Principal { role: Role::Restaurant, entity_id: seeded.restaurant.id },
            ttl,
        );

        let payments = Arc::new(StubPaymentGateway::new());
        let manager = Arc::new(OrderManager::new(store.clone(), payments, "usd".to_string()));
        let reports = Arc::new(ReportService::new(
            store.clone(),
            FixedOffset::east_opt(0).unwrap(),
        ));

        let state = Arc::new(AppState {
            store,
            manager,
            reports,
            auth: auth as Arc<dyn IdentityPort>,
            media: Arc::new(PublicMediaResolver::new("http://media.localhost")),
        });

        TestApp {
            app: create_router(state),
            seeded,
            customer_token,
            driver_token,
            rival_driver_token,
            restaurant_token,
        }
    }

    fn get_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn post_request(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn order_body(test: &TestApp) -> serde_json::Value {
        serde_json::json!({
            "restaurant_id": test.seeded.restaurant.id,
            "address": "1 Curry Lane",
            "line_items": [
                { "meal_id": test.seeded.meals[0].id, "quantity": 2 },
                { "meal_id": test.seeded.meals[1].id, "quantity": 1 },
            ]
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let test = create_test_app().await;

        let response = test
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let test = create_test_app().await;

        let response = test
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/customer/restaurants")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "failed");
    }

    #[tokio::test]
    async fn test_wrong_role_is_unauthorized() {
        let test = create_test_app().await;

        // A driver token cannot hit customer routes.
        let response = test
            .app
            .oneshot(get_request("/api/customer/restaurants", &test.driver_token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_restaurants_and_meals() {
        let test = create_test_app().await;

        let response = test
            .app
            .clone()
            .oneshot(get_request("/api/customer/restaurants", &test.customer_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["restaurants"].as_array().unwrap().len(), 1);

        let uri = format!(
            "/api/customer/restaurants/{}/meals",
            test.seeded.restaurant.id
        );
        let response = test
            .app
            .oneshot(get_request(&uri, &test.customer_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["meals"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_order_returns_total() {
        let test = create_test_app().await;

        let response = test
            .app
            .clone()
            .oneshot(post_request(
                "/api/customer/orders",
                &test.customer_token,
                order_body(&test),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["total"], serde_json::json!("13"));

        // Latest order reflects it, still cooking.
        let response = test
            .app
            .oneshot(get_request("/api/customer/orders/latest/status", &test.customer_token))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["last_order_status"]["status"], "Cooking");
    }

    #[tokio::test]
    async fn test_second_order_conflicts() {
        let test = create_test_app().await;

        let response = test
            .app
            .clone()
            .oneshot(post_request(
                "/api/customer/orders",
                &test.customer_token,
                order_body(&test),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let second_body = order_body(&test);
        let response = test
            .app
            .oneshot(post_request(
                "/api/customer/orders",
                &test.customer_token,
                second_body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Your last order must be completed.");
    }

    #[tokio::test]
    async fn test_full_delivery_flow_over_http() {
        let test = create_test_app().await;

        // Customer orders 2 x 5.00 + 1 x 3.00.
        let response = test
            .app
            .clone()
            .oneshot(post_request(
                "/api/customer/orders",
                &test.customer_token,
                order_body(&test),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        let order_id: Uuid =
            serde_json::from_value(body["order_id"].clone()).unwrap();

        // Restaurant marks it ready.
        let response = test
            .app
            .clone()
            .oneshot(post_request(
                &format!("/api/restaurant/orders/{order_id}/ready"),
                &test.restaurant_token,
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Both drivers see it listed.
        let response = test
            .app
            .clone()
            .oneshot(get_request("/api/driver/orders/ready", &test.driver_token))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);

        // First driver claims; the rival loses with the canonical message.
        let claim = serde_json::json!({ "order_id": order_id });
        let response = test
            .app
            .clone()
            .oneshot(post_request("/api/driver/orders/claim", &test.driver_token, claim.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test
            .app
            .clone()
            .oneshot(post_request(
                "/api/driver/orders/claim",
                &test.rival_driver_token,
                claim.clone(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"], PICKED_UP_BY_ANOTHER);

        // Winner completes; revenue shows today's total of 13.
        let response = test
            .app
            .clone()
            .oneshot(post_request("/api/driver/orders/complete", &test.driver_token, claim))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test
            .app
            .oneshot(get_request("/api/driver/revenue", &test.driver_token))
            .await
            .unwrap();
        let body = json_body(response).await;
        let today = Utc::now().format("%a").to_string();
        assert_eq!(body["revenue"][&today], serde_json::json!("13"));
    }

    #[tokio::test]
    async fn test_new_order_count_endpoint() {
        let test = create_test_app().await;
        // The Z form keeps the timestamp query-string safe ("+00:00"
        // would decode as a space).
        let since = (Utc::now() - Duration::hours(1))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let response = test
            .app
            .clone()
            .oneshot(post_request(
                "/api/customer/orders",
                &test.customer_token,
                order_body(&test),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let uri = format!("/api/restaurant/orders/new-count?since={since}");
        let response = test
            .app
            .oneshot(get_request(&uri, &test.restaurant_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["notification"], 1);
    }

    #[tokio::test]
    async fn test_payment_intent_endpoint() {
        let test = create_test_app().await;

        let response = test
            .app
            .oneshot(post_request(
                "/api/customer/payment-intent",
                &test.customer_token,
                serde_json::json!({ "total": "13" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["client_secret"].as_str().unwrap().contains("secret"));
    }
}
