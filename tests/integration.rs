use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_dispatch::api::rest::router;
use delivery_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(1024, 10.0)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn json_request_as(method: &str, uri: &str, actor: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", actor)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Seeds a business and a confirmed order; returns (owner, order_id).
async fn seed_order(app: &axum::Router, payable: u64) -> (String, String) {
    let owner = Uuid::new_v4().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/businesses",
            json!({ "name": "Mama Nkechi Kitchen", "owner_id": owner }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let business = body_json(res).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "business_id": business["id"],
                "payable_amount": payable,
                "customer_phone": "+2348000000000"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order = body_json(res).await;

    (owner, order["id"].as_str().unwrap().to_string())
}

fn delivery_request_body(order_id: &str) -> Value {
    json!({
        "order_id": order_id,
        "pickup": {
            "coordinate": { "lat": 6.5244, "lng": 3.3792 },
            "address": "12 Marina Rd, Lagos Island",
            "contact_name": "Nkechi",
            "contact_phone": "+2348000000001"
        },
        "dropoff": {
            "coordinate": { "lat": 6.6018, "lng": 3.3515 },
            "address": "4 Allen Ave, Ikeja",
            "contact_name": "Ada",
            "contact_phone": "+2348000000002"
        },
        "package": { "size": "Large", "weight_kg": 2.5, "items": ["jollof pack"] },
        "payment_mode": "CashOnDelivery"
    })
}

async fn seed_rider(app: &axum::Router, name: &str, rating: f64) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": name,
                "phone": "+2348111111111",
                "vehicle": "Motorbike",
                "location": { "lat": 6.5250, "lng": 3.3800 },
                "rating": rating
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rider = body_json(res).await;
    rider["id"].as_str().unwrap().to_string()
}

async fn request_delivery(app: &axum::Router, owner: &str, order_id: &str) -> Value {
    let res = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            "/delivery/request",
            owner,
            delivery_request_body(order_id),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

async fn patch_status(
    app: &axum::Router,
    actor: &str,
    delivery_id: u64,
    expected: &str,
    next: &str,
) -> axum::response::Response {
    app.clone()
        .oneshot(json_request_as(
            "PATCH",
            &format!("/delivery/{delivery_id}/status"),
            actor,
            json!({ "expected_status": expected, "status": next }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["riders"], 0);
    assert_eq!(body["deliveries"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("deliveries_in_flight"));
}

#[tokio::test]
async fn register_rider_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "  ",
                "phone": "+234",
                "vehicle": "Motorbike",
                "location": { "lat": 6.52, "lng": 3.38 },
                "rating": 4.5
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rider_rating_clamped_to_5() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "Emeka",
                "phone": "+234",
                "vehicle": "Motorbike",
                "location": { "lat": 6.52, "lng": 3.38 },
                "rating": 9.9
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rating"], 5.0);
    assert_eq!(body["status"], "Available");
}

#[tokio::test]
async fn request_delivery_quotes_the_trip() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 4_500).await;

    let delivery = request_delivery(&app, &owner, &order_id).await;

    assert_eq!(delivery["status"], "Pending");
    assert_eq!(delivery["pricing"]["base_fee"], 500);
    assert_eq!(delivery["pricing"]["size_fee"], 200);
    let distance_fee = delivery["pricing"]["distance_fee"].as_u64().unwrap();
    assert!(distance_fee > 0);
    assert_eq!(
        delivery["pricing"]["total"].as_u64().unwrap(),
        500 + distance_fee + 200
    );
    assert_eq!(delivery["pricing"]["cod_amount"], 4_500);
    assert!(delivery["rider_id"].is_null());
    assert_eq!(delivery["updates"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn request_delivery_without_identity_returns_403() {
    let app = setup();
    let (_owner, order_id) = seed_order(&app, 1_000).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/delivery/request",
            delivery_request_body(&order_id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_delivery_by_non_owner_returns_403() {
    let app = setup();
    let (_owner, order_id) = seed_order(&app, 1_000).await;
    let stranger = Uuid::new_v4().to_string();

    let response = app
        .oneshot(json_request_as(
            "POST",
            "/delivery/request",
            &stranger,
            delivery_request_body(&order_id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_delivery_for_missing_order_returns_404() {
    let app = setup();
    let actor = Uuid::new_v4().to_string();
    let missing = Uuid::new_v4().to_string();

    let response = app
        .oneshot(json_request_as(
            "POST",
            "/delivery/request",
            &actor,
            delivery_request_body(&missing),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delivery_for_cancelled_order_returns_400() {
    let app = setup();
    let owner = Uuid::new_v4().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/businesses",
            json!({ "name": "Mama Nkechi Kitchen", "owner_id": owner }),
        ))
        .await
        .unwrap();
    let business = body_json(res).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "business_id": business["id"],
                "status": "Cancelled",
                "payable_amount": 1_000,
                "customer_phone": "+2348000000000"
            }),
        ))
        .await
        .unwrap();
    let order = body_json(res).await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            "/delivery/request",
            &owner,
            delivery_request_body(order_id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "order_not_eligible");

    // Nothing was created for the ineligible order.
    let response = app.oneshot(get_request("/health")).await.unwrap();
    let health = body_json(response).await;
    assert_eq!(health["deliveries"], 0);
}

#[tokio::test]
async fn second_delivery_for_same_order_returns_400() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 1_000).await;
    request_delivery(&app, &owner, &order_id).await;

    let response = app
        .oneshot(json_request_as(
            "POST",
            "/delivery/request",
            &owner,
            delivery_request_body(&order_id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "order_not_eligible");
}

#[tokio::test]
async fn find_riders_orders_by_rating() {
    let app = setup();
    seed_rider(&app, "Tunde", 3.2).await;
    let best = seed_rider(&app, "Chioma", 4.9).await;

    let response = app
        .oneshot(get_request("/delivery/riders?lat=6.5244&lng=3.3792"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let riders = body.as_array().unwrap();
    assert_eq!(riders.len(), 2);
    assert_eq!(riders[0]["id"], best.as_str());
}

#[tokio::test]
async fn find_riders_rejects_bad_coordinates() {
    let app = setup();
    let response = app
        .oneshot(get_request("/delivery/riders?lat=120.0&lng=3.3792"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assign_and_track_full_flow() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 2_000).await;
    let delivery = request_delivery(&app, &owner, &order_id).await;
    let delivery_id = delivery["id"].as_u64().unwrap();
    let rider_id = seed_rider(&app, "Emeka", 4.6).await;

    let response = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            &owner,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assigned = body_json(response).await;
    assert_eq!(assigned["status"], "Assigned");
    assert_eq!(assigned["rider_id"], rider_id.as_str());

    // The public tracker shows the rider's public profile only.
    let response = app
        .clone()
        .oneshot(get_request(&format!("/delivery/{delivery_id}/track")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["delivery"]["status"], "Assigned");
    assert_eq!(view["rider"]["name"], "Emeka");
    assert!(view["rider"].get("phone").is_none());
    assert!(view["rider"].get("current_delivery_id").is_none());

    // Rider walks the success path; delivery releases them.
    let res = patch_status(&app, &rider_id, delivery_id, "Assigned", "PickedUp").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = patch_status(&app, &rider_id, delivery_id, "PickedUp", "InTransit").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = patch_status(&app, &rider_id, delivery_id, "InTransit", "Delivered").await;
    assert_eq!(res.status(), StatusCode::OK);
    let done = body_json(res).await;
    assert_eq!(done["status"], "Delivered");
    assert!(!done["timeline"]["actual_delivery"].is_null());

    let response = app.oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(response).await;
    let rider = &riders.as_array().unwrap()[0];
    assert_eq!(rider["status"], "Available");
    assert!(rider["current_delivery_id"].is_null());
    assert_eq!(rider["completed_deliveries"], 1);
}

#[tokio::test]
async fn assign_offline_rider_returns_409() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 1_000).await;
    let delivery = request_delivery(&app, &owner, &order_id).await;
    let delivery_id = delivery["id"].as_u64().unwrap();
    let rider_id = seed_rider(&app, "Emeka", 4.6).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/riders/{rider_id}/status"),
            json!({ "status": "Offline" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            &owner,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "rider_unavailable");

    // Delivery is untouched by the failed assignment.
    let response = app
        .oneshot(get_request(&format!("/delivery/{delivery_id}/track")))
        .await
        .unwrap();
    let view = body_json(response).await;
    assert_eq!(view["delivery"]["status"], "Pending");
}

#[tokio::test]
async fn skipping_the_walk_returns_409_illegal_transition() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 1_000).await;
    let delivery = request_delivery(&app, &owner, &order_id).await;
    let delivery_id = delivery["id"].as_u64().unwrap();
    let rider_id = seed_rider(&app, "Emeka", 4.6).await;

    let res = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            &owner,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = patch_status(&app, &owner, delivery_id, "Assigned", "Delivered").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["kind"], "illegal_transition");
}

#[tokio::test]
async fn lost_race_returns_409_stale_status() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 1_000).await;
    let delivery = request_delivery(&app, &owner, &order_id).await;
    let delivery_id = delivery["id"].as_u64().unwrap();
    let rider_id = seed_rider(&app, "Emeka", 4.6).await;

    let res = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            &owner,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = patch_status(&app, &rider_id, delivery_id, "Assigned", "PickedUp").await;
    assert_eq!(res.status(), StatusCode::OK);

    // The owner still believes the delivery is assigned.
    let res = patch_status(&app, &owner, delivery_id, "Assigned", "Failed").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["kind"], "stale_status");
}

#[tokio::test]
async fn status_update_by_stranger_returns_403() {
    let app = setup();
    let (owner, order_id) = seed_order(&app, 1_000).await;
    let delivery = request_delivery(&app, &owner, &order_id).await;
    let delivery_id = delivery["id"].as_u64().unwrap();
    let stranger = Uuid::new_v4().to_string();

    let res = patch_status(&app, &stranger, delivery_id, "Pending", "Failed").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn track_missing_delivery_returns_404() {
    let app = setup();
    let response = app
        .oneshot(get_request("/delivery/999/track"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
