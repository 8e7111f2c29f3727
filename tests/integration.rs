use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use parcel_relay::api::rest::router;
use parcel_relay::clock::SystemClock;
use parcel_relay::config::Config;
use parcel_relay::notify::{Notifier, NotifyError};
use parcel_relay::state::AppState;
use parcel_relay::store::MemoryStore;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SENDER: &str = "00000000-0000-0000-0000-000000000001";
const TRAVELER: &str = "00000000-0000-0000-0000-000000000002";
const ADMIN: &str = "00000000-0000-0000-0000-000000000003";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn last_code_for(&self, destination: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(_, to)| to == destination)
            .map(|(code, _)| code.clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, code: &str, destination: &str) -> Result<(), NotifyError> {
        self.sent.lock().push((code.to_string(), destination.to_string()));
        Ok(())
    }
}

struct DownNotifier;

#[async_trait]
impl Notifier for DownNotifier {
    async fn send(&self, _code: &str, destination: &str) -> Result<(), NotifyError> {
        Err(NotifyError {
            destination: destination.to_string(),
            reason: "gateway timeout".to_string(),
        })
    }
}

fn test_config() -> Config {
    Config {
        otp_hash_memory_kib: 8,
        otp_hash_iterations: 1,
        ..Config::default()
    }
}

fn app_with(notifier: Arc<dyn Notifier>) -> axum::Router {
    let state = AppState::new(
        &test_config(),
        Arc::new(MemoryStore::new()),
        notifier,
        Arc::new(SystemClock),
    )
    .unwrap();
    router(Arc::new(state))
}

fn setup() -> axum::Router {
    app_with(Arc::new(RecordingNotifier::default()))
}

fn json_request(method: &str, uri: &str, principal: Option<(&str, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = principal {
        builder = builder
            .header("x-principal-id", id)
            .header("x-principal-role", role);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, principal: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((id, role)) = principal {
        builder = builder
            .header("x-principal-id", id)
            .header("x-principal-role", role);
    }
    builder.body(Body::empty()).unwrap()
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

fn sender() -> Option<(&'static str, &'static str)> {
    Some((SENDER, "USER"))
}

fn traveler() -> Option<(&'static str, &'static str)> {
    Some((TRAVELER, "TRAVELER"))
}

fn admin() -> Option<(&'static str, &'static str)> {
    Some((ADMIN, "ADMIN"))
}

fn parcel_body() -> Value {
    json!({
        "pickup": { "lat": 12.90, "lng": 77.58 },
        "drop": { "lat": 12.95, "lng": 77.60 },
        "parcel": {
            "weight": 1.5,
            "dimensions": { "length": 30.0, "width": 20.0, "height": 10.0 },
            "description": "birthday gift",
            "fragile": true
        }
    })
}

async fn create_parcel(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/requests", sender(), parcel_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn declare_route(app: &axum::Router) {
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/travelers/route",
            traveler(),
            json!({
                "current_location": { "lat": 12.91, "lng": 77.585 },
                "destination": { "lat": 12.94, "lng": 77.605 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
    assert_eq!(body["rooms"], json!({}));
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

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
    assert!(body.contains("matches_ranked_total"));
    assert!(body.contains("room_connections"));
}

#[tokio::test]
async fn missing_principal_is_unauthenticated() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(json_request("POST", "/requests", None, parcel_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/requests",
            Some((SENDER, "PILOT")),
            parcel_body(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_list_requests() {
    let app = setup();
    let id = create_parcel(&app).await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/requests/{id}"), sender()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["parcel"]["fragile"], true);

    let response = app
        .clone()
        .oneshot(get_request("/requests?status=PENDING&limit=500", sender()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["total_records"], 1);

    let response = app
        .clone()
        .oneshot(get_request("/feed", traveler()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["items"][0]["id"], id.as_str());

    let stranger = Uuid::new_v4().to_string();
    let response = app
        .oneshot(get_request(&format!("/requests/{id}"), Some((stranger.as_str(), "USER"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_request_is_rejected() {
    let app = setup();
    let mut body = parcel_body();
    body["parcel"]["weight"] = json!(-1.0);

    let response = app
        .oneshot(json_request("POST", "/requests", sender(), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].as_str().is_some());
}

#[tokio::test]
async fn unknown_request_returns_404() {
    let app = setup();
    let response = app
        .oneshot(get_request(&format!("/requests/{}", Uuid::new_v4()), sender()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_matches_lists_nearby_traveler() {
    let app = setup();
    declare_route(&app).await;
    let id = create_parcel(&app).await;

    let response = app
        .oneshot(get_request(&format!("/requests/{id}/matches"), sender()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let ranked = body.as_array().unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0]["traveler_id"], TRAVELER);
    let detour = ranked[0]["detour_km"].as_f64().unwrap();
    assert!(detour > 0.0 && detour < 10.0);
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    declare_route(&app).await;
    let request_id = create_parcel(&app).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/matches/batch", admin(), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let match_id = created[0]["id"].as_str().unwrap().to_string();
    assert_eq!(created[0]["request_id"], request_id.as_str());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/matches/{match_id}/accept"),
            traveler(),
            json!({ "fare": 150.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let accepted = body_json(response).await;
    let delivery_id = accepted["delivery"]["id"].as_str().unwrap().to_string();
    let pickup_code = accepted["pickup_code"].as_str().unwrap().to_string();
    let drop_code = accepted["drop_code"].as_str().unwrap().to_string();
    assert_eq!(accepted["delivery"]["status"], "ACCEPTED");
    assert!(accepted["delivery"].get("pickup_code_hash").is_none());
    assert_ne!(pickup_code, drop_code);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries/drop",
            traveler(),
            json!({ "delivery_id": delivery_id, "code": drop_code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries/pickup",
            traveler(),
            json!({ "delivery_id": delivery_id, "code": pickup_code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "PICKED_UP");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tracking/location",
            traveler(),
            json!({ "delivery_id": delivery_id, "lat": 12.93, "lng": 77.59 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries/drop",
            traveler(),
            json!({ "delivery_id": delivery_id, "code": drop_code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "DELIVERED");

    let response = app
        .clone()
        .oneshot(get_request(&format!("/requests/{request_id}"), sender()))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "DELIVERED");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/matches/{match_id}/accept"),
            traveler(),
            json!({ "fare": 150.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_request_twice_conflicts() {
    let app = setup();
    let id = create_parcel(&app).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", &format!("/requests/{id}/cancel"), sender(), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "CANCELLED");

    let response = app
        .oneshot(json_request("POST", &format!("/requests/{id}/cancel"), sender(), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_code_round_trip() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app_with(notifier.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            None,
            json!({ "phone": "9876543210" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["expires_at"].is_string());

    let code = notifier.last_code_for("9876543210").unwrap();
    let wrong = if code == "111111" { "222222" } else { "111111" };

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            None,
            json!({ "phone": "9876543210", "otp": wrong }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            None,
            json!({ "phone": "9876543210", "otp": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["verified"], true);

    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            None,
            json!({ "phone": "9876543210", "otp": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_code_quota_is_enforced() {
    let app = setup();

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/otp/request",
                None,
                json!({ "phone": "9123456789" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            None,
            json!({ "phone": "9123456789" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
}

#[tokio::test]
async fn invalid_phone_is_rejected() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            None,
            json!({ "phone": "12345" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notifier_failure_withdraws_the_code() {
    let app = app_with(Arc::new(DownNotifier));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/request",
            None,
            json!({ "phone": "9876543210" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            None,
            json!({ "phone": "9876543210", "otp": "123456" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
