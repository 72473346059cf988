use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use maintenance_scheduling::clients::{LoggingDispatcher, Prediction, Predictor, ReportGenerator};
use maintenance_scheduling::config::EnvironmentConfig;
use maintenance_scheduling::database::seed::seed_demo_data;
use maintenance_scheduling::repositories::MemoryStore;
use maintenance_scheduling::routes::create_app;
use maintenance_scheduling::state::{AppState, Collaborators};
use maintenance_scheduling::utils::errors::{AppError, AppResult};

struct StubPredictor;

#[async_trait]
impl Predictor for StubPredictor {
    async fn predict(&self, _features: &Value) -> AppResult<Prediction> {
        Ok(Prediction {
            maintenance_required: true,
            confidence: 87.5,
            probability: Some(0.875),
            extra: serde_json::Map::new(),
        })
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

struct DownReportGenerator;

#[async_trait]
impl ReportGenerator for DownReportGenerator {
    async fn generate(&self, _request: &Value) -> AppResult<Value> {
        Err(AppError::DependencyUnavailable("Report service unavailable".to_string()))
    }

    async fn is_healthy(&self) -> bool {
        false
    }
}

// App over a seeded in-memory store with stubbed collaborators
fn create_test_app() -> Router {
    let store = MemoryStore::new();
    seed_demo_data(&store);
    let config = EnvironmentConfig {
        shuffle_centers: false,
        ..EnvironmentConfig::default()
    };
    let collaborators = Collaborators {
        predictor: Arc::new(StubPredictor),
        reports: Arc::new(DownReportGenerator),
        dispatcher: Arc::new(LoggingDispatcher),
    };
    let state = AppState::new(config, Arc::new(store), collaborators).unwrap();
    create_app(state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, uri, Some(body)).await
}

async fn flag_v001(app: &Router) {
    let (status, body) = post(
        app,
        "/api/ingest_telemetry",
        json!({
            "vehicle_id": "V001",
            "oil_quality": 2.0,
            "battery_percent": 45.0,
            "brake_condition": "Poor",
            "tire_pressure": 27.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flagged_for_maintenance"], true);
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "healthy");
    assert_eq!(body["services"]["predictor"], "healthy");
    assert_eq!(body["services"]["report_generator"], "down");
    assert_eq!(body["simulator_running"], false);
}

#[tokio::test]
async fn test_get_slots() {
    let app = create_test_app();

    let (status, body) = get(&app, "/api/getSlots?center_id=SC001&date=2031-01-06").await;
    assert_eq!(status, StatusCode::OK);
    // SC001 opens 08:00-20:00
    assert_eq!(body["total_slots"], 12);
    assert_eq!(body["available_slots"][0], "2031-01-06T08:00:00Z");

    let (status, _) = get(&app, "/api/getSlots?center_id=SC001").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/getSlots?center_id=SC001&date=06-01-2031").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid date format. Use YYYY-MM-DD");

    let (status, body) = get(&app, "/api/getSlots?center_id=SC999&date=2031-01-06").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_slots"], 0);
}

#[tokio::test]
async fn test_schedule_batch_reports_per_vehicle_failures() {
    let app = create_test_app();
    flag_v001(&app).await;

    let (status, body) = post(
        &app,
        "/api/schedule_batch",
        json!({ "vehicles": ["V001", "V002", "V404"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["scheduled_count"], 1);
    assert_eq!(body["failed_count"], 2);
    assert_eq!(body["bookings"][0]["vehicle_id"], "V001");
    assert_eq!(body["bookings"][0]["status"], "provisional");
    assert_eq!(body["bookings"][0]["severity_level"], "critical");

    let failures = body["failed_vehicles"].as_array().unwrap();
    assert!(failures
        .iter()
        .any(|f| f["vehicle_id"] == "V002" && f["reason"] == "No maintenance flag found"));
    assert!(failures
        .iter()
        .any(|f| f["vehicle_id"] == "V404" && f["reason"] == "Vehicle not found"));
}

#[tokio::test]
async fn test_schedule_batch_requires_vehicles() {
    let app = create_test_app();
    let (status, body) = post(&app, "/api/schedule_batch", json!({ "vehicles": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = create_test_app();
    flag_v001(&app).await;
    let (_, body) = post(&app, "/api/schedule_batch", json!({ "vehicles": ["V001"] })).await;
    let booking_id = body["bookings"][0]["booking_id"].as_str().unwrap().to_string();

    let (status, body) = post(&app, "/api/confirmBooking", json!({ "booking_id": booking_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "confirmed");
    assert!(body["booking"]["confirmed_at"].is_string());

    let (status, body) = post(&app, "/api/confirmBooking", json!({ "booking_id": booking_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STATE_CONFLICT");

    let (status, _) = post(&app, "/api/confirmBooking", json!({ "booking_id": "BKG-NOPE" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&app, "/api/confirmBooking", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/bookings?status=confirmed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = post(&app, &format!("/api/bookings/{}/start", booking_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "in_progress");

    let (status, _) = post(&app, &format!("/api/bookings/{}/cancel", booking_id), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, &format!("/api/bookings/{}/complete", booking_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "completed");

    let (status, _) = get(&app, "/api/bookings?status=pending").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forecast_endpoints() {
    let app = create_test_app();

    let (status, body) = call(&app, Method::POST, "/api/forecast/generate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forecasts"].as_array().unwrap().len(), 3);
    assert_eq!(body["forecasts"][0]["confidence_level"], 0.5);

    let (status, body) = post(
        &app,
        "/api/forecast/generate",
        json!({ "regions": ["North"], "forecast_days": 14 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forecasts"][0]["region"], "North");

    let (status, body) = get(&app, "/api/forecast/regional").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = get(&app, "/api/forecast/capacity?region=South").await;
    assert_eq!(status, StatusCode::OK);
    let centers = body["capacity_forecast"].as_array().unwrap();
    assert_eq!(centers.len(), 1);
    assert_eq!(centers[0]["center_id"], "SC002");
    assert_eq!(centers[0]["status"], "low");

    let (status, body) = post(
        &app,
        "/api/forecast/feedback",
        json!({ "region": "North", "actual_demand": 25, "capacity_utilization": 0.95 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["adjustment"], 0.1);

    let (status, _) = post(&app, "/api/forecast/generate", json!({ "forecast_days": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_cycle_audit_trail() {
    let app = create_test_app();
    flag_v001(&app).await;

    let (status, body) = post(
        &app,
        "/api/orchestrate/full_cycle",
        json!({ "forecast_days": 7, "auto_confirm": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let steps = body["results"]["steps"].as_array().unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s["step"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "forecast_generation",
            "get_flagged_vehicles",
            "scheduling",
            "notifications",
            "feedback_processing"
        ]
    );
    assert_eq!(steps[0]["forecasts_generated"], 3);
    assert_eq!(steps[1]["flagged_count"], 1);
    assert_eq!(steps[2]["scheduled_count"], 1);
    assert_eq!(steps[3]["sent_count"], 1);
    assert_eq!(steps[4]["status"], "success");

    let (_, body) = get(&app, "/api/notifications").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["notifications"][0]["template"], "booking_confirmation");
}

#[tokio::test]
async fn test_full_cycle_without_flags_skips_scheduling() {
    let app = create_test_app();
    let (status, body) = call(&app, Method::POST, "/api/orchestrate/full_cycle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["steps"][2]["status"], "skipped");
    assert_eq!(body["results"]["steps"][2]["reason"], "No vehicles to schedule");
}

#[tokio::test]
async fn test_schedule_flagged() {
    let app = create_test_app();

    let (status, body) = post(&app, "/api/orchestrate/schedule_flagged", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheduled_count"], 0);
    assert_eq!(body["message"], "No vehicles flagged for maintenance");

    flag_v001(&app).await;
    let (_, body) = post(&app, "/api/orchestrate/schedule_flagged", json!({})).await;
    assert_eq!(body["scheduled_count"], 1);
}

#[tokio::test]
async fn test_notifications() {
    let app = create_test_app();
    flag_v001(&app).await;
    let (_, body) = post(&app, "/api/schedule_batch", json!({ "vehicles": ["V001"] })).await;
    let booking_id = body["bookings"][0]["booking_id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &app,
        "/api/notifications/send",
        json!({ "booking_id": booking_id, "notification_type": "reminder" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["notification_type"], "reminder");

    let (status, _) = post(
        &app,
        "/api/notifications/send",
        json!({ "booking_id": booking_id, "notification_type": "fax" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/api/notifications/send", json!({ "booking_id": "BKG-NOPE" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, &format!("/api/notifications?booking_id={}", booking_id)).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_telemetry_ingestion() {
    let app = create_test_app();

    let (status, body) = post(
        &app,
        "/api/ingest_telemetry",
        json!({ "vehicle_id": "V002", "oil_quality": 8.0, "timestamp": "2025-12-01T10:00:00Z" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flagged_for_maintenance"], false);
    assert_eq!(body["timestamp"], "2025-12-01T10:00:00Z");

    let (status, _) = post(&app, "/api/ingest_telemetry", json!({ "vehicle_id": "V404" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&app, "/api/ingest_telemetry", json!({ "oil_quality": 2.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // a second severe reading does not open a second flag
    flag_v001(&app).await;
    let (_, body) = post(
        &app,
        "/api/ingest_telemetry",
        json!({ "vehicle_id": "V001", "oil_quality": 1.0, "brake_condition": "Poor" }),
    )
    .await;
    assert_eq!(body["flagged_for_maintenance"], false);

    let (status, body) = get(&app, "/api/telemetry?vehicle_id=V001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_simulator_control() {
    let app = create_test_app();

    let (status, body) = post(&app, "/api/simulator/stop", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STATE_CONFLICT");

    let (status, body) = post(&app, "/api/simulator/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["batch_size"], 3);

    let (status, _) = post(&app, "/api/simulator/start", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app, "/api/simulator/status").await;
    assert_eq!(body["running"], true);

    let (status, _) = post(&app, "/api/simulator/stop", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&app, "/api/simulator/status").await;
    assert_eq!(body["running"], false);
}

#[tokio::test]
async fn test_gateway_proxies() {
    let app = create_test_app();

    let (status, body) = post(&app, "/predict", json!({ "vehicle_id": "V001", "mileage": 52000 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maintenance_required"], true);
    assert_eq!(body["probability"], 0.875);

    let (status, body) = post(&app, "/predict", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No data provided");

    let (status, body) = post(&app, "/report", json!({ "vehicle_id": "V001" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "DEPENDENCY_UNAVAILABLE");
}

#[tokio::test]
async fn test_schedule_batch_rejects_bad_windows() {
    let app = create_test_app();
    flag_v001(&app).await;

    let (status, body) = post(
        &app,
        "/api/schedule_batch",
        json!({
            "vehicles": ["V001"],
            "preferred_date_range": { "start": "2031-01-10", "end": "2031-01-05" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End date must not be before start date");

    let (status, body) = post(
        &app,
        "/api/schedule_batch",
        json!({
            "vehicles": ["V001"],
            "preferred_date_range": { "start": "0001-01-01", "end": "9999-12-31" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Date range cannot exceed 365 days");

    // the flag is still open for a well-formed request
    let (status, body) = post(&app, "/api/schedule_batch", json!({ "vehicles": ["V001"] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheduled_count"], 1);
}

#[tokio::test]
async fn test_blank_identifiers_are_rejected() {
    let app = create_test_app();

    let (status, body) = post(&app, "/api/confirmBooking", json!({ "booking_id": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "booking_id is required");

    let (status, _) = get(&app, "/api/getSlots?center_id=&date=2031-01-06").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
