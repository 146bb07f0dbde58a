//! Route tests for the gateway.
//!
//! The router runs over an in-memory marketplace, so no database is needed.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{AppError, JwtConfig, MarketplaceConfig};
use domain::Password;
use gateway_lib::routes::create_router;
use gateway_lib::session::SessionTokens;
use gateway_lib::state::AppState;
use marketplace_lib::infra::MockDocumentStore;
use marketplace_lib::service::{AdminCredentials, Marketplace, ThresholdDiagnoser};

const ADMIN_EMAIL: &str = "ops@repairhub.example";
const ADMIN_PASSWORD: &str = "correct-horse-battery";

fn sessions() -> SessionTokens {
    SessionTokens::new(&JwtConfig {
        secret: "test-secret-key-for-testing-only-32chars".to_string(),
        expiration_hours: 1,
    })
}

fn credentials() -> AdminCredentials {
    AdminCredentials::new().with(ADMIN_EMAIL, Password::new(ADMIN_PASSWORD).unwrap())
}

fn app() -> Router {
    let market = Marketplace::in_memory(MarketplaceConfig::default(), credentials());
    create_router(AppState::new(market, sessions()))
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Start a session and register it; returns the token and user id
async fn account(app: &Router, email: &str, name: &str, user_type: &str) -> (String, String) {
    let (status, session) = send(app, Method::POST, "/sessions", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let token = session["token"]["access_token"].as_str().unwrap().to_string();

    let (status, user) = send(
        app,
        Method::POST,
        "/accounts/register",
        Some(&token),
        Some(json!({ "email": email, "name": name, "userType": user_type })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (token, user["id"].as_str().unwrap().to_string())
}

// =============================================================================
// Health & auth
// =============================================================================

#[tokio::test]
async fn test_health_check_reports_store() {
    let (status, body) = send(&app(), Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_check_degraded_when_store_down() {
    let mut store = MockDocumentStore::new();
    store
        .expect_ping()
        .returning(|| Err(AppError::internal("connection refused")));
    let market = Marketplace::new(
        Arc::new(store),
        MarketplaceConfig::default(),
        credentials(),
        Arc::new(ThresholdDiagnoser::default()),
    );
    let app = create_router(AppState::new(market, sessions()));

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/accounts/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/requests", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_profile_round_trip() {
    let app = app();
    let (token, id) = account(&app, "plant@acme.example", "Acme", "company").await;

    let (status, me) = send(&app, Method::GET, "/accounts/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.as_str());
    assert_eq!(me["type"], "company");
    assert_eq!(me["balance"], 5000);
}

#[tokio::test]
async fn test_guest_cannot_post_request() {
    let app = app();
    let (_, session) = send(&app, Method::POST, "/sessions", None, None).await;
    let token = session["token"]["access_token"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/requests",
        Some(token),
        Some(json!({ "machine": "Press", "issue": "Leak", "budget": 100 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "PROFILE_INCOMPLETE");
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = app();
    let (_, session) = send(&app, Method::POST, "/sessions", None, None).await;
    let token = session["token"]["access_token"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/accounts/register",
        Some(token),
        Some(json!({ "email": "not-an-email", "name": "Acme", "userType": "company" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid email format");
}

#[tokio::test]
async fn test_top_up_rejects_non_positive_amount() {
    let app = app();
    let (token, _) = account(&app, "plant@acme.example", "Acme", "company").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/wallet/top-up",
        Some(&token),
        Some(json!({ "amount": -5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/wallet/top-up",
        Some(&token),
        Some(json!({ "amount": 250 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 5250);
}

// =============================================================================
// Lifecycle over HTTP
// =============================================================================

#[tokio::test]
async fn test_contract_lifecycle_over_http() {
    let app = app();
    let (company, _) = account(&app, "plant@acme.example", "Acme", "company").await;
    let (engineer, engineer_id) = account(&app, "eve@fixers.example", "Eve", "engineer").await;

    let (status, request) = send(
        &app,
        Method::POST,
        "/requests",
        Some(&company),
        Some(json!({
            "machine": "CNC Lathe X200",
            "machineType": "CNC Machine",
            "issue": "Spindle noise",
            "budget": 500,
            "location": "Plant 2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_str().unwrap();

    let (status, offer) = send(
        &app,
        Method::POST,
        &format!("/requests/{}/offers", request_id),
        Some(&engineer),
        Some(json!({ "price": 400, "description": "Bearing swap", "timeline": "1 day" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let offer_id = offer["id"].as_str().unwrap();

    let (status, contract) = send(
        &app,
        Method::POST,
        &format!("/offers/{}/contract", offer_id),
        Some(&company),
        Some(json!({ "contractType": "Standard" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let contract_id = contract["id"].as_str().unwrap();

    for token in [&company, &engineer] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/contracts/{}/sign", contract_id),
            Some(token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/contracts/{}/release", contract_id),
        Some(&engineer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, receipt) = send(
        &app,
        Method::POST,
        &format!("/contracts/{}/release", contract_id),
        Some(&company),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["creditedAmount"], 400);
    assert_eq!(receipt["newEngineerBalance"], 400);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/contracts/{}/release", contract_id),
        Some(&company),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_RELEASED");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/contracts/{}/review", contract_id),
        Some(&company),
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, rating) = send(
        &app,
        Method::GET,
        &format!("/accounts/{}/rating", engineer_id),
        Some(&company),
        None,
    )
    .await;
    assert_eq!(rating["rating"], 5.0);

    let (_, notifications) = send(&app, Method::GET, "/notifications", Some(&engineer), None).await;
    assert!(notifications
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["message"] == "Escrow released! $400 added to your wallet."));

    let (status, cleared) = send(&app, Method::DELETE, "/notifications", Some(&engineer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["cleared"].as_u64().unwrap() > 0);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_elevation() {
    let app = app();
    let (company, company_id) = account(&app, "plant@acme.example", "Acme", "company").await;

    let (status, _) = send(&app, Method::GET, "/admin/users", Some(&company), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, session) = send(&app, Method::POST, "/sessions", None, None).await;
    let admin = session["token"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/accounts/admin",
        Some(&admin),
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/accounts/admin",
        Some(&admin),
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, users) = send(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, banned) = send(
        &app,
        Method::POST,
        &format!("/admin/users/{}/ban", company_id),
        Some(&admin),
        Some(json!({ "banned": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banned["status"], "banned");

    let (status, body) = send(
        &app,
        Method::POST,
        "/requests",
        Some(&company),
        Some(json!({ "machine": "Press", "issue": "Leak", "budget": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

// =============================================================================
// Maintenance
// =============================================================================

#[tokio::test]
async fn test_critical_diagnosis_raises_request() {
    let app = app();
    let (company, company_id) = account(&app, "plant@acme.example", "Acme", "company").await;

    let (status, analysis) = send(
        &app,
        Method::POST,
        "/maintenance/diagnostics",
        Some(&company),
        Some(json!({
            "name": "Hydraulic Press HP5",
            "machineType": "Hydraulic Press",
            "mode": "Stress Test",
            "samples": [{ "temp": 71.0, "vibration": 2.1 }, { "temp": 96.5, "vibration": 5.8 }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["status"], "Critical");
    assert_eq!(analysis["urgentAction"], true);
    assert_eq!(analysis["automatedRequest"]["contactId"], company_id.as_str());
    assert_eq!(analysis["automatedRequest"]["priority"], "Critical");

    let (_, requests) = send(&app, Method::GET, "/requests", Some(&company), None).await;
    assert_eq!(requests.as_array().unwrap().len(), 1);
}
