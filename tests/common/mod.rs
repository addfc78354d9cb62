use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use vaccine_card::api::create_routes;
use vaccine_card::auth::{JwtService, PasswordService};
use vaccine_card::config::JwtConfig;
use vaccine_card::data::InMemoryStore;
use vaccine_card::handlers::{CreateUser, CreateVaccine, Mediator};
use vaccine_card::models::{CreateUserRequest, CreateVaccineRequest, UserResponse, VaccineResponse};

/// Lowest bcrypt cost, keeps the suite fast.
pub const TEST_HASH_COST: u32 = 4;

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test_secret_key_for_testing_only".to_string(),
        issuer: "vaccine-card-test".to_string(),
        audience: "vaccine-card-test-clients".to_string(),
        expiration_hours: 24,
    }
}

/// A mediator over a fresh in-memory store.
pub fn test_mediator() -> Mediator {
    mediator_with_store(TEST_HASH_COST).0
}

/// A mediator plus a handle on its store, for arranging records directly.
pub fn mediator_with_store(hash_cost: u32) -> (Mediator, InMemoryStore) {
    let store = InMemoryStore::new();
    let mediator = Mediator::new(
        Arc::new(store.clone()),
        PasswordService::new(hash_cost),
        JwtService::new(&jwt_config()),
    );
    (mediator, store)
}

pub fn test_app(require_auth: bool) -> Router {
    create_routes(test_mediator(), require_auth)
}

/// A birth date that makes the person exactly `years` old by the 365.25-day rule.
pub fn born_years_ago(years: i64) -> DateTime<Utc> {
    let days = (years as f64 * 365.25).ceil() as i64 + 2;
    Utc::now() - Duration::days(days)
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub async fn create_user(mediator: &Mediator, name: &str, age: i64) -> UserResponse {
    mediator
        .send(CreateUser(CreateUserRequest {
            name: name.to_string(),
            birth_date: Some(born_years_ago(age)),
            gender: "Female".to_string(),
        }))
        .await
        .expect("user should be created")
}

pub async fn create_vaccine(
    mediator: &Mediator,
    code: &str,
    doses: i32,
    minimum_age: Option<i32>,
    maximum_age: Option<i32>,
) -> VaccineResponse {
    mediator
        .send(CreateVaccine(CreateVaccineRequest {
            name: format!("Vaccine {code}"),
            code: code.to_string(),
            doses,
            minimum_age,
            maximum_age,
        }))
        .await
        .expect("vaccine should be created")
}

pub fn register_body(email: &str, password: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "confirmPassword": password,
    })
}

/// Send one request through the router and decode the JSON body (`Null` when empty).
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Send a raw (possibly malformed) JSON body.
pub async fn call_raw(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
