// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use kurukatsu::config::Config;
use kurukatsu::db::{FirestoreDb, MemoryStore};
use kurukatsu::routes::create_router;
use kurukatsu::services::MemoryIdentity;
use kurukatsu::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Offline backends, exposed so tests can inspect and sabotage them.
#[allow(dead_code)]
pub struct TestBackends {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
}

/// Create a test app with in-memory backends and a subscribed session.
/// Returns the router, the shared state and the backends.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TestBackends) {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(MemoryIdentity::new());

    let state = Arc::new(AppState::new(
        Config::default(),
        store.clone(),
        identity.clone(),
    ));
    state
        .session
        .subscribe(state.identity.as_ref())
        .expect("session subscribe");

    (
        create_router(state.clone()),
        state,
        TestBackends { store, identity },
    )
}

/// Send a request with an optional JSON body.
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The circle from the happy-path scenario.
#[allow(dead_code)]
pub fn tennis_draft() -> serde_json::Value {
    serde_json::json!({
        "name": "Tennis Club",
        "universityName": "Test Univ",
        "leaderName": "Leader",
        "contactInfo": "leader@example.com",
        "genre": "スポーツ（球技）",
        "features": ["初心者歓迎"],
        "frequency": "週１回",
        "activityDays": [],
        "members": "11-30人",
        "genderratio": "半々",
        "circleType": "学内サークル",
        "isRecruiting": true
    })
}

/// Sign up through the API; the session follows the new account.
#[allow(dead_code)]
pub async fn sign_up(app: &axum::Router, email: &str) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/signup",
        Some(serde_json::json!({
            "email": email,
            "password": "abc12345",
            "confirmPassword": "abc12345"
        })),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["identity"]["uid"]
        .as_str()
        .unwrap()
        .to_string()
}
