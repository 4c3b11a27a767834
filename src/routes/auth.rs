// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::models::Identity;
use crate::services::account::SIGNED_IN_MESSAGE;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create an account and its profile document.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let identity = state
        .accounts
        .sign_up(&req.email, &req.password, &req.confirm_password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            identity,
            message: None,
        }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let identity = state.accounts.sign_in(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        identity,
        message: Some(SIGNED_IN_MESSAGE.to_string()),
    }))
}

async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.accounts.sign_out().await;
    StatusCode::NO_CONTENT
}
