// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and profile routes.

use crate::error::Result;
use crate::models::{Identity, ProfileUpdate, UserProfile};
use crate::services::SessionView;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Routes readable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/session", get(get_session))
}

/// Profile routes (require a session).
/// The session middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile).put(save_profile))
}

// ─── Session ─────────────────────────────────────────────────

/// Current session snapshot (identity may be absent).
async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(state.session.view())
}

// ─── User Profile ────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProfileResponse {
    pub uid: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.accounts.get_profile(&user).await?;
    Ok(Json(ProfileResponse {
        uid: user.uid,
        profile,
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn save_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<MessageResponse>> {
    let message = state.accounts.save_profile(&user, &update).await?;
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}
