// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Circle registration routes.

use crate::error::Result;
use crate::models::{CircleDraft, Confirmation, DraftMode, Identity, OwnershipState};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Draft validation needs no session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/circle/validate", post(validate_draft))
}

/// Circle routes (require a session).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/circle", get(load_ownership).post(submit_draft))
        .route("/api/circle/resume", post(resume_create))
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Check the required-field contract without saving anything.
async fn validate_draft(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<CircleDraft>,
) -> Result<Json<ValidateResponse>> {
    state.circles.validate(&draft)?;
    Ok(Json(ValidateResponse { valid: true }))
}

/// Form mode (create or edit) and the draft to start from.
async fn load_ownership(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
) -> Result<Json<OwnershipState>> {
    let ownership = state.circles.load_ownership_state(Some(&user)).await?;
    Ok(Json(ownership))
}

/// Submission body: the mode from `GET /api/circle` plus the edited draft.
#[derive(Deserialize)]
pub struct SubmitRequest {
    #[serde(flatten)]
    pub mode: DraftMode,
    pub draft: CircleDraft,
}

async fn submit_draft(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<Confirmation>> {
    let confirmation = state
        .circles
        .submit_draft(Some(&user), &req.draft, &req.mode)
        .await?;
    Ok(Json(confirmation))
}

#[derive(Deserialize)]
pub struct ResumeRequest {
    pub circle_id: String,
}

/// Finish a create that failed after the circle was written.
async fn resume_create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(req): Json<ResumeRequest>,
) -> Result<Json<Confirmation>> {
    let confirmation = state
        .circles
        .resume_create(Some(&user), &req.circle_id)
        .await?;
    Ok(Json(confirmation))
}
