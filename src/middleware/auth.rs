// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires a signed-in user.
///
/// Reads the session store and inserts the current `Identity` as a request
/// extension for the handlers behind it.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = state
        .session
        .current_identity()
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(uid = %identity.uid, path = %request.uri().path(), "Session accepted");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
