// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every variant carries a user-facing message (`user_message`) that the
//! frontend shows inline; nothing here is fatal to the process.

use crate::models::DraftMode;
use crate::services::identity::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Which form a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Circle,
    Profile,
    SignUp,
    SignIn,
}

/// Required-field contract violation.
///
/// `missing` lists every failing required field and `invalid` every
/// optional field holding a label outside its vocabulary. `Display` stays
/// the single generic message the user sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub form: FormKind,
    pub missing: Vec<&'static str>,
    pub invalid: Vec<&'static str>,
    message: &'static str,
}

impl ValidationError {
    pub const CIRCLE_MESSAGE: &'static str = "必須項目をすべて入力してください。";
    pub const PROFILE_MESSAGE: &'static str = "全ての必須項目を入力してください。";
    pub const SIGN_IN_MESSAGE: &'static str = "メールアドレスとパスワードを入力してください。";
    pub const PASSWORD_MISMATCH_MESSAGE: &'static str = "パスワードが一致しません。";
    pub const PASSWORD_POLICY_MESSAGE: &'static str = "パスワードの条件を満たしていません。";
    pub const INVALID_CHOICE_MESSAGE: &'static str = "選択できない値が含まれています。";

    pub fn circle(missing: Vec<&'static str>) -> Self {
        Self {
            form: FormKind::Circle,
            missing,
            invalid: Vec::new(),
            message: Self::CIRCLE_MESSAGE,
        }
    }

    pub fn profile(missing: Vec<&'static str>) -> Self {
        Self {
            form: FormKind::Profile,
            missing,
            invalid: Vec::new(),
            message: Self::PROFILE_MESSAGE,
        }
    }

    pub fn sign_in(missing: Vec<&'static str>) -> Self {
        Self {
            form: FormKind::SignIn,
            missing,
            invalid: Vec::new(),
            message: Self::SIGN_IN_MESSAGE,
        }
    }

    pub fn password_mismatch() -> Self {
        Self {
            form: FormKind::SignUp,
            missing: vec!["confirmPassword"],
            invalid: Vec::new(),
            message: Self::PASSWORD_MISMATCH_MESSAGE,
        }
    }

    /// `violations` are the failed password rules.
    pub fn password_policy(violations: Vec<&'static str>) -> Self {
        Self {
            form: FormKind::SignUp,
            missing: violations,
            invalid: Vec::new(),
            message: Self::PASSWORD_POLICY_MESSAGE,
        }
    }

    /// Attach optional fields with out-of-vocabulary labels.
    ///
    /// Missing required fields keep the form's message; otherwise the
    /// error reads as an invalid choice.
    pub fn with_invalid(mut self, invalid: Vec<&'static str>) -> Self {
        if self.missing.is_empty() && !invalid.is_empty() {
            self.message = Self::INVALID_CHOICE_MESSAGE;
        }
        self.invalid = invalid;
        self
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Step of the circle commit that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStep {
    /// Create: insert the circle document.
    InsertCircle,
    /// Create: write the leader's roster entry.
    AddLeaderMembership,
    /// Create: add the circle to the leader's `joinedCircleIds`.
    LinkUserProfile,
    /// Edit: overwrite the circle document.
    UpdateCircle,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitStep::InsertCircle => "insert_circle",
            CommitStep::AddLeaderMembership => "add_leader_membership",
            CommitStep::LinkUserProfile => "link_user_profile",
            CommitStep::UpdateCircle => "update_circle",
        };
        f.write_str(s)
    }
}

/// Profile store access that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOp {
    Load,
    Save,
}

impl fmt::Display for ProfileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileOp::Load => "load",
            ProfileOp::Save => "save",
        })
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Not the leader of circle {0}")]
    Forbidden(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A circle write failed part-way. `circle_id` is set once the circle
    /// document exists, so the caller can resume instead of re-creating.
    #[error("Circle {mode} failed at step {step}: {message}")]
    Commit {
        mode: &'static str,
        step: CommitStep,
        circle_id: Option<String>,
        message: String,
    },

    #[error("Profile {op} failed: {message}")]
    Profile { op: ProfileOp, message: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub const UNAUTHORIZED_MESSAGE: &'static str = "ユーザー情報が取得できませんでした。";
    pub const CREATE_FAILED_MESSAGE: &'static str = "サークル情報の登録中にエラーが発生しました。";
    pub const UPDATE_FAILED_MESSAGE: &'static str = "サークル情報の更新中にエラーが発生しました。";
    pub const PROFILE_SAVE_FAILED_MESSAGE: &'static str = "プロフィールの保存に失敗しました。";
    pub const PROFILE_LOAD_FAILED_MESSAGE: &'static str = "ユーザーデータの取得に失敗しました。";
    pub const GENERIC_MESSAGE: &'static str = "エラーが発生しました。もう一度お試しください。";

    /// Wrap a store failure that happened during a circle commit.
    pub fn commit(mode: &DraftMode, step: CommitStep, circle_id: Option<String>, source: AppError) -> Self {
        let message = match source {
            AppError::Database(msg) => msg,
            other => other.to_string(),
        };
        AppError::Commit {
            mode: mode.label(),
            step,
            circle_id,
            message,
        }
    }

    /// Wrap a store failure that happened while reading or writing a profile.
    pub fn profile(op: ProfileOp, source: AppError) -> Self {
        let message = match source {
            AppError::Database(msg) => msg,
            other => other.to_string(),
        };
        AppError::Profile { op, message }
    }

    /// Message shown inline to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Unauthorized | AppError::Forbidden(_) => Self::UNAUTHORIZED_MESSAGE,
            AppError::Validation(err) => err.message(),
            AppError::Auth(err) => err.user_message(),
            AppError::Commit { step, .. } => match step {
                CommitStep::UpdateCircle => Self::UPDATE_FAILED_MESSAGE,
                _ => Self::CREATE_FAILED_MESSAGE,
            },
            AppError::Profile { op, .. } => match op {
                ProfileOp::Load => Self::PROFILE_LOAD_FAILED_MESSAGE,
                ProfileOp::Save => Self::PROFILE_SAVE_FAILED_MESSAGE,
            },
            AppError::NotFound(_)
            | AppError::BadRequest(_)
            | AppError::Database(_)
            | AppError::Internal(_) => Self::GENERIC_MESSAGE,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden(circle_id) => (
                StatusCode::FORBIDDEN,
                "forbidden",
                Some(serde_json::json!({ "circle_id": circle_id })),
            ),
            AppError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(if err.invalid.is_empty() {
                    serde_json::json!({ "fields": err.missing })
                } else {
                    serde_json::json!({ "fields": err.missing, "invalid": err.invalid })
                }),
            ),
            AppError::Auth(err) => (err.status_code(), "auth_error", Some(serde_json::json!(err.code()))),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found",
                Some(serde_json::json!(msg)),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                Some(serde_json::json!(msg)),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::BAD_GATEWAY, "persistence_error", None)
            }
            AppError::Commit {
                mode,
                step,
                circle_id,
                message,
            } => {
                tracing::error!(mode, step = %step, circle_id = ?circle_id, error = %message, "Circle commit failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "persistence_error",
                    Some(serde_json::json!({ "step": step, "circle_id": circle_id })),
                )
            }
            AppError::Profile { op, message } => {
                tracing::error!(op = %op, error = %message, "Profile store access failed");
                (StatusCode::BAD_GATEWAY, "persistence_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message: self.user_message().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
