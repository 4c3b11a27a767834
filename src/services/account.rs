// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and profile flows: sign-up, sign-in, sign-out, profile editing.

use crate::db::DocumentStore;
use crate::error::{AppError, ProfileOp, ValidationError};
use crate::models::{Identity, ProfileUpdate, UserProfile};
use crate::services::identity::IdentityService;
use crate::time_utils::{format_utc_rfc3339, system_clock, Clock};
use std::sync::Arc;

pub const SIGNED_IN_MESSAGE: &str = "ログインが完了しました。";
pub const PROFILE_SAVED_MESSAGE: &str = "プロフィールを保存しました。";

/// Minimum password length accepted at sign-up.
const MIN_PASSWORD_LEN: usize = 8;

/// Password rules that `password` breaks (empty when it is acceptable).
pub fn password_violations(password: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        violations.push("minLength");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        violations.push("letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("digit");
    }
    violations
}

fn required_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if email.trim().is_empty() {
        missing.push("email");
    }
    if password.is_empty() {
        missing.push("password");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::sign_in(missing))
    }
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityService>,
    db: Arc<dyn DocumentStore>,
    clock: Clock,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityService>, db: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            db,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Create an account and its empty profile document.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Identity, AppError> {
        required_credentials(email, password)?;
        if password != confirm_password {
            return Err(ValidationError::password_mismatch().into());
        }
        let violations = password_violations(password);
        if !violations.is_empty() {
            return Err(ValidationError::password_policy(violations).into());
        }

        let identity = self.identity.sign_up(email.trim(), password).await?;

        let profile = UserProfile::new_for(&identity, &format_utc_rfc3339((self.clock)()));
        self.db.create_profile(&profile).await.map_err(|e| {
            tracing::error!(uid = %identity.uid, error = %e, "Account created but profile write failed");
            AppError::profile(ProfileOp::Save, e)
        })?;

        tracing::info!(uid = %identity.uid, "Account created");
        Ok(identity)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        required_credentials(email, password)?;
        let identity = self.identity.sign_in(email.trim(), password).await?;
        tracing::info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    pub async fn sign_out(&self) {
        self.identity.sign_out().await;
        tracing::info!("Signed out");
    }

    /// Profile for `identity`; an empty one when nothing is stored yet.
    pub async fn get_profile(&self, identity: &Identity) -> Result<UserProfile, AppError> {
        let stored = self
            .db
            .get_profile(&identity.uid)
            .await
            .map_err(|e| AppError::profile(ProfileOp::Load, e))?;

        Ok(stored.unwrap_or_else(|| {
            let mut profile = UserProfile::new_for(identity, "");
            profile.schema_version = 0;
            profile
        }))
    }

    /// Validate and merge a profile edit. Returns the confirmation text.
    pub async fn save_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> Result<&'static str, AppError> {
        let fields = update.validate()?;
        self.db
            .merge_profile(&identity.uid, &fields)
            .await
            .map_err(|e| AppError::profile(ProfileOp::Save, e))?;

        tracing::info!(uid = %identity.uid, "Profile saved");
        Ok(PROFILE_SAVED_MESSAGE)
    }
}
