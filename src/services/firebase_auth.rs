// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication client (Identity Toolkit REST API).
//!
//! Handles:
//! - Email/password sign-in and sign-up
//! - ID token refresh ahead of expiry (emits a token-refresh event)
//! - Sign-out (drops the local session, emits `None`)
//!
//! Set `FIREBASE_AUTH_EMULATOR_HOST` to talk to the Auth emulator.

use crate::models::Identity;
use crate::services::identity::{
    AuthError, IdentityListener, IdentityService, ListenerRegistry, Subscription,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::task::JoinHandle;

/// Margin before ID token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Wait before retrying a refresh that failed for transport reasons.
const REFRESH_RETRY_SECS: u64 = 30;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Active sign-in session.
#[derive(Clone)]
struct AuthSession {
    identity: Identity,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

struct Inner {
    http: reqwest::Client,
    api_key: String,
    identity_base_url: String,
    token_url: String,
    session: RwLock<Option<AuthSession>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    listeners: ListenerRegistry,
}

/// Firebase Authentication client.
#[derive(Clone)]
pub struct FirebaseAuth {
    inner: Arc<Inner>,
}

impl FirebaseAuth {
    /// Create a client for the hosted service, or for the emulator when
    /// `emulator_host` (e.g. `localhost:9099`) is given.
    pub fn new(api_key: String, emulator_host: Option<&str>) -> Self {
        let (identity_base_url, token_url) = match emulator_host {
            Some(host) => {
                tracing::info!(host, "Using Firebase Auth emulator");
                (
                    format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                    format!("http://{}/securetoken.googleapis.com/v1/token", host),
                )
            }
            None => (
                IDENTITY_TOOLKIT_URL.to_string(),
                SECURE_TOKEN_URL.to_string(),
            ),
        };

        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                api_key,
                identity_base_url,
                token_url,
                session: RwLock::new(None),
                refresh_task: Mutex::new(None),
                listeners: ListenerRegistry::default(),
            }),
        }
    }

    /// Current ID token, if signed in.
    pub fn id_token(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.id_token.clone())
    }

    /// POST to an `accounts:*` endpoint with email/password credentials.
    async fn password_request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let url = format!("{}/accounts:{}", self.inner.identity_base_url, endpoint);
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .inner
            .http
            .post(&url)
            .query(&[("key", self.inner.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Other(format!("Request failed: {}", e)))?;

        let parsed: PasswordAuthResponse = check_response_json(response).await?;
        let expires_at = expiry_from_now(&parsed.expires_in, Utc::now())?;

        Ok(AuthSession {
            identity: Identity {
                uid: parsed.local_id,
                email: parsed.email.unwrap_or_else(|| email.to_string()),
            },
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at,
        })
    }

    /// Store a new session, notify listeners and (re)arm the refresh task.
    fn install_session(&self, session: AuthSession) -> Identity {
        let identity = session.identity.clone();
        let expires_at = session.expires_at;
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);

        self.inner.listeners.emit(Some(identity.clone()));

        let task = tokio::spawn(refresh_loop(Arc::downgrade(&self.inner), expires_at));
        if let Some(previous) = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task)
        {
            previous.abort();
        }

        identity
    }
}

impl Inner {
    fn clear_session(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.listeners.emit(None);
    }

    /// Exchange the refresh token for a fresh ID token.
    async fn refresh(&self) -> Result<DateTime<Utc>, RefreshError> {
        let refresh_token = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| RefreshError::Rejected(AuthError::Other("No active session".to_string())))?;

        let response = self
            .http
            .post(&self.token_url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let parsed: TokenRefreshResponse = check_response_json(response)
            .await
            .map_err(RefreshError::Rejected)?;
        let expires_at =
            expiry_from_now(&parsed.expires_in, Utc::now()).map_err(RefreshError::Rejected)?;

        let identity = {
            let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
            let Some(session) = guard.as_mut() else {
                return Err(RefreshError::Rejected(AuthError::Other(
                    "Signed out during refresh".to_string(),
                )));
            };
            if session.identity.uid != parsed.user_id {
                return Err(RefreshError::Rejected(AuthError::Other(
                    "Refreshed token for another user".to_string(),
                )));
            }
            session.id_token = parsed.id_token;
            session.refresh_token = parsed.refresh_token;
            session.expires_at = expires_at;
            session.identity.clone()
        };

        self.listeners.emit(Some(identity));
        Ok(expires_at)
    }
}

enum RefreshError {
    /// Network failure; worth retrying.
    Transport(String),
    /// The service refused the refresh token.
    Rejected(AuthError),
}

/// Keep the ID token fresh until sign-out aborts the task or the client is
/// dropped.
async fn refresh_loop(inner: Weak<Inner>, mut expires_at: DateTime<Utc>) {
    loop {
        tokio::time::sleep(refresh_delay(expires_at, Utc::now())).await;

        let Some(client) = inner.upgrade() else {
            return;
        };

        match client.refresh().await {
            Ok(next) => {
                tracing::debug!(expires_at = %next, "ID token refreshed");
                expires_at = next;
            }
            Err(RefreshError::Transport(reason)) => {
                drop(client);
                tracing::warn!(error = %reason, "ID token refresh failed, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(REFRESH_RETRY_SECS)).await;
            }
            Err(RefreshError::Rejected(e)) => {
                tracing::warn!(error = %e, "ID token refresh rejected, signing out");
                client.clear_session();
                return;
            }
        }
    }
}

/// How long to sleep before refreshing a token that expires at `expires_at`.
fn refresh_delay(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    let refresh_at = expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
    (refresh_at - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

/// `expiresIn` is a string of seconds, e.g. `"3600"`.
fn expiry_from_now(expires_in: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
    let secs: i64 = expires_in
        .trim()
        .parse()
        .map_err(|_| AuthError::Other(format!("Invalid expiresIn: {}", expires_in)))?;
    Ok(now + Duration::seconds(secs))
}

/// Check response status and parse JSON body, mapping service error codes.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AuthError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Identity service rate limit hit (429)");
            return Err(AuthError::TooManyRequests);
        }

        return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => AuthError::from_service_code(&envelope.error.message),
            Err(_) => AuthError::Other(format!("HTTP {}: {}", status, body)),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::Other(format!("JSON parse error: {}", e)))
}

#[async_trait]
impl IdentityService for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let session = self
            .password_request("signInWithPassword", email, password)
            .await?;
        let identity = self.install_session(session);
        tracing::info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let session = self.password_request("signUp", email, password).await?;
        let identity = self.install_session(session);
        tracing::info!(uid = %identity.uid, "Account created");
        Ok(identity)
    }

    async fn sign_out(&self) {
        if let Some(task) = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.inner.clear_session();
        tracing::info!("Signed out");
    }

    fn on_identity_changed(&self, listener: IdentityListener) -> Subscription {
        self.inner
            .listeners
            .register(listener, || self.current_identity())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.identity.clone())
    }
}

/// Response of `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// Response of the secure token endpoint.
#[derive(Debug, Clone, Deserialize)]
struct TokenRefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
