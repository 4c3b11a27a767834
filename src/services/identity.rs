// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service port.
//!
//! The identity service (Firebase Authentication in production) owns user
//! identities. This crate only signs users in and out through it and
//! observes its current-user signal via listeners.

use crate::models::Identity;
use async_trait::async_trait;
use axum::http::StatusCode;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Callback invoked with the new identity (or `None` after sign-out).
pub type IdentityListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Authentication failures reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("invalid email")]
    InvalidEmail,
    #[error("too many requests")]
    TooManyRequests,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("weak password")]
    WeakPassword,
    #[error("identity service error: {0}")]
    Other(String),
}

impl AuthError {
    /// Map a Firebase Identity Toolkit error message onto an error kind.
    ///
    /// Messages look like `EMAIL_NOT_FOUND` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_service_code(message: &str) -> Self {
        let code = message.split(':').next().unwrap_or("").trim();
        match code {
            "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
            "INVALID_PASSWORD" => AuthError::WrongPassword,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyRequests,
            "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            _ => AuthError::Other(message.to_string()),
        }
    }

    /// Stable kebab-case code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "user-not-found",
            AuthError::WrongPassword => "wrong-password",
            AuthError::InvalidEmail => "invalid-email",
            AuthError::TooManyRequests => "too-many-requests",
            AuthError::EmailAlreadyInUse => "email-already-in-use",
            AuthError::WeakPassword => "weak-password",
            AuthError::Other(_) => "auth-failed",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "このメールアドレスは登録されていません。",
            AuthError::WrongPassword => "パスワードが間違っています。",
            AuthError::InvalidEmail => "有効なメールアドレスを入力してください。",
            AuthError::TooManyRequests => {
                "ログイン試行回数が多すぎます。しばらく時間をおいてから再試行してください。"
            }
            AuthError::EmailAlreadyInUse => "このメールアドレスは既に使用されています。",
            AuthError::WeakPassword => "パスワードは6文字以上で入力してください。",
            AuthError::Other(_) => "ログインに失敗しました。もう一度お試しください。",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UserNotFound | AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
            AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::EmailAlreadyInUse => StatusCode::CONFLICT,
            AuthError::Other(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// External identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self);

    /// Register a listener. It is called once right away with the current
    /// identity and then on every change until the subscription is dropped.
    fn on_identity_changed(&self, listener: IdentityListener) -> Subscription;

    fn current_identity(&self) -> Option<Identity>;
}

// ─── Listener Registry ───────────────────────────────────────

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    listeners: DashMap<u64, IdentityListener>,
}

/// Listener bookkeeping shared by identity service implementations.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    /// Add a listener and deliver `current()` to it.
    pub fn register(
        &self,
        listener: IdentityListener,
        current: impl FnOnce() -> Option<Identity>,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, listener.clone());
        listener(current());

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Notify every listener of an identity change.
    pub fn emit(&self, identity: Option<Identity>) {
        // Snapshot first so callbacks never run under a map shard lock.
        let listeners: Vec<IdentityListener> = self
            .inner
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for listener in listeners {
            listener(identity.clone());
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.listeners.is_empty()
    }
}

/// Handle for a registered listener. Dropping it unregisters the listener.
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
    released: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unregister the listener now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.remove(&self.id);
            tracing::debug!(subscription = self.id, "Identity listener released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryIdentity - offline identity service
// ─────────────────────────────────────────────────────────────────────────────

use dashmap::mapref::entry::Entry;
use sha2::{Digest, Sha256};

/// Same minimum the hosted service enforces.
const MIN_PASSWORD_LEN: usize = 6;

struct LocalAccount {
    uid: String,
    email: String,
    password_hash: String,
}

/// In-process identity service for local development and tests.
///
/// Accounts live only as long as the process.
#[derive(Default)]
pub struct MemoryIdentity {
    /// Keyed by lowercased email
    accounts: DashMap<String, LocalAccount>,
    current: RwLock<Option<Identity>>,
    listeners: ListenerRegistry,
    next_uid: AtomicU64,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn set_current(&self, identity: Option<Identity>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = identity.clone();
        self.listeners.emit(identity);
    }
}

fn hash_password(uid: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !is_plausible_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let identity = {
            let account = self
                .accounts
                .get(&email.to_lowercase())
                .ok_or(AuthError::UserNotFound)?;
            if account.password_hash != hash_password(&account.uid, password) {
                return Err(AuthError::WrongPassword);
            }
            Identity {
                uid: account.uid.clone(),
                email: account.email.clone(),
            }
        };

        tracing::info!(uid = %identity.uid, "Signed in (offline identity)");
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !is_plausible_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let key = email.to_lowercase();
        let identity = match self.accounts.entry(key) {
            Entry::Occupied(_) => return Err(AuthError::EmailAlreadyInUse),
            Entry::Vacant(slot) => {
                let n = self.next_uid.fetch_add(1, Ordering::Relaxed) + 1;
                let uid = format!("local-{:08}", n);
                slot.insert(LocalAccount {
                    uid: uid.clone(),
                    email: email.to_string(),
                    password_hash: hash_password(&uid, password),
                });
                Identity {
                    uid,
                    email: email.to_string(),
                }
            }
        };

        tracing::info!(uid = %identity.uid, "Account created (offline identity)");
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) {
        self.set_current(None);
    }

    fn on_identity_changed(&self, listener: IdentityListener) -> Subscription {
        self.listeners
            .register(listener, || self.current_identity())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_listener() -> (IdentityListener, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: IdentityListener = Arc::new(move |identity: Option<Identity>| {
            sink.lock().unwrap().push(identity.map(|i| i.uid));
        });
        (listener, seen)
    }

    #[test]
    fn test_service_code_mapping() {
        assert_eq!(AuthError::from_service_code("EMAIL_NOT_FOUND"), AuthError::UserNotFound);
        assert_eq!(AuthError::from_service_code("INVALID_PASSWORD"), AuthError::WrongPassword);
        assert_eq!(AuthError::from_service_code("INVALID_EMAIL"), AuthError::InvalidEmail);
        assert_eq!(
            AuthError::from_service_code("TOO_MANY_ATTEMPTS_TRY_LATER"),
            AuthError::TooManyRequests
        );
        assert_eq!(AuthError::from_service_code("EMAIL_EXISTS"), AuthError::EmailAlreadyInUse);
        assert_eq!(
            AuthError::from_service_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::WeakPassword
        );
        assert_eq!(
            AuthError::from_service_code("INVALID_LOGIN_CREDENTIALS"),
            AuthError::Other("INVALID_LOGIN_CREDENTIALS".to_string())
        );
    }

    #[test]
    fn test_registry_delivers_current_then_changes() {
        let registry = ListenerRegistry::default();
        let (listener, seen) = recording_listener();

        let subscription = registry.register(listener, || None);
        registry.emit(Some(Identity {
            uid: "u1".to_string(),
            email: "a@example.com".to_string(),
        }));
        registry.emit(None);

        assert_eq!(*seen.lock().unwrap(), vec![None, Some("u1".to_string()), None]);
        assert_eq!(registry.len(), 1);

        subscription.unsubscribe();
        assert!(registry.is_empty());

        registry.emit(None);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_subscription_released_on_drop() {
        let registry = ListenerRegistry::default();
        let (listener, _) = recording_listener();
        {
            let _subscription = registry.register(listener, || None);
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_memory_identity_sign_up_and_in() {
        let identity = MemoryIdentity::new();
        let created = identity.sign_up("a@example.com", "abc12345").await.unwrap();
        assert_eq!(identity.current_identity(), Some(created.clone()));

        identity.sign_out().await;
        assert_eq!(identity.current_identity(), None);

        let signed_in = identity.sign_in("A@example.com", "abc12345").await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
    }

    #[tokio::test]
    async fn test_memory_identity_errors() {
        let identity = MemoryIdentity::new();
        identity.sign_up("a@example.com", "abc12345").await.unwrap();

        assert_eq!(
            identity.sign_up("a@example.com", "abc12345").await,
            Err(AuthError::EmailAlreadyInUse)
        );
        assert_eq!(
            identity.sign_up("b@example.com", "abc").await,
            Err(AuthError::WeakPassword)
        );
        assert_eq!(
            identity.sign_in("not-an-email", "abc12345").await,
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            identity.sign_in("c@example.com", "abc12345").await,
            Err(AuthError::UserNotFound)
        );
        assert_eq!(
            identity.sign_in("a@example.com", "wrong").await,
            Err(AuthError::WrongPassword)
        );
    }

    #[tokio::test]
    async fn test_memory_identity_notifies_listeners() {
        let identity = MemoryIdentity::new();
        let (listener, seen) = recording_listener();
        let subscription = identity.on_identity_changed(listener);

        let created = identity.sign_up("a@example.com", "abc12345").await.unwrap();
        identity.sign_out().await;

        assert_eq!(*seen.lock().unwrap(), vec![None, Some(created.uid), None]);
        drop(subscription);
        assert_eq!(identity.listener_count(), 0);
    }
}
