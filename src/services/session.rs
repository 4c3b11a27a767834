// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: the process-wide view of who is signed in.
//!
//! Constructed once at startup and shared through `AppState`. It mirrors the
//! identity service's current-user signal through a single listener and
//! republishes it on a `watch` channel for anything that needs to react.
//! It never writes to the identity service or the document store.

use crate::models::Identity;
use crate::services::identity::{IdentityListener, IdentityService, Subscription};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Snapshot handed to consumers (`GET /api/session`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub identity: Option<Identity>,
    /// True until the identity service has reported for the first time.
    pub is_loading: bool,
}

/// Subscription lifecycle misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session store is already subscribed to the identity service")]
    AlreadySubscribed,
    #[error("session store is not subscribed to the identity service")]
    NotSubscribed,
}

/// Single-writer mirror of the identity service's current user.
pub struct SessionStore {
    state: Arc<watch::Sender<SessionView>>,
    subscription: Mutex<Option<Subscription>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionView {
            identity: None,
            is_loading: true,
        });
        Self {
            state: Arc::new(tx),
            subscription: Mutex::new(None),
        }
    }

    /// Start mirroring `identity`. Exactly one subscription may be active.
    pub fn subscribe(&self, identity: &dyn IdentityService) -> Result<(), SessionError> {
        let mut slot = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(SessionError::AlreadySubscribed);
        }

        let state = self.state.clone();
        let listener: IdentityListener = Arc::new(move |current: Option<Identity>| {
            tracing::debug!(
                uid = current.as_ref().map(|i| i.uid.as_str()),
                "Session identity changed"
            );
            state.send_replace(SessionView {
                identity: current,
                is_loading: false,
            });
        });

        let subscription = identity.on_identity_changed(listener);
        tracing::info!(subscription = subscription.id(), "Session store subscribed");
        *slot = Some(subscription);
        Ok(())
    }

    /// Release the identity listener.
    pub fn unsubscribe(&self) -> Result<(), SessionError> {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SessionError::NotSubscribed)?;

        tracing::info!(subscription = subscription.id(), "Session store unsubscribed");
        subscription.unsubscribe();
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Last identity reported by the identity service. Never blocks.
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn view(&self) -> SessionView {
        self.state.borrow().clone()
    }

    /// Receiver that observes every change after this call.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.state.subscribe()
    }
}
