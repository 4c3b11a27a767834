// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Kurukatsu: pre-registration core for the university club app
//!
//! This crate tracks who is signed in and reconciles a leader's club
//! registration form with the club records in Firestore, exposed to the
//! frontend as a local JSON API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{AccountService, CircleService, IdentityService, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityService>,
    pub session: SessionStore,
    pub circles: CircleService,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire the services over the given backends.
    ///
    /// The session store starts unsubscribed; call
    /// `session.subscribe(identity)` once the state is built.
    pub fn new(
        config: Config,
        db: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            circles: CircleService::new(db.clone()),
            accounts: AccountService::new(identity.clone(), db),
            session: SessionStore::new(),
            config,
            identity,
        }
    }
}
