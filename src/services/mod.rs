// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod circle;
pub mod firebase_auth;
pub mod identity;
pub mod session;

pub use account::AccountService;
pub use circle::{CircleForm, CircleService, FormPhase};
pub use firebase_auth::FirebaseAuth;
pub use identity::{AuthError, IdentityService, MemoryIdentity, Subscription};
pub use session::{SessionStore, SessionView};
