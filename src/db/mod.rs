// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).
//!
//! `DocumentStore` is the seam between the services and the document store.
//! `FirestoreDb` talks to Firestore (or its emulator); `MemoryStore` keeps
//! everything in process for offline runs and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{CircleDocument, MembershipEntry, ProfileFields, UserProfile, ValidCircle};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by uid)
    pub const USERS: &str = "users";
    /// Circles (store-generated ids)
    pub const CIRCLES: &str = "circles";
    /// Roster sub-collection under each circle (keyed by uid)
    pub const MEMBERS: &str = "members";
}

/// Typed operations over the document store.
///
/// Every failure is reported as `AppError::Database`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    /// Write a whole profile at `users/{profile.uid}` (set with explicit id).
    async fn create_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    /// Merge a profile edit into `users/{uid}`, creating it if absent.
    async fn merge_profile(&self, uid: &str, fields: &ProfileFields) -> Result<(), AppError>;

    /// Add `circle_id` to `joinedCircleIds` unless already present.
    async fn add_joined_circle(&self, uid: &str, circle_id: &str) -> Result<(), AppError>;

    // ─── Circle Operations ───────────────────────────────────────

    async fn get_circle(&self, circle_id: &str) -> Result<Option<CircleDocument>, AppError>;

    /// All circles whose `leaderId` equals `uid`.
    async fn find_circles_by_leader(&self, uid: &str) -> Result<Vec<CircleDocument>, AppError>;

    /// Insert a circle under a store-generated id and return that id.
    async fn insert_circle(&self, circle: &CircleDocument) -> Result<String, AppError>;

    /// Overwrite the editable fields of an existing circle.
    async fn update_circle(
        &self,
        circle_id: &str,
        circle: &ValidCircle,
        updated_at: &str,
    ) -> Result<(), AppError>;

    // ─── Membership Operations ───────────────────────────────────

    /// Write `circles/{circle_id}/members/{uid}` (set with explicit id).
    async fn set_member(
        &self,
        circle_id: &str,
        uid: &str,
        entry: &MembershipEntry,
    ) -> Result<(), AppError>;

    async fn list_members(&self, circle_id: &str) -> Result<Vec<MembershipEntry>, AppError>;
}
