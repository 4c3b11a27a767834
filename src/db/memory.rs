// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Mirrors the Firestore semantics the services rely on (generated ids,
//! set-with-id upserts, array-union set-add, equality queries) so the app
//! can run offline and tests can inspect every write.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{CircleDocument, MembershipEntry, ProfileFields, UserProfile, ValidCircle};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, UserProfile>,
    circles: DashMap<String, CircleDocument>,
    /// circle id → (uid → entry)
    members: DashMap<String, DashMap<String, MembershipEntry>>,
    next_circle_id: AtomicU64,
    /// Operation names that fail with a database error (for tests).
    failing: DashSet<&'static str>,
    /// Count of write operations that reached the store.
    writes: AtomicU64,
    /// Count of all operations that reached the store.
    calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `operation` fail (e.g. `"set_member"`).
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.insert(operation);
    }

    /// Undo `fail_on`.
    pub fn recover(&self, operation: &'static str) {
        self.failing.remove(operation);
    }

    /// Number of operations (reads and writes) the store has served.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn circle_count(&self) -> usize {
        self.circles.len()
    }

    /// Insert a circle under a chosen id, bypassing id generation.
    pub fn seed_circle(&self, circle_id: &str, circle: CircleDocument) {
        let mut circle = circle;
        circle.id = circle_id.to_string();
        self.circles.insert(circle_id.to_string(), circle);
    }

    fn enter(&self, operation: &'static str, write: bool) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(operation) {
            return Err(AppError::Database(format!(
                "{} unavailable (injected failure)",
                operation
            )));
        }
        if write {
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.enter("get_profile", false)?;
        Ok(self.users.get(uid).map(|p| p.value().clone()))
    }

    async fn create_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.enter("create_profile", true)?;
        self.users.insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn merge_profile(&self, uid: &str, fields: &ProfileFields) -> Result<(), AppError> {
        self.enter("merge_profile", true)?;
        let mut entry = self.users.entry(uid.to_string()).or_insert_with(|| UserProfile {
            uid: uid.to_string(),
            ..serde_default_profile()
        });
        entry.apply(fields);
        Ok(())
    }

    async fn add_joined_circle(&self, uid: &str, circle_id: &str) -> Result<(), AppError> {
        self.enter("add_joined_circle", true)?;
        let mut entry = self.users.entry(uid.to_string()).or_insert_with(|| UserProfile {
            uid: uid.to_string(),
            ..serde_default_profile()
        });
        if !entry.joined_circle_ids.iter().any(|id| id == circle_id) {
            entry.joined_circle_ids.push(circle_id.to_string());
        }
        Ok(())
    }

    async fn get_circle(&self, circle_id: &str) -> Result<Option<CircleDocument>, AppError> {
        self.enter("get_circle", false)?;
        Ok(self.circles.get(circle_id).map(|c| c.value().clone()))
    }

    async fn find_circles_by_leader(&self, uid: &str) -> Result<Vec<CircleDocument>, AppError> {
        self.enter("find_circles_by_leader", false)?;
        Ok(self
            .circles
            .iter()
            .filter(|c| c.leader_id == uid)
            .map(|c| c.value().clone())
            .collect())
    }

    async fn insert_circle(&self, circle: &CircleDocument) -> Result<String, AppError> {
        self.enter("insert_circle", true)?;
        let n = self.next_circle_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("circle-{:06}", n);
        let mut stored = circle.clone();
        stored.id = id.clone();
        self.circles.insert(id.clone(), stored);
        Ok(id)
    }

    async fn update_circle(
        &self,
        circle_id: &str,
        circle: &ValidCircle,
        updated_at: &str,
    ) -> Result<(), AppError> {
        self.enter("update_circle", true)?;
        // Edits never create a circle.
        let mut stored = self
            .circles
            .get_mut(circle_id)
            .ok_or_else(|| AppError::Database(format!("circle {} does not exist", circle_id)))?;
        stored.apply_edit(circle, updated_at);
        Ok(())
    }

    async fn set_member(
        &self,
        circle_id: &str,
        uid: &str,
        entry: &MembershipEntry,
    ) -> Result<(), AppError> {
        self.enter("set_member", true)?;
        let mut stored = entry.clone();
        stored.uid = uid.to_string();
        self.members
            .entry(circle_id.to_string())
            .or_default()
            .insert(uid.to_string(), stored);
        Ok(())
    }

    async fn list_members(&self, circle_id: &str) -> Result<Vec<MembershipEntry>, AppError> {
        self.enter("list_members", false)?;
        Ok(self
            .members
            .get(circle_id)
            .map(|roster| roster.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default())
    }
}

/// Profile as Firestore would read back an empty document.
fn serde_default_profile() -> UserProfile {
    UserProfile {
        uid: String::new(),
        email: String::new(),
        name: String::new(),
        university: String::new(),
        grade: String::new(),
        gender: String::new(),
        birthday: String::new(),
        profile_image_url: String::new(),
        is_university_public: true,
        is_grade_public: true,
        joined_circle_ids: Vec::new(),
        favorite_circle_ids: Vec::new(),
        created_at: String::new(),
        schema_version: 0,
    }
}
