// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, joined-circle back-references)
//! - Circles (club records, queried by leader)
//! - Members (per-circle roster sub-collection)

use crate::db::{collections, DocumentStore};
use crate::error::AppError;
use crate::models::circle::CIRCLE_EDIT_FIELDS;
use crate::models::{
    CircleDocument, MembershipEntry, ProfileFields, UserProfile, ValidCircle,
    CURRENT_SCHEMA_VERSION,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fields written by a profile edit.
const PROFILE_EDIT_FIELDS: &[&str] = &[
    "name",
    "university",
    "grade",
    "gender",
    "birthday",
    "isUniversityPublic",
    "isGradePublic",
    "schemaVersion",
];

/// Partial profile document for field-masked merges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileMerge {
    name: String,
    university: String,
    grade: String,
    gender: String,
    birthday: String,
    is_university_public: bool,
    is_grade_public: bool,
    schema_version: u32,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any token; skip the credential lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let profile: Option<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(profile.map(|mut p| {
            p.uid = uid.to_string();
            p
        }))
    }

    async fn create_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn merge_profile(&self, uid: &str, fields: &ProfileFields) -> Result<(), AppError> {
        let merge = ProfileMerge {
            name: fields.name.clone(),
            university: fields.university.clone(),
            grade: fields.grade.to_string(),
            gender: fields.gender.to_string(),
            birthday: fields.birthday.format("%Y-%m-%d").to_string(),
            is_university_public: true,
            is_grade_public: true,
            schema_version: CURRENT_SCHEMA_VERSION,
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(PROFILE_EDIT_FIELDS.iter().copied())
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&merge)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn add_joined_circle(&self, uid: &str, circle_id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;

        // Array-union transforms are only exposed on batched/transactional
        // writes, so this single write goes through a transaction.
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .transforms(|t| {
                t.fields([t
                    .field("joinedCircleIds")
                    .append_missing_elements([circle_id.to_string()])])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add array union to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    // ─── Circle Operations ───────────────────────────────────────

    async fn get_circle(&self, circle_id: &str) -> Result<Option<CircleDocument>, AppError> {
        let circle: Option<CircleDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CIRCLES)
            .obj()
            .one(circle_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(circle.map(|mut c| {
            c.id = circle_id.to_string();
            c
        }))
    }

    async fn find_circles_by_leader(&self, uid: &str) -> Result<Vec<CircleDocument>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CIRCLES)
            .filter(move |q| q.for_all([q.field("leaderId").eq(uid.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_circle(&self, circle: &CircleDocument) -> Result<String, AppError> {
        let created: CircleDocument = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::CIRCLES)
            .generate_document_id()
            .object(circle)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if created.id.is_empty() {
            return Err(AppError::Database(
                "Firestore did not return the generated circle id".to_string(),
            ));
        }
        Ok(created.id)
    }

    async fn update_circle(
        &self,
        circle_id: &str,
        circle: &ValidCircle,
        updated_at: &str,
    ) -> Result<(), AppError> {
        // Only the edit fields are written; leaderId and createdAt are
        // outside the mask and stay untouched.
        let mut doc = CircleDocument::new(circle, "", "");
        doc.apply_edit(circle, updated_at);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(CIRCLE_EDIT_FIELDS.iter().copied())
            .in_col(collections::CIRCLES)
            .document_id(circle_id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Membership Operations ───────────────────────────────────

    async fn set_member(
        &self,
        circle_id: &str,
        uid: &str,
        entry: &MembershipEntry,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::CIRCLES, circle_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let _: () = client
            .fluent()
            .update()
            .in_col(collections::MEMBERS)
            .document_id(uid)
            .parent(&parent_path)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_members(&self, circle_id: &str) -> Result<Vec<MembershipEntry>, AppError> {
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::CIRCLES, circle_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        client
            .fluent()
            .select()
            .from(collections::MEMBERS)
            .parent(&parent_path)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
