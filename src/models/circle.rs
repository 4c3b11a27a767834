// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Circle (club) models: the editable draft, its validated form, and the
//! documents stored in Firestore.

use crate::error::ValidationError;
use crate::models::user::{Identity, UserProfile};
use crate::models::vocabulary::{
    CircleType, Feature, Frequency, GenderRatio, Genre, MemberCount, Weekday,
};
use crate::models::CURRENT_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Circle registration form as edited in the frontend.
///
/// Enumerated fields stay raw strings here; `validate()` turns them into
/// vocabulary types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub university_name: String,
    /// Representative display name
    #[serde(default)]
    pub leader_name: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub activity_days: Vec<String>,
    #[serde(default)]
    pub members: String,
    #[serde(default, rename = "genderratio")]
    pub gender_ratio: String,
    #[serde(default)]
    pub circle_type: String,
    #[serde(default)]
    pub is_recruiting: bool,
}

/// A draft that satisfied the required-field contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCircle {
    pub name: String,
    pub university_name: String,
    pub leader_name: String,
    pub contact_info: String,
    pub genre: Genre,
    pub features: Vec<Feature>,
    pub frequency: Frequency,
    pub activity_days: Vec<Weekday>,
    pub members: MemberCount,
    pub gender_ratio: GenderRatio,
    pub circle_type: CircleType,
    pub is_recruiting: bool,
}

fn required_text<'a>(value: &'a str, field: &'static str, missing: &mut Vec<&'static str>) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        missing.push(field);
    }
    trimmed
}

fn required_label<T: FromStr>(value: &str, field: &'static str, missing: &mut Vec<&'static str>) -> Option<T> {
    let parsed = value.parse::<T>().ok();
    if parsed.is_none() {
        missing.push(field);
    }
    parsed
}

/// Parse a multi-select into a de-duplicated list, keeping first-seen order.
fn label_set<T: FromStr + PartialEq>(values: &[String]) -> Option<Vec<T>> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        let parsed = value.parse::<T>().ok()?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    Some(out)
}

impl CircleDraft {
    /// Check the required-field contract.
    ///
    /// Every violation is collected; the error carries the full list but
    /// presents a single generic message to the user.
    pub fn validate(&self) -> Result<ValidCircle, ValidationError> {
        let mut missing = Vec::new();

        let name = required_text(&self.name, "name", &mut missing);
        let university_name = required_text(&self.university_name, "universityName", &mut missing);
        let leader_name = required_text(&self.leader_name, "leaderName", &mut missing);
        let contact_info = required_text(&self.contact_info, "contactInfo", &mut missing);
        let genre = required_label::<Genre>(&self.genre, "genre", &mut missing);

        let features = label_set::<Feature>(&self.features).filter(|f| !f.is_empty());
        if features.is_none() {
            missing.push("features");
        }

        let frequency = required_label::<Frequency>(&self.frequency, "frequency", &mut missing);
        let members = required_label::<MemberCount>(&self.members, "members", &mut missing);
        let gender_ratio =
            required_label::<GenderRatio>(&self.gender_ratio, "genderratio", &mut missing);

        // Optional fields: only unknown labels are rejected.
        let mut invalid = Vec::new();
        let activity_days = label_set::<Weekday>(&self.activity_days);
        if activity_days.is_none() {
            invalid.push("activityDays");
        }
        let circle_type = if self.circle_type.trim().is_empty() {
            Some(CircleType::default())
        } else {
            self.circle_type.parse::<CircleType>().ok()
        };
        if circle_type.is_none() {
            invalid.push("circleType");
        }

        match (
            genre,
            features,
            frequency,
            members,
            gender_ratio,
            activity_days,
            circle_type,
        ) {
            (
                Some(genre),
                Some(features),
                Some(frequency),
                Some(members),
                Some(gender_ratio),
                Some(activity_days),
                Some(circle_type),
            ) if missing.is_empty() => Ok(ValidCircle {
                name: name.to_string(),
                university_name: university_name.to_string(),
                leader_name: leader_name.to_string(),
                contact_info: contact_info.to_string(),
                genre,
                features,
                frequency,
                activity_days,
                members,
                gender_ratio,
                circle_type,
                is_recruiting: self.is_recruiting,
            }),
            _ => Err(ValidationError::circle(missing).with_invalid(invalid)),
        }
    }

    /// Starting draft for a leader who has no circle yet.
    ///
    /// University and representative name come from the profile; contact
    /// info defaults to the sign-in email.
    pub fn seed_for_new(identity: &Identity, profile: Option<&UserProfile>) -> Self {
        Self {
            university_name: profile.map(|p| p.university.clone()).unwrap_or_default(),
            leader_name: profile.map(|p| p.name.clone()).unwrap_or_default(),
            contact_info: identity.email.clone(),
            circle_type: CircleType::default().to_string(),
            ..Self::default()
        }
    }

    /// Draft pre-filled from a stored circle.
    ///
    /// Fields that are blank on the stored record (older documents) fall
    /// back to `fallback`.
    pub fn from_document(doc: &CircleDocument, fallback: &CircleDraft) -> Self {
        fn or_fallback(value: &str, fallback: &str) -> String {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            name: doc.name.clone(),
            university_name: or_fallback(&doc.university_name, &fallback.university_name),
            leader_name: or_fallback(&doc.leader_name, &fallback.leader_name),
            contact_info: or_fallback(&doc.contact_info, &fallback.contact_info),
            genre: doc.genre.clone(),
            features: doc.features.clone(),
            frequency: doc.frequency.clone(),
            activity_days: doc.activity_days.clone(),
            members: doc.members.clone(),
            gender_ratio: doc.gender_ratio.clone(),
            circle_type: or_fallback(&doc.circle_type, CircleType::default().as_str()),
            is_recruiting: doc.welcome.is_recruiting,
        }
    }
}

/// Recruiting status block (nested as `welcome` in the stored document).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    #[serde(default)]
    pub is_recruiting: bool,
}

/// Circle document stored in Firestore at `circles/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDocument {
    /// Store-generated document ID (not stored as a field)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub university_name: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub activity_days: Vec<String>,
    #[serde(default, rename = "genderratio")]
    pub gender_ratio: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub members: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub circle_type: String,
    #[serde(default)]
    pub welcome: Welcome,
    /// UID of the creating leader; never changes after creation
    #[serde(default)]
    pub leader_id: String,
    #[serde(default)]
    pub leader_name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub schema_version: u32,
}

/// Fields overwritten by an edit. `leaderId` and `createdAt` are excluded.
pub const CIRCLE_EDIT_FIELDS: &[&str] = &[
    "name",
    "universityName",
    "features",
    "frequency",
    "activityDays",
    "genderratio",
    "genre",
    "members",
    "contactInfo",
    "circleType",
    "welcome",
    "leaderName",
    "updatedAt",
    "schemaVersion",
];

impl CircleDocument {
    /// New document for a freshly created circle (ID assigned by the store).
    pub fn new(circle: &ValidCircle, leader_id: &str, created_at: &str) -> Self {
        let mut doc = Self {
            id: String::new(),
            name: String::new(),
            university_name: String::new(),
            features: Vec::new(),
            frequency: String::new(),
            activity_days: Vec::new(),
            gender_ratio: String::new(),
            genre: String::new(),
            members: String::new(),
            contact_info: String::new(),
            circle_type: String::new(),
            welcome: Welcome::default(),
            leader_id: leader_id.to_string(),
            leader_name: String::new(),
            created_at: created_at.to_string(),
            updated_at: None,
            schema_version: CURRENT_SCHEMA_VERSION,
        };
        doc.set_content(circle);
        doc
    }

    /// Overwrite the editable fields and stamp the update time.
    pub fn apply_edit(&mut self, circle: &ValidCircle, updated_at: &str) {
        self.set_content(circle);
        self.updated_at = Some(updated_at.to_string());
        self.schema_version = CURRENT_SCHEMA_VERSION;
    }

    fn set_content(&mut self, circle: &ValidCircle) {
        self.name = circle.name.clone();
        self.university_name = circle.university_name.clone();
        self.features = circle.features.iter().map(|f| f.to_string()).collect();
        self.frequency = circle.frequency.to_string();
        self.activity_days = circle.activity_days.iter().map(|d| d.to_string()).collect();
        self.gender_ratio = circle.gender_ratio.to_string();
        self.genre = circle.genre.to_string();
        self.members = circle.members.to_string();
        self.contact_info = circle.contact_info.clone();
        self.circle_type = circle.circle_type.to_string();
        self.welcome = Welcome {
            is_recruiting: circle.is_recruiting,
        };
        self.leader_name = circle.leader_name.clone();
    }
}

/// Role of a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Leader,
    Member,
}

/// Roster row stored at `circles/{circle_id}/members/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipEntry {
    /// Member UID (document ID, not stored as a field)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub uid: String,
    pub joined_at: String,
    pub role: MemberRole,
}

/// Which write path a submission takes, decided by ownership detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DraftMode {
    /// No signed-in user; every write is refused.
    NoIdentity,
    /// The user leads no circle yet.
    Create,
    /// The user already leads `circle_id`.
    Edit { circle_id: String },
}

impl DraftMode {
    pub fn label(&self) -> &'static str {
        match self {
            DraftMode::NoIdentity => "no_identity",
            DraftMode::Create => "create",
            DraftMode::Edit { .. } => "edit",
        }
    }
}

/// Result of `load_ownership_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipState {
    #[serde(flatten)]
    pub mode: DraftMode,
    pub draft_seed: CircleDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    Created,
    Updated,
}

/// Successful submission, for the confirmation screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub outcome: CommitOutcome,
    pub circle_id: String,
    pub message: String,
}

impl Confirmation {
    pub const CREATED_MESSAGE: &'static str = "サークル情報が正常に登録されました。";
    pub const UPDATED_MESSAGE: &'static str = "サークル情報が正常に更新されました。";

    pub fn created(circle_id: String) -> Self {
        Self {
            outcome: CommitOutcome::Created,
            circle_id,
            message: Self::CREATED_MESSAGE.to_string(),
        }
    }

    pub fn updated(circle_id: String) -> Self {
        Self {
            outcome: CommitOutcome::Updated,
            circle_id,
            message: Self::UPDATED_MESSAGE.to_string(),
        }
    }
}
