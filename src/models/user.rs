//! User identity and profile models.

use crate::error::ValidationError;
use crate::models::vocabulary::{Gender, Grade};
use crate::models::CURRENT_SCHEMA_VERSION;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Authenticated user handle issued by the identity service.
///
/// Only the identity service creates these; the rest of the crate treats them
/// as read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique user id (Firebase `localId`).
    pub uid: String,
    pub email: String,
}

/// User profile stored in Firestore at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Document ID (not stored as a field)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub uid: String,
    #[serde(default)]
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub gender: String,
    /// Birth date as `YYYY-MM-DD`
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default = "default_visible")]
    pub is_university_public: bool,
    #[serde(default = "default_visible")]
    pub is_grade_public: bool,
    /// Circles the user belongs to (set semantics, never duplicated)
    #[serde(default)]
    pub joined_circle_ids: Vec<String>,
    #[serde(default)]
    pub favorite_circle_ids: Vec<String>,
    /// When the account was created (ISO 8601)
    #[serde(default)]
    pub created_at: String,
    /// 0 for documents written before versioning existed
    #[serde(default)]
    pub schema_version: u32,
}

fn default_visible() -> bool {
    true
}

impl UserProfile {
    /// Empty profile written right after sign-up.
    pub fn new_for(identity: &Identity, created_at: &str) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
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
            created_at: created_at.to_string(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Apply a validated profile edit in memory (same merge the store does).
    pub fn apply(&mut self, update: &ProfileFields) {
        self.name = update.name.clone();
        self.university = update.university.clone();
        self.grade = update.grade.to_string();
        self.gender = update.gender.to_string();
        self.birthday = update.birthday.format("%Y-%m-%d").to_string();
        self.is_university_public = true;
        self.is_grade_public = true;
        self.schema_version = CURRENT_SCHEMA_VERSION;
    }
}

/// Profile edit form as submitted by the frontend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub gender: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub birthday: String,
}

/// A profile edit that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFields {
    pub name: String,
    pub university: String,
    pub grade: Grade,
    pub gender: Gender,
    pub birthday: NaiveDate,
}

impl ProfileUpdate {
    /// Check that every profile field is present and well-formed.
    pub fn validate(&self) -> Result<ProfileFields, ValidationError> {
        let mut missing = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            missing.push("name");
        }
        let university = self.university.trim();
        if university.is_empty() {
            missing.push("university");
        }
        let grade = self.grade.parse::<Grade>().ok();
        if grade.is_none() {
            missing.push("grade");
        }
        let gender = self.gender.parse::<Gender>().ok();
        if gender.is_none() {
            missing.push("gender");
        }
        let birthday = NaiveDate::parse_from_str(self.birthday.trim(), "%Y-%m-%d").ok();
        if birthday.is_none() {
            missing.push("birthday");
        }

        match (grade, gender, birthday) {
            (Some(grade), Some(gender), Some(birthday)) if missing.is_empty() => {
                Ok(ProfileFields {
                    name: name.to_string(),
                    university: university.to_string(),
                    grade,
                    gender,
                    birthday,
                })
            }
            _ => Err(ValidationError::profile(missing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_update() -> ProfileUpdate {
        ProfileUpdate {
            name: "山田 太郎".to_string(),
            university: "Test Univ".to_string(),
            grade: "大学2年".to_string(),
            gender: "回答しない".to_string(),
            birthday: "2004-04-01".to_string(),
        }
    }

    #[test]
    fn test_new_profile_defaults() {
        let identity = Identity {
            uid: "u1".to_string(),
            email: "a@example.com".to_string(),
        };
        let profile = UserProfile::new_for(&identity, "2026-04-01T00:00:00Z");

        assert_eq!(profile.uid, "u1");
        assert_eq!(profile.email, "a@example.com");
        assert!(profile.name.is_empty());
        assert!(profile.joined_circle_ids.is_empty());
        assert!(profile.favorite_circle_ids.is_empty());
        assert!(profile.is_university_public);
        assert!(profile.is_grade_public);
        assert_eq!(profile.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_profile_update_valid() {
        let fields = complete_update().validate().expect("should validate");
        assert_eq!(fields.grade, Grade::Undergrad2);
        assert_eq!(fields.gender, Gender::NoAnswer);
        assert_eq!(fields.birthday, NaiveDate::from_ymd_opt(2004, 4, 1).unwrap());
    }

    #[test]
    fn test_profile_update_blank_name_rejected() {
        let update = ProfileUpdate {
            name: "   ".to_string(),
            ..complete_update()
        };
        let err = update.validate().unwrap_err();
        assert_eq!(err.missing, vec!["name"]);
    }

    #[test]
    fn test_profile_update_bad_date_and_grade() {
        let update = ProfileUpdate {
            grade: "高校3年".to_string(),
            birthday: "2004-02-30".to_string(),
            ..complete_update()
        };
        let err = update.validate().unwrap_err();
        assert_eq!(err.missing, vec!["grade", "birthday"]);
    }

    #[test]
    fn test_legacy_document_defaults() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "email": "old@example.com",
            "name": "Old"
        }))
        .unwrap();

        assert_eq!(profile.schema_version, 0);
        assert!(profile.is_grade_public);
        assert!(profile.joined_circle_ids.is_empty());
    }

    #[test]
    fn test_uid_not_serialized() {
        let identity = Identity {
            uid: "u1".to_string(),
            email: "a@example.com".to_string(),
        };
        let value = serde_json::to_value(UserProfile::new_for(&identity, "now")).unwrap();
        assert!(value.get("uid").is_none());
        assert_eq!(value["joinedCircleIds"], serde_json::json!([]));
    }
}
