//! User document schema
//!
//! Stores profile fields, the Argon2 password hash, the set of enrolled
//! packages and the learner's completion counter.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{default_true, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Aggregate learning counters on a user
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProgress {
    #[serde(default)]
    pub total_courses_completed: i64,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Normalized (trimmed, lower-case) email, unique
    pub email: String,

    /// External identity provider id, unique when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,

    #[serde(default = "default_user_type")]
    pub user_type: String,

    /// Argon2 password hash; absent for externally authenticated users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Package ids, kept as a set
    #[serde(default)]
    pub enrolled_packages: Vec<String>,

    #[serde(default)]
    pub progress: LearnerProgress,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub metadata: Metadata,
}

fn default_user_type() -> String {
    "learner".to_string()
}

impl UserDoc {
    /// Create a new user document
    pub fn new(email: String) -> Self {
        Self {
            _id: None,
            email,
            firebase_uid: None,
            name: String::new(),
            phone: None,
            age_group: None,
            user_type: default_user_type(),
            password_hash: None,
            enrolled_packages: Vec::new(),
            progress: LearnerProgress::default(),
            is_active: true,
            metadata: Metadata::new(),
        }
    }

    /// Hex form of the store-assigned id
    pub fn id_hex(&self) -> Option<String> {
        self._id.map(|id| id.to_hex())
    }

    pub fn is_enrolled_in(&self, package_id: &str) -> bool {
        self.enrolled_packages.iter().any(|p| p == package_id)
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Sparse so users without an external identity don't collide
            (
                doc! { "firebaseUid": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("firebase_uid_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// User as returned to clients. Never carries the password hash.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    pub user_type: String,
    pub enrolled_packages: Vec<String>,
    pub progress: LearnerProgress,
    pub is_active: bool,
    pub metadata: Metadata,
}

impl From<&UserDoc> for PublicUser {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex().unwrap_or_default(),
            email: user.email.clone(),
            firebase_uid: user.firebase_uid.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            age_group: user.age_group.clone(),
            user_type: user.user_type.clone(),
            enrolled_packages: user.enrolled_packages.clone(),
            progress: user.progress.clone(),
            is_active: user.is_active,
            metadata: user.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_hides_password_hash() {
        let mut user = UserDoc::new("ana@example.com".into());
        user._id = Some(ObjectId::new());
        user.password_hash = Some("$argon2id$v=19$secret".into());

        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["_id"].as_str().unwrap().len(), 24);
        assert_eq!(json["email"], "ana@example.com");
    }

    #[test]
    fn test_stored_fields_are_camel_case() {
        let mut user = UserDoc::new("ana@example.com".into());
        user.enrolled_packages.push("starter".into());
        user.progress.total_courses_completed = 3;

        let doc = bson::to_document(&user).unwrap();
        assert!(doc.contains_key("enrolledPackages"));
        assert_eq!(
            doc.get_document("progress")
                .unwrap()
                .get_i64("totalCoursesCompleted")
                .unwrap(),
            3
        );
        assert!(!doc.contains_key("_id"));
    }
}
