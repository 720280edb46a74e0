//! Account service: registration, login, profile upsert and lookup
//!
//! Emails are normalized before every write and lookup. Profile upserts go
//! through a typed whitelist so enrollment, counters and credentials can
//! never be written from a client body.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::db::schemas::{PublicUser, UserDoc};
use crate::store::{AccountStore, Store};
use crate::types::{PlatformError, Result};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Profile fields a client may set through `POST /users`.
///
/// Anything not listed here is ignored on deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpsert {
    #[serde(default)]
    pub firebase_uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}

impl ProfileUpsert {
    /// Merge whitelisted fields into an existing user
    fn merge_into(&self, user: &mut UserDoc) {
        if let Some(ref name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(ref phone) = self.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(ref age_group) = self.age_group {
            user.age_group = Some(age_group.clone());
        }
        if let Some(ref user_type) = self.user_type {
            user.user_type = user_type.clone();
        }
        if user.firebase_uid.is_none() {
            user.firebase_uid = self.firebase_uid.clone();
        }
    }
}

// =============================================================================
// Email
// =============================================================================

/// Trim and lower-case an email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn required_email(email: Option<&str>) -> Result<String> {
    let email = email
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| PlatformError::Validation("Email is required".into()))?;
    if !is_valid_email(&email) {
        return Err(PlatformError::Validation("Invalid email address".into()));
    }
    Ok(email)
}

// =============================================================================
// Service
// =============================================================================

/// Account operations over a shared store handle
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a password account
    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser> {
        let email = required_email(request.email.as_deref())?;
        let password = request.password.unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PlatformError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(PlatformError::Conflict(
                "User already exists with this email".into(),
            ));
        }

        let mut user = UserDoc::new(email);
        user.name = request.name.unwrap_or_default().trim().to_string();
        user.phone = request.phone;
        user.age_group = request.age_group;
        if let Some(user_type) = request.user_type {
            user.user_type = user_type;
        }
        user.password_hash = Some(hash_password(&password)?);

        // A concurrent registration can still lose on the unique index
        let user = self.store.insert_user(user).await.map_err(|e| match e {
            PlatformError::Conflict(_) => {
                PlatformError::Conflict("User already exists with this email".into())
            }
            other => other,
        })?;

        info!(user_id = ?user.id_hex(), "user registered");
        Ok(PublicUser::from(&user))
    }

    /// Check credentials. Every failure reads the same to the client.
    pub async fn login(&self, request: LoginRequest) -> Result<PublicUser> {
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(PlatformError::Validation(
                "Email and password are required".into(),
            ));
        };
        let email = normalize_email(&email);
        if email.is_empty() || password.is_empty() {
            return Err(PlatformError::Validation(
                "Email and password are required".into(),
            ));
        }

        let unauthorized = || PlatformError::Unauthorized(INVALID_CREDENTIALS.into());

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(unauthorized)?;
        let hash = user.password_hash.as_deref().ok_or_else(unauthorized)?;

        if !verify_password(&password, hash)? {
            debug!(user_id = ?user.id_hex(), "password mismatch");
            return Err(unauthorized());
        }

        Ok(PublicUser::from(&user))
    }

    /// Create or merge a profile, keyed by external id, else by email.
    ///
    /// Returns the user and whether it was created.
    pub async fn upsert(&self, request: ProfileUpsert) -> Result<(PublicUser, bool)> {
        let firebase_uid = request
            .firebase_uid
            .as_deref()
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(str::to_string);
        let email = request
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());

        let mut existing = None;
        if let Some(ref uid) = firebase_uid {
            existing = self.store.find_user_by_firebase_uid(uid).await?;
        }
        if existing.is_none() {
            if let Some(ref email) = email {
                existing = self.store.find_user_by_email(email).await?;
            }
        }

        let request = ProfileUpsert {
            firebase_uid,
            email,
            ..request
        };

        match existing {
            Some(mut user) => {
                request.merge_into(&mut user);
                let user = self
                    .store
                    .save_profile(&user)
                    .await?
                    .ok_or_else(|| PlatformError::NotFound("User not found".into()))?;
                Ok((PublicUser::from(&user), false))
            }
            None => {
                let email = required_email(request.email.as_deref())?;
                let mut user = UserDoc::new(email);
                request.merge_into(&mut user);
                let user = self.store.insert_user(user).await?;
                info!(user_id = ?user.id_hex(), "user created from profile");
                Ok((PublicUser::from(&user), true))
            }
        }
    }

    pub async fn get(&self, user_id: &str) -> Result<PublicUser> {
        self.store
            .get_user(user_id)
            .await?
            .map(|user| PublicUser::from(&user))
            .ok_or_else(|| PlatformError::NotFound("User not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@localhost"));
        assert!(!is_valid_email("ana@@example.com"));
        assert!(!is_valid_email("ana b@example.com"));
    }

    #[test]
    fn test_merge_is_whitelisted() {
        let mut user = UserDoc::new("ana@example.com".into());
        user.enrolled_packages.push("starter".into());
        user.progress.total_courses_completed = 4;
        user.password_hash = Some("$argon2id$stored".into());
        user.firebase_uid = Some("fb-1".into());

        let patch: ProfileUpsert = serde_json::from_value(serde_json::json!({
            "name": "Ana",
            "ageGroup": "15+",
            "firebaseUid": "fb-2",
            "enrolledPackages": [],
            "progress": { "totalCoursesCompleted": 0 },
            "passwordHash": "x",
        }))
        .unwrap();
        patch.merge_into(&mut user);

        assert_eq!(user.name, "Ana");
        assert_eq!(user.age_group.as_deref(), Some("15+"));
        assert_eq!(user.firebase_uid.as_deref(), Some("fb-1"));
        assert_eq!(user.enrolled_packages, vec!["starter".to_string()]);
        assert_eq!(user.progress.total_courses_completed, 4);
        assert_eq!(user.password_hash.as_deref(), Some("$argon2id$stored"));
    }
}
