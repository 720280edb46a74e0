//! Argon2id password hashes in PHC string form

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::PlatformError;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PlatformError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PlatformError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored hash.
///
/// A stored value that is not a PHC hash is an internal error, not a mismatch.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PlatformError> {
    let stored = PasswordHash::new(stored)
        .map_err(|e| PlatformError::Internal(format!("Stored password hash unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &stored)
        .is_ok())
}
