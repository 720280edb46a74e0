//! Credential handling
//!
//! Passwords are stored as salted Argon2id hashes and never leave the
//! account service in any other form.

pub mod password;

pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
