//! Shared types for signlearn

mod error;

pub use error::{ErrorResponse, PlatformError, Result};
