//! Configuration for signlearn
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::engine::EnrollmentCounting;

/// Which record store backs the service
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Mongo,
    Memory,
}

/// signlearn - sign language learning platform API
#[derive(Parser, Debug, Clone)]
#[command(name = "signlearn")]
#[command(about = "Course catalog, enrollment and progress tracking API")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:4000")]
    pub listen: SocketAddr,

    /// Record store backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Mongo)]
    pub store: StoreBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "signlearn")]
    pub mongodb_db: String,

    /// Enable development mode (fall back to the in-memory store when
    /// MongoDB is unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JSON catalog seed ({"courses": [...], "packages": [...]}) loaded at startup
    #[arg(long, env = "SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// When a package's enrollment counter moves: once per user, or on every call
    #[arg(
        long,
        env = "ENROLLMENT_COUNTING",
        value_enum,
        default_value_t = EnrollmentCounting::Unique
    )]
    pub enrollment_counting: EnrollmentCounting,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Upper bound on handling one request, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Largest page size a client may request
    #[arg(long, env = "MAX_PAGE_LIMIT", default_value = "100")]
    pub max_page_limit: u32,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.max_page_limit == 0 {
            return Err("MAX_PAGE_LIMIT must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!("signlearn={},info", self.log_level)
    }
}
