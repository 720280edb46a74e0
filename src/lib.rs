//! signlearn - learning platform API
//!
//! REST backend for a sign language learning platform: course catalog,
//! package enrollment and per-course progress tracking.
//!
//! ## Components
//!
//! - **Engine**: applies enrollment, progress and view events while keeping
//!   denormalized counters consistent under concurrent requests
//! - **Store**: record store contract with MongoDB and in-memory backends
//! - **Services**: catalog queries and account management
//! - **Routes**: JSON HTTP API on hyper

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod routes;
pub mod seed;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PlatformError, Result};
