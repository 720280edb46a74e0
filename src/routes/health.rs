//! Liveness endpoint
//!
//! `/health` answers 200 whenever the process is serving requests. It does
//! not query the store; the backend name tells operators which one is live.

use hyper::StatusCode;
use serde::Serialize;

use crate::server::AppState;

use super::response::{json_response, HttpResponse};

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since startup
    pub uptime: u64,
    /// Active store backend: "mongodb" or "memory"
    pub store: &'static str,
}

pub fn health_check(state: &AppState) -> HttpResponse {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            store: state.store.backend_name(),
        },
    )
}
