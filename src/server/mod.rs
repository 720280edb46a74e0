//! Server components for signlearn

pub mod http;

pub use http::{run, AppState, MAX_BODY_BYTES};
