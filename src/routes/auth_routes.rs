//! HTTP routes for authentication
//!
//! - POST /auth/register - create a password account
//! - POST /auth/login    - check credentials

use bytes::Bytes;
use hyper::StatusCode;
use serde::Serialize;

use crate::db::schemas::PublicUser;
use crate::server::AppState;
use crate::services::{LoginRequest, RegisterRequest};
use crate::types::Result;

use super::response::{json_response, ok, parse_json_body, HttpResponse};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

pub async fn handle_register(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let request: RegisterRequest = parse_json_body(body)?;
    let user = state.accounts.register(request).await?;

    Ok(json_response(
        StatusCode::CREATED,
        &AuthResponse {
            message: "Registration successful",
            user,
        },
    ))
}

pub async fn handle_login(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let request: LoginRequest = parse_json_body(body)?;
    let user = state.accounts.login(request).await?;

    ok(&AuthResponse {
        message: "Login successful",
        user,
    })
}
