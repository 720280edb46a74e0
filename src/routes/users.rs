//! User, enrollment and progress routes
//!
//! - POST /users                               - create or merge a profile
//! - GET  /users/:id                           - public user
//! - POST /users/:userId/enroll/:packageId     - enroll in a package
//! - GET  /users/:userId/progress/:courseId    - read progress
//! - POST /users/:userId/progress/:courseId    - record progress
//!
//! Enrollment and progress writes can succeed while a counter update does
//! not. Those responses still carry the saved data, with a 404 when a
//! counter's entity is missing and a 500 when the increment failed.

use bytes::Bytes;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::schemas::{Package, ProgressRecord, PublicUser};
use crate::engine::{CompletionReport, CounterStatus};
use crate::server::AppState;
use crate::services::ProfileUpsert;
use crate::types::{PlatformError, Result};

use super::response::{json_response, ok, parse_json_body, HttpResponse};

#[derive(Debug, Serialize)]
struct UserResponse {
    message: &'static str,
    user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollResponse {
    message: &'static str,
    package: Package,
    newly_enrolled: bool,
    enrollment_counter: CounterStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRequest {
    progress_percentage: Option<serde_json::Value>,
    #[serde(default)]
    time_spent: Option<serde_json::Value>,
}

impl ProgressRequest {
    /// Pull typed values out of a loosely typed body
    fn validated(&self) -> Result<(f64, Option<i64>)> {
        let percentage = self
            .progress_percentage
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| {
                PlatformError::Validation(
                    "progressPercentage must be a number between 0 and 100".into(),
                )
            })?;

        let time_spent = match self.time_spent {
            None | Some(serde_json::Value::Null) => None,
            Some(ref value) => Some(whole_seconds(value).ok_or_else(|| {
                PlatformError::Validation("timeSpent must be a non-negative number".into())
            })?),
        };

        Ok((percentage, time_spent))
    }
}

/// Accept integral JSON numbers, including `30.0`
fn whole_seconds(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResponse {
    message: &'static str,
    progress: ProgressRecord,
    just_completed: bool,
    analytics: CompletionReport,
}

pub async fn handle_upsert_user(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let request: ProfileUpsert = parse_json_body(body)?;
    let (user, created) = state.accounts.upsert(request).await?;

    Ok(if created {
        json_response(
            StatusCode::CREATED,
            &UserResponse {
                message: "User created successfully",
                user,
            },
        )
    } else {
        json_response(
            StatusCode::OK,
            &UserResponse {
                message: "User updated successfully",
                user,
            },
        )
    })
}

pub async fn handle_get_user(state: &AppState, user_id: &str) -> Result<HttpResponse> {
    ok(&state.accounts.get(user_id).await?)
}

pub async fn handle_enroll(
    state: &AppState,
    user_id: &str,
    package_id: &str,
) -> Result<HttpResponse> {
    let outcome = state.engine.enroll(user_id, package_id).await?;

    let (status, message) = match outcome.enrollment_counter {
        CounterStatus::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Enrolled, but the package enrollment count could not be updated",
        ),
        CounterStatus::NotFound => (StatusCode::NOT_FOUND, "Package not found"),
        CounterStatus::Applied | CounterStatus::Skipped if outcome.newly_enrolled => {
            (StatusCode::OK, "Successfully enrolled in package")
        }
        CounterStatus::Applied | CounterStatus::Skipped => {
            (StatusCode::OK, "Already enrolled in package")
        }
    };

    Ok(json_response(
        status,
        &EnrollResponse {
            message,
            package: outcome.package,
            newly_enrolled: outcome.newly_enrolled,
            enrollment_counter: outcome.enrollment_counter,
        },
    ))
}

pub async fn handle_get_progress(
    state: &AppState,
    user_id: &str,
    course_id: &str,
) -> Result<HttpResponse> {
    ok(&state.engine.get_progress(user_id, course_id).await?)
}

pub async fn handle_record_progress(
    state: &AppState,
    user_id: &str,
    course_id: &str,
    body: &Bytes,
) -> Result<HttpResponse> {
    let request: ProgressRequest = parse_json_body(body)?;
    let (percentage, time_spent) = request.validated()?;

    let outcome = state
        .engine
        .record_progress(user_id, course_id, percentage, time_spent)
        .await?;

    // A failed increment outranks a missing entity
    let (status, message) = if outcome.analytics.has_failure() {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Progress saved, but completion counters could not be updated",
        )
    } else if outcome.analytics.has_missing() {
        (
            StatusCode::NOT_FOUND,
            "Progress saved, but the user or course was not found",
        )
    } else {
        (StatusCode::OK, "Progress updated successfully")
    };

    Ok(json_response(
        status,
        &ProgressResponse {
            message,
            progress: outcome.record,
            just_completed: outcome.just_completed,
            analytics: outcome.analytics,
        },
    ))
}
