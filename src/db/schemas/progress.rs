//! Progress record schema
//!
//! One record per (user, course) pair. Status is derived from the
//! percentage, with a ratchet: once `completed`, a record stays completed
//! even if a later update lowers the percentage.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::Metadata;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::types::PlatformError;

/// Collection name for progress records
pub const PROGRESS_COLLECTION: &str = "userprogresses";

/// Progress status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// Status implied by a percentage alone
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            Self::Completed
        } else if percentage > 0.0 {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }

    /// Status after writing `percentage` over a record whose status was `previous`.
    pub fn after_update(previous: Option<Self>, percentage: f64) -> Self {
        match previous {
            Some(Self::Completed) => Self::Completed,
            _ => Self::from_percentage(percentage),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity of a progress record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: String,
    pub course_id: String,
}

impl ProgressKey {
    pub fn new(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
        }
    }

    /// Equality filter on both key fields
    pub fn filter(&self) -> Document {
        doc! { "userId": &self.user_id, "courseId": &self.course_id }
    }
}

/// Progress record document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: String,

    pub course_id: String,

    /// 0..=100, last write wins
    pub progress_percentage: f64,

    /// Cumulative seconds
    #[serde(default)]
    pub time_spent: i64,

    #[serde(default)]
    pub status: ProgressStatus,

    /// First transition into `completed`; never moves afterwards
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed: DateTime<Utc>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl ProgressRecord {
    /// Fresh record for a key, as created by find-or-create
    pub fn new(key: &ProgressKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            course_id: key.course_id.clone(),
            progress_percentage: 0.0,
            time_spent: 0,
            status: ProgressStatus::NotStarted,
            completed_at: None,
            last_accessed: now,
            metadata: Metadata::at(now),
        }
    }

    /// Apply one validated update in place.
    ///
    /// The MongoDB store expresses the same fold as an update pipeline; the
    /// two must stay in step. A total that would overflow leaves the record
    /// untouched.
    pub fn apply(
        &mut self,
        percentage: f64,
        time_spent_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<(), PlatformError> {
        let time_spent = self
            .time_spent
            .checked_add(time_spent_delta)
            .filter(|total| *total >= 0)
            .ok_or_else(|| PlatformError::Validation("timeSpent total is out of range".into()))?;

        self.status = ProgressStatus::after_update(Some(self.status), percentage);
        self.progress_percentage = percentage;
        self.time_spent = time_spent;
        if self.status == ProgressStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.last_accessed = now;
        self.metadata.touch(now);
        Ok(())
    }
}

impl IntoIndexes for ProgressRecord {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one record per (user, course)
            (
                doc! { "userId": 1, "courseId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_course_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "courseId": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("course_status".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProgressRecord {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
