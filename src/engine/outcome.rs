//! Outcomes reported by the consistency engine

use serde::Serialize;

use crate::db::schemas::{Package, ProgressRecord};

/// What happened to one denormalized counter
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CounterStatus {
    /// Incremented by exactly one
    Applied,
    /// Not due: no transition, or the counting policy excludes this call
    Skipped,
    /// The entity carrying the counter does not exist
    NotFound,
    /// The store rejected the increment after the primary write succeeded
    Failed,
}

/// Counter report for a progress update
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    /// `user.progress.totalCoursesCompleted`
    pub user_completions: CounterStatus,
    /// `course.analytics.completions`
    pub course_completions: CounterStatus,
}

impl CompletionReport {
    pub fn skipped() -> Self {
        Self {
            user_completions: CounterStatus::Skipped,
            course_completions: CounterStatus::Skipped,
        }
    }

    fn statuses(&self) -> [CounterStatus; 2] {
        [self.user_completions, self.course_completions]
    }

    pub fn has_failure(&self) -> bool {
        self.statuses().contains(&CounterStatus::Failed)
    }

    pub fn has_missing(&self) -> bool {
        self.statuses().contains(&CounterStatus::NotFound)
    }
}

/// Result of an enrollment
#[derive(Debug, Clone)]
pub struct EnrollOutcome {
    pub package: Package,
    /// True when this call added the membership
    pub newly_enrolled: bool,
    pub enrollment_counter: CounterStatus,
}

/// Result of a progress update
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    /// The record as written by this update
    pub record: ProgressRecord,
    pub just_completed: bool,
    pub analytics: CompletionReport,
}
