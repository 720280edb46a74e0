//! Enrollment and progress consistency engine
//!
//! Applies enrollment, progress and view events to the record store while
//! keeping the denormalized counters honest under concurrent and retried
//! requests. The engine holds no locks of its own: every step is a single
//! atomic store primitive, and side effects are keyed off what those
//! primitives report (new membership, previous status).

mod outcome;

pub use outcome::{CompletionReport, CounterStatus, EnrollOutcome, ProgressOutcome};

use clap::ValueEnum;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{Course, Package, ProgressKey, ProgressRecord};
use crate::store::{EntityKind, Membership, RecordStore};
use crate::types::{PlatformError, Result};

/// Largest time delta accepted in one progress update: one day, in seconds
pub const MAX_TIME_SPENT_DELTA: i64 = 24 * 60 * 60;

/// When a package's enrollment counter moves
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrollmentCounting {
    /// Once per user: only a new membership counts
    #[default]
    Unique,
    /// Every enroll call counts, even for existing members
    PerCall,
}

/// Consistency engine over any record store
pub struct ConsistencyEngine<S: RecordStore + ?Sized> {
    store: Arc<S>,
    counting: EnrollmentCounting,
}

impl<S: RecordStore + ?Sized> Clone for ConsistencyEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            counting: self.counting,
        }
    }
}

impl<S: RecordStore + ?Sized> ConsistencyEngine<S> {
    pub fn new(store: Arc<S>, counting: EnrollmentCounting) -> Self {
        Self { store, counting }
    }

    /// Enroll a user in an active package.
    ///
    /// Membership is added first; the package counter follows according to
    /// the counting policy. Enrolling twice is a successful no-op for
    /// membership.
    pub async fn enroll(&self, user_id: &str, package_id: &str) -> Result<EnrollOutcome> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(PlatformError::NotFound("User not found".into()));
        }
        let mut package = self
            .store
            .get_package(package_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| PlatformError::NotFound("Package not found".into()))?;

        let newly_enrolled = match self.store.add_enrolled_package(user_id, package_id).await? {
            Membership::Added => true,
            Membership::AlreadyMember => false,
            Membership::UserMissing => {
                return Err(PlatformError::NotFound("User not found".into()));
            }
        };

        let due = newly_enrolled || self.counting == EnrollmentCounting::PerCall;
        let enrollment_counter = if due {
            counter_step(
                "package.enrollments",
                package_id,
                self.store.increment_package_enrollments(package_id).await,
            )
        } else {
            CounterStatus::Skipped
        };
        if enrollment_counter == CounterStatus::Applied {
            // Re-read so the returned counters include this increment
            match self.store.get_package(package_id).await {
                Ok(Some(fresh)) => package = fresh,
                Ok(None) => {}
                Err(e) => warn!(package_id, error = %e, "package re-read after enrollment failed"),
            }
        }

        info!(
            user_id,
            package_id,
            newly_enrolled,
            counter = ?enrollment_counter,
            "enrollment recorded"
        );

        Ok(EnrollOutcome {
            package,
            newly_enrolled,
            enrollment_counter,
        })
    }

    /// Record a progress update for one (user, course) pair.
    ///
    /// The record is written even when the user or course is unknown; that
    /// surfaces as `NotFound` in the completion report.
    pub async fn record_progress(
        &self,
        user_id: &str,
        course_id: &str,
        percentage: f64,
        time_spent_delta: Option<i64>,
    ) -> Result<ProgressOutcome> {
        validate_progress(percentage, time_spent_delta)?;
        let delta = time_spent_delta.unwrap_or(0);

        let key = ProgressKey::new(user_id, course_id);
        let transition = self.store.apply_progress(&key, percentage, delta).await?;
        let just_completed = transition.just_completed();

        let analytics = if just_completed {
            // Independent counters; one failing must not stop the other
            let user_completions = counter_step(
                "user.totalCoursesCompleted",
                user_id,
                self.store.increment_courses_completed(user_id).await,
            );
            let course_completions = counter_step(
                "course.completions",
                course_id,
                self.store.increment_course_completions(course_id).await,
            );
            info!(user_id, course_id, "course completed");
            CompletionReport {
                user_completions,
                course_completions,
            }
        } else {
            CompletionReport::skipped()
        };

        Ok(ProgressOutcome {
            record: transition.record,
            just_completed,
            analytics,
        })
    }

    pub async fn get_progress(&self, user_id: &str, course_id: &str) -> Result<ProgressRecord> {
        self.store
            .get_progress(&ProgressKey::new(user_id, course_id))
            .await?
            .ok_or_else(|| PlatformError::NotFound("Progress not found".into()))
    }

    /// Fetch a course, counting one view
    pub async fn view_course(&self, id: &str) -> Result<Course> {
        self.store
            .view_course(id)
            .await?
            .ok_or_else(|| PlatformError::NotFound("Course not found".into()))
    }

    /// Fetch an active package, counting one view
    pub async fn view_package(&self, id: &str) -> Result<Package> {
        self.store
            .view_package(id)
            .await?
            .ok_or_else(|| PlatformError::NotFound("Package not found".into()))
    }

    /// Count one view without returning the entity
    pub async fn record_view(&self, kind: EntityKind, id: &str) -> Result<()> {
        match kind {
            EntityKind::Course => self.view_course(id).await.map(|_| ()),
            EntityKind::Package => self.view_package(id).await.map(|_| ()),
        }
    }
}

fn validate_progress(percentage: f64, time_spent_delta: Option<i64>) -> Result<()> {
    if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
        return Err(PlatformError::Validation(
            "progressPercentage must be a number between 0 and 100".into(),
        ));
    }
    match time_spent_delta {
        Some(t) if t < 0 => Err(PlatformError::Validation(
            "timeSpent must not be negative".into(),
        )),
        Some(t) if t > MAX_TIME_SPENT_DELTA => Err(PlatformError::Validation(format!(
            "timeSpent must not exceed {} seconds per update",
            MAX_TIME_SPENT_DELTA
        ))),
        _ => Ok(()),
    }
}

/// Fold a counter increment result into a status, logging failures
fn counter_step(counter: &str, entity_id: &str, result: Result<bool>) -> CounterStatus {
    match result {
        Ok(true) => CounterStatus::Applied,
        Ok(false) => {
            warn!(counter, entity_id, "counter target not found");
            CounterStatus::NotFound
        }
        Err(e) => {
            warn!(counter, entity_id, error = %e, "counter increment failed");
            CounterStatus::Failed
        }
    }
}
