//! Database schemas for signlearn
//!
//! Defines the document structures for courses, packages, users and
//! progress records. Field names are camelCase on the wire and in MongoDB.

mod course;
mod metadata;
mod package;
mod progress;
mod user;

pub use course::{Course, CourseAnalytics, COURSE_COLLECTION};
pub use metadata::Metadata;
pub use package::{Package, PackageAnalytics, PACKAGE_COLLECTION};
pub use progress::{ProgressKey, ProgressRecord, ProgressStatus, PROGRESS_COLLECTION};
pub use user::{LearnerProgress, PublicUser, UserDoc, USER_COLLECTION};

pub(crate) fn default_true() -> bool {
    true
}
