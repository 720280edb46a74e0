//! Record store contract
//!
//! The consistency engine relies on four primitives: get-by-id,
//! find-or-create by composite key, linearizable counter increments and
//! set-membership add. Implementations must make each primitive atomic per
//! key; the engine never locks.
//!
//! Two implementations:
//! - [`MongoStore`] - production, one MongoDB operation per primitive
//! - [`MemoryStore`] - dev mode and tests, per-entry locks in `DashMap`

use async_trait::async_trait;

use crate::db::schemas::{Course, Package, ProgressKey, ProgressRecord, ProgressStatus, UserDoc};
use crate::types::Result;

mod memory;
mod mongo;
pub mod query;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use query::{CourseFilter, PackageFilter, PageRequest};

/// Entities that carry a view counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Course,
    Package,
}

/// Result of one atomic find-or-create-and-update on a progress record
#[derive(Debug, Clone)]
pub struct ProgressTransition {
    /// Status before this update; `None` when the record was created by it
    pub previous: Option<ProgressStatus>,
    pub record: ProgressRecord,
}

impl ProgressTransition {
    /// True only for the update that moved the record into `completed`
    pub fn just_completed(&self) -> bool {
        self.previous != Some(ProgressStatus::Completed)
            && self.record.status == ProgressStatus::Completed
    }
}

/// Outcome of adding a package to a user's enrollment set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Added,
    AlreadyMember,
    UserMissing,
}

/// Primitives used by the consistency engine
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_course(&self, id: &str) -> Result<Option<Course>>;

    async fn get_package(&self, id: &str) -> Result<Option<Package>>;

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>>;

    async fn get_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>>;

    /// Find-or-create the record for `key` and apply the update, atomically.
    ///
    /// Concurrent callers on one key observe a single record and a single
    /// serial order of updates.
    async fn apply_progress(
        &self,
        key: &ProgressKey,
        percentage: f64,
        time_spent_delta: i64,
    ) -> Result<ProgressTransition>;

    /// Add to `enrolledPackages` if absent
    async fn add_enrolled_package(&self, user_id: &str, package_id: &str) -> Result<Membership>;

    /// Returns false when the package does not exist
    async fn increment_package_enrollments(&self, package_id: &str) -> Result<bool>;

    /// Returns false when the course does not exist
    async fn increment_course_completions(&self, course_id: &str) -> Result<bool>;

    /// Returns false when the user does not exist
    async fn increment_courses_completed(&self, user_id: &str) -> Result<bool>;

    /// Fetch a course and count the view in one operation
    async fn view_course(&self, id: &str) -> Result<Option<Course>>;

    /// Fetch an active package and count the view in one operation
    async fn view_package(&self, id: &str) -> Result<Option<Package>>;
}

/// Catalog reads and seeding
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// One page of matching courses in popularity order, plus the total match count
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Course>, u64)>;

    async fn count_courses(&self, filter: &CourseFilter) -> Result<u64>;

    async fn list_packages(
        &self,
        filter: &PackageFilter,
        page: PageRequest,
    ) -> Result<(Vec<Package>, u64)>;

    async fn count_packages(&self, filter: &PackageFilter) -> Result<u64>;

    /// Insert or refresh a course by `id`, keeping existing counters
    async fn upsert_course(&self, course: Course) -> Result<()>;

    /// Insert or refresh a package by `id`, keeping existing counters
    async fn upsert_package(&self, package: Package) -> Result<()>;
}

/// User persistence for the account service
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new user; `Conflict` when the email or external id is taken
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<UserDoc>>;

    /// Replace the whitelisted profile fields of an existing user
    async fn save_profile(&self, user: &UserDoc) -> Result<Option<UserDoc>>;

    async fn count_active_users(&self) -> Result<u64>;
}

/// Everything the HTTP layer needs from one backend
pub trait Store: RecordStore + CatalogStore + AccountStore {
    fn backend_name(&self) -> &'static str;
}
