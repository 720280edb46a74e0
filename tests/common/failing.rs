//! Store wrapper whose counter increments always fail
//!
//! Every other call goes straight to the wrapped memory store, so primary
//! writes (membership, progress records) succeed while the counter step
//! after them does not.

use async_trait::async_trait;
use std::sync::Arc;

use signlearn::db::schemas::{Course, Package, ProgressKey, ProgressRecord, UserDoc};
use signlearn::store::{
    AccountStore, CatalogStore, CourseFilter, Membership, MemoryStore, PackageFilter, PageRequest,
    ProgressTransition, RecordStore, Store,
};
use signlearn::{PlatformError, Result};

pub struct FailingCounters {
    inner: Arc<MemoryStore>,
}

impl FailingCounters {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner }
    }
}

fn counter_down() -> PlatformError {
    PlatformError::Store("counter collection unavailable".into())
}

#[async_trait]
impl RecordStore for FailingCounters {
    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        self.inner.get_course(id).await
    }

    async fn get_package(&self, id: &str) -> Result<Option<Package>> {
        self.inner.get_package(id).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>> {
        self.inner.get_user(id).await
    }

    async fn get_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>> {
        self.inner.get_progress(key).await
    }

    async fn apply_progress(
        &self,
        key: &ProgressKey,
        percentage: f64,
        time_spent_delta: i64,
    ) -> Result<ProgressTransition> {
        self.inner
            .apply_progress(key, percentage, time_spent_delta)
            .await
    }

    async fn add_enrolled_package(&self, user_id: &str, package_id: &str) -> Result<Membership> {
        self.inner.add_enrolled_package(user_id, package_id).await
    }

    async fn increment_package_enrollments(&self, _package_id: &str) -> Result<bool> {
        Err(counter_down())
    }

    async fn increment_course_completions(&self, _course_id: &str) -> Result<bool> {
        Err(counter_down())
    }

    async fn increment_courses_completed(&self, _user_id: &str) -> Result<bool> {
        Err(counter_down())
    }

    async fn view_course(&self, id: &str) -> Result<Option<Course>> {
        self.inner.view_course(id).await
    }

    async fn view_package(&self, id: &str) -> Result<Option<Package>> {
        self.inner.view_package(id).await
    }
}

#[async_trait]
impl CatalogStore for FailingCounters {
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Course>, u64)> {
        self.inner.list_courses(filter, page).await
    }

    async fn count_courses(&self, filter: &CourseFilter) -> Result<u64> {
        self.inner.count_courses(filter).await
    }

    async fn list_packages(
        &self,
        filter: &PackageFilter,
        page: PageRequest,
    ) -> Result<(Vec<Package>, u64)> {
        self.inner.list_packages(filter, page).await
    }

    async fn count_packages(&self, filter: &PackageFilter) -> Result<u64> {
        self.inner.count_packages(filter).await
    }

    async fn upsert_course(&self, course: Course) -> Result<()> {
        self.inner.upsert_course(course).await
    }

    async fn upsert_package(&self, package: Package) -> Result<()> {
        self.inner.upsert_package(package).await
    }
}

#[async_trait]
impl AccountStore for FailingCounters {
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc> {
        self.inner.insert_user(user).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<UserDoc>> {
        self.inner.find_user_by_firebase_uid(uid).await
    }

    async fn save_profile(&self, user: &UserDoc) -> Result<Option<UserDoc>> {
        self.inner.save_profile(user).await
    }

    async fn count_active_users(&self) -> Result<u64> {
        self.inner.count_active_users().await
    }
}

impl Store for FailingCounters {
    fn backend_name(&self) -> &'static str {
        "failing-counters"
    }
}
