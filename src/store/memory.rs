//! In-memory record store
//!
//! Used in dev mode when MongoDB is unavailable, and by the test suite.
//! Every primitive runs under the `DashMap` shard lock of the entry it
//! touches, which gives per-key atomicity without any engine-side locking.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Ordering;
use tracing::debug;

use super::{
    AccountStore, CatalogStore, CourseFilter, Membership, PackageFilter, PageRequest,
    ProgressTransition, RecordStore, Store,
};
use crate::db::schemas::{
    Course, Metadata, Package, ProgressKey, ProgressRecord, UserDoc,
};
use crate::types::{PlatformError, Result};

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    courses: DashMap<String, Course>,
    packages: DashMap<String, Package>,
    /// Users keyed by hex ObjectId
    users: DashMap<String, UserDoc>,
    /// email -> user id
    emails: DashMap<String, String>,
    /// firebaseUid -> user id
    firebase_uids: DashMap<String, String>,
    progress: DashMap<ProgressKey, ProgressRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of progress records held, used by tests to check uniqueness
    pub fn progress_count(&self) -> usize {
        self.progress.len()
    }
}

/// Catalog order: enrollments desc, then newest first
fn by_popularity(a_enrollments: i64, a: &Metadata, b_enrollments: i64, b: &Metadata) -> Ordering {
    b_enrollments
        .cmp(&a_enrollments)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn window<T>(mut items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
    let page_items = if skip >= items.len() {
        Vec::new()
    } else {
        items.drain(skip..).take(page.limit as usize).collect()
    };
    (page_items, total)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        Ok(self.courses.get(id).map(|c| c.clone()))
    }

    async fn get_package(&self, id: &str) -> Result<Option<Package>> {
        Ok(self.packages.get(id).map(|p| p.clone()))
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn get_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>> {
        Ok(self.progress.get(key).map(|r| r.clone()))
    }

    async fn apply_progress(
        &self,
        key: &ProgressKey,
        percentage: f64,
        time_spent_delta: i64,
    ) -> Result<ProgressTransition> {
        let now = Utc::now();

        // The entry guard holds the shard lock until the update is done
        let transition = match self.progress.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let previous = Some(record.status);
                record.apply(percentage, time_spent_delta, now)?;
                ProgressTransition {
                    previous,
                    record: record.clone(),
                }
            }
            Entry::Vacant(vacant) => {
                let mut record = ProgressRecord::new(key, now);
                record.apply(percentage, time_spent_delta, now)?;
                vacant.insert(record.clone());
                ProgressTransition {
                    previous: None,
                    record,
                }
            }
        };

        Ok(transition)
    }

    async fn add_enrolled_package(&self, user_id: &str, package_id: &str) -> Result<Membership> {
        let Some(mut user) = self.users.get_mut(user_id) else {
            return Ok(Membership::UserMissing);
        };
        if user.is_enrolled_in(package_id) {
            return Ok(Membership::AlreadyMember);
        }
        user.enrolled_packages.push(package_id.to_string());
        user.metadata.touch(Utc::now());
        Ok(Membership::Added)
    }

    async fn increment_package_enrollments(&self, package_id: &str) -> Result<bool> {
        Ok(match self.packages.get_mut(package_id) {
            Some(mut package) => {
                package.analytics.enrollments += 1;
                true
            }
            None => false,
        })
    }

    async fn increment_course_completions(&self, course_id: &str) -> Result<bool> {
        Ok(match self.courses.get_mut(course_id) {
            Some(mut course) => {
                course.analytics.completions += 1;
                true
            }
            None => false,
        })
    }

    async fn increment_courses_completed(&self, user_id: &str) -> Result<bool> {
        Ok(match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.progress.total_courses_completed += 1;
                true
            }
            None => false,
        })
    }

    async fn view_course(&self, id: &str) -> Result<Option<Course>> {
        Ok(self.courses.get_mut(id).map(|mut course| {
            course.analytics.views += 1;
            course.clone()
        }))
    }

    async fn view_package(&self, id: &str) -> Result<Option<Package>> {
        let Some(mut package) = self.packages.get_mut(id) else {
            return Ok(None);
        };
        if !package.is_active {
            return Ok(None);
        }
        package.analytics.views += 1;
        Ok(Some(package.clone()))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Course>, u64)> {
        let mut matches: Vec<Course> = self
            .courses
            .iter()
            .filter(|c| filter.matches(c.value()))
            .map(|c| c.value().clone())
            .collect();
        matches.sort_by(|a, b| {
            by_popularity(
                a.analytics.enrollments,
                &a.metadata,
                b.analytics.enrollments,
                &b.metadata,
            )
        });
        Ok(window(matches, page))
    }

    async fn count_courses(&self, filter: &CourseFilter) -> Result<u64> {
        Ok(self.courses.iter().filter(|c| filter.matches(c.value())).count() as u64)
    }

    async fn list_packages(
        &self,
        filter: &PackageFilter,
        page: PageRequest,
    ) -> Result<(Vec<Package>, u64)> {
        let mut matches: Vec<Package> = self
            .packages
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        matches.sort_by(|a, b| {
            by_popularity(
                a.analytics.enrollments,
                &a.metadata,
                b.analytics.enrollments,
                &b.metadata,
            )
        });
        Ok(window(matches, page))
    }

    async fn count_packages(&self, filter: &PackageFilter) -> Result<u64> {
        Ok(self.packages.iter().filter(|p| filter.matches(p.value())).count() as u64)
    }

    async fn upsert_course(&self, mut course: Course) -> Result<()> {
        match self.courses.entry(course.id.clone()) {
            Entry::Occupied(mut existing) => {
                let current = existing.get_mut();
                course.analytics = current.analytics.clone();
                course.metadata.created_at = current.metadata.created_at;
                course.metadata.touch(Utc::now());
                *current = course;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(course);
            }
        }
        Ok(())
    }

    async fn upsert_package(&self, mut package: Package) -> Result<()> {
        match self.packages.entry(package.id.clone()) {
            Entry::Occupied(mut existing) => {
                let current = existing.get_mut();
                package.analytics = current.analytics.clone();
                package.metadata.created_at = current.metadata.created_at;
                package.metadata.touch(Utc::now());
                *current = package;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(package);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_user(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = ObjectId::new();
        let id_hex = id.to_hex();

        // Reserve the unique keys first so concurrent inserts can't both win
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(PlatformError::Conflict("User already exists".into()));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(id_hex.clone());
            }
        }
        if let Some(uid) = user.firebase_uid.clone() {
            match self.firebase_uids.entry(uid) {
                Entry::Occupied(_) => {
                    self.emails.remove(&user.email);
                    return Err(PlatformError::Conflict("User already exists".into()));
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(id_hex.clone());
                }
            }
        }

        user._id = Some(id);
        user.metadata = Metadata::new();
        self.users.insert(id_hex.clone(), user.clone());
        debug!(user_id = %id_hex, "memory store: inserted user");
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let Some(id) = self.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<UserDoc>> {
        let Some(id) = self.firebase_uids.get(uid).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn save_profile(&self, profile: &UserDoc) -> Result<Option<UserDoc>> {
        let Some(id) = profile.id_hex() else {
            return Ok(None);
        };
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };

        if user.firebase_uid.is_none() {
            if let Some(uid) = profile.firebase_uid.clone() {
                match self.firebase_uids.entry(uid.clone()) {
                    Entry::Occupied(taken) if taken.get() != &id => {
                        return Err(PlatformError::Conflict(
                            "External id already linked to another user".into(),
                        ));
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(vacant) => {
                        vacant.insert(id.clone());
                    }
                }
                user.firebase_uid = Some(uid);
            }
        }

        user.name = profile.name.clone();
        user.phone = profile.phone.clone();
        user.age_group = profile.age_group.clone();
        user.user_type = profile.user_type.clone();
        user.metadata.touch(Utc::now());
        Ok(Some(user.clone()))
    }

    async fn count_active_users(&self) -> Result<u64> {
        Ok(self.users.iter().filter(|u| u.is_active).count() as u64)
    }
}

impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
