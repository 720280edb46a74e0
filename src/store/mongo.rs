//! MongoDB record store
//!
//! Each store primitive maps to exactly one server-side atomic operation:
//! - find-or-create: `findOneAndUpdate` with upsert and an update pipeline,
//!   returning the pre-image so the caller sees the previous status
//! - counters: `$inc`
//! - set-add: `updateOne` guarded by `$ne`, so `modifiedCount` says whether
//!   the member was new
//! - view fetch: `findOneAndUpdate` with `$inc`, returning the post-image

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::Utc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::query::popularity_sort;
use super::{
    AccountStore, CatalogStore, CourseFilter, Membership, PackageFilter, PageRequest,
    ProgressTransition, RecordStore, Store,
};
use crate::db::mongo::is_duplicate_key;
use crate::db::schemas::{
    Course, Package, ProgressKey, ProgressRecord, ProgressStatus, UserDoc, COURSE_COLLECTION,
    PACKAGE_COLLECTION, PROGRESS_COLLECTION, USER_COLLECTION,
};
use crate::db::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
use crate::types::{PlatformError, Result};

/// MongoDB-backed store
pub struct MongoStore {
    courses: MongoCollection<Course>,
    packages: MongoCollection<Package>,
    users: MongoCollection<UserDoc>,
    progress: MongoCollection<ProgressRecord>,
}

impl MongoStore {
    /// Open all collections, creating their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            courses: client.collection(COURSE_COLLECTION).await?,
            packages: client.collection(PACKAGE_COLLECTION).await?,
            users: client.collection(USER_COLLECTION).await?,
            progress: client.collection(PROGRESS_COLLECTION).await?,
        })
    }
}

/// `$inc` one counter; false when nothing matched the filter
async fn increment<T>(
    collection: &MongoCollection<T>,
    filter: Document,
    field: &str,
) -> Result<bool>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    let update = doc! {
        "$inc": { field: 1_i64 },
        "$set": { "metadata.updatedAt": Utc::now().timestamp_millis() },
    };
    let result = collection.update_one(filter, update).await?;
    Ok(result.matched_count > 0)
}

/// Store-assigned ids are ObjectIds; anything else cannot match a user
fn parse_user_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// Update pipeline equivalent to [`ProgressRecord::apply`] on an upserted document.
///
/// Caller-supplied strings go through `$literal` so ids starting with `$`
/// are never read as field paths.
fn progress_pipeline(
    key: &ProgressKey,
    percentage: f64,
    time_spent_delta: i64,
    now_ms: i64,
) -> Vec<Document> {
    let derived = ProgressStatus::from_percentage(percentage);

    let mut set = doc! {
        "userId": { "$literal": &key.user_id },
        "courseId": { "$literal": &key.course_id },
        "progressPercentage": percentage,
        // Never let the sum leave the long range; the replayed fold reports it
        "timeSpent": {
            "$cond": [
                { "$gt": [ { "$ifNull": ["$timeSpent", 0_i64] }, i64::MAX - time_spent_delta ] },
                { "$ifNull": ["$timeSpent", 0_i64] },
                { "$add": [ { "$ifNull": ["$timeSpent", 0_i64] }, time_spent_delta ] },
            ]
        },
        "status": {
            "$cond": [
                { "$eq": ["$status", ProgressStatus::Completed.as_str()] },
                ProgressStatus::Completed.as_str(),
                derived.as_str(),
            ]
        },
        "lastAccessed": now_ms,
        "metadata.createdAt": { "$ifNull": ["$metadata.createdAt", now_ms] },
        "metadata.updatedAt": now_ms,
    };
    if derived == ProgressStatus::Completed {
        set.insert("completedAt", doc! { "$ifNull": ["$completedAt", now_ms] });
    }

    vec![doc! { "$set": set }]
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        self.courses.find_one(doc! { "id": id }).await
    }

    async fn get_package(&self, id: &str) -> Result<Option<Package>> {
        self.packages.find_one(doc! { "id": id }).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>> {
        match parse_user_id(id) {
            Some(oid) => self.users.find_one(doc! { "_id": oid }).await,
            None => Ok(None),
        }
    }

    async fn get_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>> {
        self.progress.find_one(key.filter()).await
    }

    async fn apply_progress(
        &self,
        key: &ProgressKey,
        percentage: f64,
        time_spent_delta: i64,
    ) -> Result<ProgressTransition> {
        let now = Utc::now();
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .build();

        let mut attempt = 0;
        let before = loop {
            attempt += 1;
            let pipeline =
                progress_pipeline(key, percentage, time_spent_delta, now.timestamp_millis());
            match self
                .progress
                .find_one_and_update(key.filter(), pipeline, options.clone())
                .await
            {
                Ok(before) => break before,
                // Two upserts raced on a fresh key; the loser retries as an update
                Err(e) if is_duplicate_key(&e) && attempt == 1 => {
                    debug!(
                        user_id = %key.user_id,
                        course_id = %key.course_id,
                        "progress upsert raced, retrying"
                    );
                }
                Err(e) => {
                    return Err(PlatformError::Store(format!("Progress update failed: {}", e)));
                }
            }
        };

        // Replay the same fold on the pre-image to get this update's post-image
        let previous = before.as_ref().map(|r| r.status);
        let mut record = before.unwrap_or_else(|| ProgressRecord::new(key, now));
        record.apply(percentage, time_spent_delta, now)?;

        Ok(ProgressTransition { previous, record })
    }

    async fn add_enrolled_package(&self, user_id: &str, package_id: &str) -> Result<Membership> {
        let Some(oid) = parse_user_id(user_id) else {
            return Ok(Membership::UserMissing);
        };

        let result = self
            .users
            .update_one(
                doc! { "_id": oid, "enrolledPackages": { "$ne": package_id } },
                doc! {
                    "$addToSet": { "enrolledPackages": package_id },
                    "$set": { "metadata.updatedAt": Utc::now().timestamp_millis() },
                },
            )
            .await?;

        if result.modified_count > 0 {
            return Ok(Membership::Added);
        }

        // No match: either already a member or the user is gone
        let exists = self.users.count(doc! { "_id": oid }).await? > 0;
        Ok(if exists {
            Membership::AlreadyMember
        } else {
            Membership::UserMissing
        })
    }

    async fn increment_package_enrollments(&self, package_id: &str) -> Result<bool> {
        increment(&self.packages, doc! { "id": package_id }, "analytics.enrollments").await
    }

    async fn increment_course_completions(&self, course_id: &str) -> Result<bool> {
        increment(&self.courses, doc! { "id": course_id }, "analytics.completions").await
    }

    async fn increment_courses_completed(&self, user_id: &str) -> Result<bool> {
        let Some(oid) = parse_user_id(user_id) else {
            return Ok(false);
        };
        increment(&self.users, doc! { "_id": oid }, "progress.totalCoursesCompleted").await
    }

    async fn view_course(&self, id: &str) -> Result<Option<Course>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.courses
            .find_one_and_update(
                doc! { "id": id },
                doc! { "$inc": { "analytics.views": 1_i64 } },
                options,
            )
            .await
            .map_err(|e| PlatformError::Store(format!("View update failed: {}", e)))
    }

    async fn view_package(&self, id: &str) -> Result<Option<Package>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.packages
            .find_one_and_update(
                doc! { "id": id, "isActive": true },
                doc! { "$inc": { "analytics.views": 1_i64 } },
                options,
            )
            .await
            .map_err(|e| PlatformError::Store(format!("View update failed: {}", e)))
    }
}

/// Split a catalog document into seedable fields and counters.
///
/// Descriptive fields are overwritten on every seed; analytics and the
/// creation time are written only when the document is first inserted.
fn seed_update(mut document: Document) -> Document {
    let now_ms = Utc::now().timestamp_millis();
    let analytics = document
        .remove("analytics")
        .unwrap_or_else(|| Bson::Document(Document::new()));
    document.remove("metadata");
    document.insert("metadata.updatedAt", now_ms);

    doc! {
        "$set": document,
        "$setOnInsert": {
            "analytics": analytics,
            "metadata.createdAt": now_ms,
        },
    }
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Course>, u64)> {
        let query = filter.to_document();
        let total = self.courses.count(query.clone()).await?;
        let courses = self
            .courses
            .find_page(query, popularity_sort(), page.skip(), i64::from(page.limit))
            .await?;
        Ok((courses, total))
    }

    async fn count_courses(&self, filter: &CourseFilter) -> Result<u64> {
        self.courses.count(filter.to_document()).await
    }

    async fn list_packages(
        &self,
        filter: &PackageFilter,
        page: PageRequest,
    ) -> Result<(Vec<Package>, u64)> {
        let query = filter.to_document();
        let total = self.packages.count(query.clone()).await?;
        let packages = self
            .packages
            .find_page(query, popularity_sort(), page.skip(), i64::from(page.limit))
            .await?;
        Ok((packages, total))
    }

    async fn count_packages(&self, filter: &PackageFilter) -> Result<u64> {
        self.packages.count(filter.to_document()).await
    }

    async fn upsert_course(&self, course: Course) -> Result<()> {
        let id = course.id.clone();
        let update = seed_update(bson::to_document(&course)?);
        self.courses
            .inner()
            .update_one(doc! { "id": &id }, update)
            .upsert(true)
            .await
            .map_err(|e| PlatformError::Store(format!("Seeding course {} failed: {}", id, e)))?;
        Ok(())
    }

    async fn upsert_package(&self, package: Package) -> Result<()> {
        let id = package.id.clone();
        let update = seed_update(bson::to_document(&package)?);
        self.packages
            .inner()
            .update_one(doc! { "id": &id }, update)
            .upsert(true)
            .await
            .map_err(|e| PlatformError::Store(format!("Seeding package {} failed: {}", id, e)))?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MongoStore {
    async fn insert_user(&self, user: UserDoc) -> Result<UserDoc> {
        let inserted = self.users.insert_one(user).await?;
        let Bson::ObjectId(oid) = inserted else {
            return Err(PlatformError::Internal(format!(
                "Unexpected inserted id: {}",
                inserted
            )));
        };
        self.users
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| PlatformError::Internal("Inserted user not readable".into()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "firebaseUid": uid }).await
    }

    async fn save_profile(&self, profile: &UserDoc) -> Result<Option<UserDoc>> {
        let Some(oid) = profile._id else {
            return Ok(None);
        };

        let mut set = doc! {
            "name": &profile.name,
            "phone": bson::to_bson(&profile.phone)?,
            "ageGroup": bson::to_bson(&profile.age_group)?,
            "userType": &profile.user_type,
            "metadata.updatedAt": Utc::now().timestamp_millis(),
        };
        // An external id is only ever attached, never replaced
        let mut filter = doc! { "_id": oid };
        if let Some(ref uid) = profile.firebase_uid {
            set.insert("firebaseUid", uid);
            filter.insert(
                "$or",
                vec![
                    doc! { "firebaseUid": { "$exists": false } },
                    doc! { "firebaseUid": uid },
                ],
            );
        }

        match self
            .users
            .inner()
            .update_one(filter, doc! { "$set": set })
            .await
        {
            Ok(_) => {}
            Err(e) if is_duplicate_key(&e) => {
                return Err(PlatformError::Conflict(
                    "External id already linked to another user".into(),
                ));
            }
            Err(e) => {
                warn!("Profile update failed for {}: {}", oid, e);
                return Err(PlatformError::Store(format!("Profile update failed: {}", e)));
            }
        }

        self.users.find_one(doc! { "_id": oid }).await
    }

    async fn count_active_users(&self) -> Result<u64> {
        self.users.count(doc! { "isActive": true }).await
    }
}

impl Store for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_sets_completed_at_only_on_completion() {
        let key = ProgressKey::new("u1", "c1");

        let partial = progress_pipeline(&key, 50.0, 10, 1_000);
        let set = partial[0].get_document("$set").unwrap();
        assert!(!set.contains_key("completedAt"));

        let done = progress_pipeline(&key, 100.0, 10, 1_000);
        let set = done[0].get_document("$set").unwrap();
        assert!(set.contains_key("completedAt"));
        assert_eq!(set.get_f64("progressPercentage").unwrap(), 100.0);
    }

    #[test]
    fn test_pipeline_keys_are_literal() {
        let key = ProgressKey::new("$user", "c1");
        let pipeline = progress_pipeline(&key, 10.0, 0, 1_000);
        let set = pipeline[0].get_document("$set").unwrap();
        let user = set.get_document("userId").unwrap();
        assert_eq!(user.get_str("$literal").unwrap(), "$user");
    }

    #[test]
    fn test_pipeline_time_sum_stays_in_long_range() {
        let key = ProgressKey::new("u1", "c1");
        let pipeline = progress_pipeline(&key, 10.0, 3_600, 1_000);
        let set = pipeline[0].get_document("$set").unwrap();
        let guard = set
            .get_document("timeSpent")
            .unwrap()
            .get_array("$cond")
            .unwrap();
        let bound = guard[0]
            .as_document()
            .unwrap()
            .get_array("$gt")
            .unwrap();
        assert_eq!(bound[1].as_i64(), Some(i64::MAX - 3_600));
    }

    #[test]
    fn test_seed_update_protects_counters() {
        let course = Course {
            id: "abc".into(),
            title: "ABC".into(),
            ..Course::default()
        };
        let update = seed_update(bson::to_document(&course).unwrap());

        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("analytics"));
        assert!(!set.contains_key("metadata"));
        assert_eq!(set.get_str("title").unwrap(), "ABC");

        let on_insert = update.get_document("$setOnInsert").unwrap();
        assert!(on_insert.contains_key("analytics"));
        assert!(on_insert.contains_key("metadata.createdAt"));
    }

    #[test]
    fn test_malformed_user_id_never_matches() {
        assert!(parse_user_id("not-an-object-id").is_none());
        assert!(parse_user_id(&ObjectId::new().to_hex()).is_some());
    }
}
