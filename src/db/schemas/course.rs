//! Course document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{default_true, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};

/// Collection name for courses
pub const COURSE_COLLECTION: &str = "courses";

/// Denormalized counters kept on every course
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CourseAnalytics {
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub enrollments: i64,
    #[serde(default)]
    pub completions: i64,
}

/// Course document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Catalog identifier (unique, assigned at seeding)
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Age group key, e.g. "1-4", "5-10", "15+"
    pub age_group: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub difficulty: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default = "default_true")]
    pub is_published: bool,

    #[serde(default)]
    pub analytics: CourseAnalytics,

    #[serde(default)]
    pub metadata: Metadata,
}

impl IntoIndexes for Course {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("course_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "isPublished": 1, "ageGroup": 1 },
                Some(
                    IndexOptions::builder()
                        .name("published_age_group".to_string())
                        .build(),
                ),
            ),
            // Catalog sort order
            (
                doc! { "analytics.enrollments": -1, "metadata.createdAt": -1 },
                Some(
                    IndexOptions::builder()
                        .name("popularity".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for Course {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
