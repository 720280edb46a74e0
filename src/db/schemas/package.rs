//! Package document schema
//!
//! A package bundles courses for an audience. Enrollment happens at the
//! package level.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::{default_true, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};

/// Collection name for packages
pub const PACKAGE_COLLECTION: &str = "packages";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageAnalytics {
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub enrollments: i64,
}

/// Package document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Age groups this package is offered to
    #[serde(default)]
    pub age_groups: Vec<String>,

    #[serde(default)]
    pub target_audience: String,

    /// Course ids included in the package
    #[serde(default)]
    pub courses: Vec<String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default)]
    pub popular: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub analytics: PackageAnalytics,

    #[serde(default)]
    pub metadata: Metadata,
}

impl IntoIndexes for Package {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("package_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "isActive": 1, "ageGroups": 1 },
                Some(
                    IndexOptions::builder()
                        .name("active_age_groups".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for Package {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
