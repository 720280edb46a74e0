//! Catalog seeding from a JSON file
//!
//! The seed document is `{ "courses": [...], "packages": [...] }` with
//! camelCase course and package documents. Entries are upserted by `id`,
//! so re-running a seed refreshes descriptive fields and leaves analytics
//! counters alone.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::db::schemas::{Course, Package};
use crate::store::CatalogStore;
use crate::types::{PlatformError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Counts of upserted documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub courses: usize,
    pub packages: usize,
}

impl CatalogSeed {
    pub fn from_json(json: &str) -> Result<Self> {
        let seed: Self = serde_json::from_str(json)?;
        seed.check_ids()?;
        Ok(seed)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    fn check_ids(&self) -> Result<()> {
        let blank_course = self.courses.iter().any(|c| c.id.trim().is_empty());
        let blank_package = self.packages.iter().any(|p| p.id.trim().is_empty());
        if blank_course || blank_package {
            return Err(PlatformError::Validation(
                "Every seeded course and package needs an id".into(),
            ));
        }
        Ok(())
    }

    /// Upsert every entry into the store
    pub async fn apply<S: CatalogStore + ?Sized>(self, store: &S) -> Result<SeedReport> {
        let report = SeedReport {
            courses: self.courses.len(),
            packages: self.packages.len(),
        };

        for course in self.courses {
            store.upsert_course(course).await?;
        }
        for package in self.packages {
            store.upsert_package(package).await?;
        }

        info!(
            courses = report.courses,
            packages = report.packages,
            "catalog seeded"
        );
        Ok(report)
    }
}
