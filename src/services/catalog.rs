//! Catalog query service
//!
//! Queries over courses and packages: filtered listings with
//! pagination, popularity rankings, age-group categories and the analytics
//! dashboard. The package listing counts one view per returned package;
//! every other read leaves view counters alone.

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::db::schemas::{Course, Package};
use crate::store::{CatalogStore, CourseFilter, PackageFilter, PageRequest, RecordStore, Store};
use crate::types::{PlatformError, Result};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_POPULAR_COURSES: u32 = 10;
pub const DEFAULT_POPULAR_PACKAGES: u32 = 5;
const DASHBOARD_COURSES: u32 = 5;
const DASHBOARD_PACKAGES: u32 = 3;

// =============================================================================
// Categories
// =============================================================================

/// Static description of an age-group category
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

pub const CATEGORIES: [Category; 3] = [
    Category {
        id: "1-4",
        title: "Early Learners (Ages 1-4)",
        description: "Foundational sign language through play and basic gestures",
        color: "#FF9F4A",
    },
    Category {
        id: "5-10",
        title: "Young Explorers (Ages 5-10)",
        description: "Building vocabulary and simple conversations",
        color: "#4A6FFF",
    },
    Category {
        id: "15+",
        title: "Advanced Learners (Ages 15+)",
        description: "Complex communication and everyday conversations",
        color: "#36B37E",
    },
];

pub fn find_category(age_group: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == age_group)
}

/// Category with its live published-course count
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub course_count: u64,
}

#[derive(Serialize, Debug, Clone)]
pub struct CategoryDetail {
    pub category: Category,
    pub courses: Vec<Course>,
}

// =============================================================================
// Listings
// =============================================================================

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseListing {
    pub courses: Vec<Course>,
    pub pagination: Pagination,
}

#[derive(Serialize, Debug, Clone)]
pub struct PackageListing {
    pub packages: Vec<Package>,
    pub pagination: Pagination,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_courses: u64,
    pub total_packages: u64,
    pub total_users: u64,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub popular_courses: Vec<Course>,
    pub popular_packages: Vec<Package>,
}

// =============================================================================
// Service
// =============================================================================

/// Catalog queries over a shared store handle
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    max_page_limit: u32,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, max_page_limit: u32) -> Self {
        Self {
            store,
            max_page_limit: max_page_limit.max(1),
        }
    }

    /// Clamp client-supplied paging to `1..=max_page_limit`
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, self.max_page_limit);
        PageRequest::new(page.unwrap_or(1), limit)
    }

    fn top_n(&self, limit: Option<u32>, default: u32) -> PageRequest {
        PageRequest::new(1, limit.unwrap_or(default).clamp(1, self.max_page_limit))
    }

    pub async fn list_courses(&self, filter: &CourseFilter, page: PageRequest) -> Result<CourseListing> {
        let (courses, total) = self.store.list_courses(filter, page).await?;
        Ok(CourseListing {
            courses,
            pagination: pagination(page, total),
        })
    }

    pub async fn list_packages(
        &self,
        filter: &PackageFilter,
        page: PageRequest,
    ) -> Result<PackageListing> {
        let (packages, total) = self.store.list_packages(filter, page).await?;
        let packages = join_all(
            packages
                .into_iter()
                .map(|package| self.count_listed_view(package)),
        )
        .await;
        Ok(PackageListing {
            packages,
            pagination: pagination(page, total),
        })
    }

    /// One view per package returned by a listing. Best effort: the listed
    /// snapshot is kept when the increment misses or fails.
    async fn count_listed_view(&self, package: Package) -> Package {
        match self.store.view_package(&package.id).await {
            Ok(Some(viewed)) => viewed,
            Ok(None) => package,
            Err(e) => {
                warn!(package_id = %package.id, error = %e, "listing view not counted");
                package
            }
        }
    }

    pub async fn popular_courses(&self, limit: Option<u32>) -> Result<Vec<Course>> {
        let page = self.top_n(limit, DEFAULT_POPULAR_COURSES);
        let (courses, _) = self
            .store
            .list_courses(&CourseFilter::default(), page)
            .await?;
        Ok(courses)
    }

    pub async fn popular_packages(&self, limit: Option<u32>) -> Result<Vec<Package>> {
        let page = self.top_n(limit, DEFAULT_POPULAR_PACKAGES);
        let (packages, _) = self
            .store
            .list_packages(&PackageFilter::default(), page)
            .await?;
        Ok(packages)
    }

    pub async fn categories(&self) -> Result<Vec<CategorySummary>> {
        try_join_all(CATEGORIES.iter().map(|category| async move {
            let course_count = self
                .store
                .count_courses(&CourseFilter::for_age_group(category.id))
                .await?;
            Ok::<_, PlatformError>(CategorySummary {
                category: *category,
                course_count,
            })
        }))
        .await
    }

    /// Every published course of one age group
    pub async fn category(&self, age_group: &str) -> Result<CategoryDetail> {
        let category = find_category(age_group)
            .ok_or_else(|| PlatformError::NotFound("Invalid age group".into()))?;
        let (courses, _) = self
            .store
            .list_courses(
                &CourseFilter::for_age_group(category.id),
                PageRequest::new(1, u32::MAX),
            )
            .await?;
        Ok(CategoryDetail {
            category: *category,
            courses,
        })
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let course_filter = CourseFilter::default();
        let package_filter = PackageFilter::default();
        let (total_courses, total_packages, total_users, courses, packages) = tokio::try_join!(
            self.store.count_courses(&course_filter),
            self.store.count_packages(&package_filter),
            self.store.count_active_users(),
            self.store
                .list_courses(&course_filter, PageRequest::new(1, DASHBOARD_COURSES)),
            self.store
                .list_packages(&package_filter, PageRequest::new(1, DASHBOARD_PACKAGES)),
        )?;

        Ok(Dashboard {
            stats: DashboardStats {
                total_courses,
                total_packages,
                total_users,
            },
            popular_courses: courses.0,
            popular_packages: packages.0,
        })
    }
}

fn pagination(page: PageRequest, total: u64) -> Pagination {
    Pagination {
        total,
        page: page.page,
        limit: page.limit,
        pages: page.pages(total),
    }
}
