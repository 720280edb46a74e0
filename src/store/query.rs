//! Catalog filters and pagination
//!
//! Each filter knows how to test a document in memory and how to render
//! itself as a MongoDB filter. Both paths must select the same documents.

use bson::{doc, Document};

use crate::db::schemas::{Course, Package};

/// Page window requested by a client, already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Number of pages needed for `total` items
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

/// Filters for course listing. Only published courses are ever listed.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub age_group: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
}

impl CourseFilter {
    pub fn for_age_group(age_group: &str) -> Self {
        Self {
            age_group: Some(age_group.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, course: &Course) -> bool {
        course.is_published
            && eq_opt(&self.age_group, &course.age_group)
            && eq_opt(&self.category, &course.category)
            && eq_opt(&self.difficulty, &course.difficulty)
            && self
                .search
                .as_deref()
                .map_or(true, |s| text_matches(s, &course.title, &course.description, &course.tags))
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! { "isPublished": true };
        if let Some(ref age_group) = self.age_group {
            filter.insert("ageGroup", age_group);
        }
        if let Some(ref category) = self.category {
            filter.insert("category", category);
        }
        if let Some(ref difficulty) = self.difficulty {
            filter.insert("difficulty", difficulty);
        }
        if let Some(ref search) = self.search {
            filter.insert("$or", search_clauses(search));
        }
        filter
    }
}

/// Filters for package listing. Only active packages are ever listed.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    /// Must be one of the package's age groups
    pub age_group: Option<String>,
    pub target_audience: Option<String>,
    /// `Some(true)` keeps only packages flagged popular
    pub popular: Option<bool>,
    pub search: Option<String>,
}

impl PackageFilter {
    pub fn matches(&self, package: &Package) -> bool {
        package.is_active
            && self
                .age_group
                .as_ref()
                .map_or(true, |g| package.age_groups.iter().any(|a| a == g))
            && eq_opt(&self.target_audience, &package.target_audience)
            && (self.popular != Some(true) || package.popular)
            && self.search.as_deref().map_or(true, |s| {
                text_matches(s, &package.title, &package.description, &package.tags)
            })
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! { "isActive": true };
        if let Some(ref age_group) = self.age_group {
            // Array field: equality matches membership
            filter.insert("ageGroups", age_group);
        }
        if let Some(ref audience) = self.target_audience {
            filter.insert("targetAudience", audience);
        }
        if self.popular == Some(true) {
            filter.insert("popular", true);
        }
        if let Some(ref search) = self.search {
            filter.insert("$or", search_clauses(search));
        }
        filter
    }
}

/// Catalog sort: most enrolled first, newest first among ties
pub fn popularity_sort() -> Document {
    doc! { "analytics.enrollments": -1, "metadata.createdAt": -1 }
}

fn eq_opt(wanted: &Option<String>, actual: &str) -> bool {
    wanted.as_deref().map_or(true, |w| w == actual)
}

/// Case-insensitive literal substring match over title, description and tags
pub fn text_matches(needle: &str, title: &str, description: &str, tags: &[String]) -> bool {
    let needle = needle.to_lowercase();
    title.to_lowercase().contains(&needle)
        || description.to_lowercase().contains(&needle)
        || tags.iter().any(|t| t.to_lowercase().contains(&needle))
}

fn search_clauses(search: &str) -> Vec<Document> {
    let pattern = escape_regex(search);
    vec![
        doc! { "title": { "$regex": &pattern, "$options": "i" } },
        doc! { "description": { "$regex": &pattern, "$options": "i" } },
        doc! { "tags": { "$regex": &pattern, "$options": "i" } },
    ]
}

/// Escape regex metacharacters so user input matches literally
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
