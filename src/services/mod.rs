//! Services layer for signlearn
//!
//! Business logic that sits between the HTTP routes and the record store.
//!
//! ## Services
//!
//! - **Catalog**: course and package listings, categories, dashboard
//! - **Accounts**: registration, login and profile upsert

pub mod accounts;
pub mod catalog;

pub use accounts::{normalize_email, AccountService, LoginRequest, ProfileUpsert, RegisterRequest};
pub use catalog::{
    find_category, CatalogService, Category, CategoryDetail, CategorySummary, CourseListing,
    Dashboard, DashboardStats, PackageListing, Pagination, CATEGORIES,
};
