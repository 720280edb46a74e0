//! Course and category routes
//!
//! - GET /courses            - filtered, paginated listing
//! - GET /courses/popular    - top courses by enrollments
//! - GET /courses/:id        - single course, counts a view
//! - GET /videolib/:id       - alias of /courses/:id
//! - GET /categories         - age-group categories with live counts
//! - GET /categories/:group  - one category and its courses

use crate::server::AppState;
use crate::store::CourseFilter;
use crate::types::Result;

use super::response::{ok, HttpResponse, QueryParams};

pub async fn handle_list_courses(state: &AppState, query: &QueryParams) -> Result<HttpResponse> {
    let filter = CourseFilter {
        age_group: query.get("ageGroup"),
        category: query.get("category"),
        difficulty: query.get("difficulty"),
        search: query.get("search"),
    };
    let page = state
        .catalog
        .page_request(query.parse_as("page")?, query.parse_as("limit")?);

    ok(&state.catalog.list_courses(&filter, page).await?)
}

pub async fn handle_popular_courses(state: &AppState, query: &QueryParams) -> Result<HttpResponse> {
    ok(&state.catalog.popular_courses(query.parse_as("limit")?).await?)
}

pub async fn handle_get_course(state: &AppState, id: &str) -> Result<HttpResponse> {
    ok(&state.engine.view_course(id).await?)
}

pub async fn handle_categories(state: &AppState) -> Result<HttpResponse> {
    ok(&state.catalog.categories().await?)
}

pub async fn handle_category(state: &AppState, age_group: &str) -> Result<HttpResponse> {
    ok(&state.catalog.category(age_group).await?)
}
