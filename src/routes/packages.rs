//! Package routes

use crate::server::AppState;
use crate::store::PackageFilter;
use crate::types::{PlatformError, Result};

use super::response::{ok, HttpResponse, QueryParams};

/// GET /packages?ageGroup&targetAudience&popular&search&page&limit - counts one view per returned package
pub async fn handle_list_packages(state: &AppState, query: &QueryParams) -> Result<HttpResponse> {
    let popular = match query.get("popular").as_deref() {
        None => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(_) => {
            return Err(PlatformError::Validation(
                "popular must be true or false".into(),
            ))
        }
    };
    let filter = PackageFilter {
        age_group: query.get("ageGroup"),
        target_audience: query.get("targetAudience"),
        popular,
        search: query.get("search"),
    };
    let page = state
        .catalog
        .page_request(query.parse_as("page")?, query.parse_as("limit")?);

    ok(&state.catalog.list_packages(&filter, page).await?)
}

/// GET /packages/popular?limit
pub async fn handle_popular_packages(state: &AppState, query: &QueryParams) -> Result<HttpResponse> {
    ok(&state.catalog.popular_packages(query.parse_as("limit")?).await?)
}

/// GET /packages/:id - active packages only, counts a view
pub async fn handle_get_package(state: &AppState, id: &str) -> Result<HttpResponse> {
    ok(&state.engine.view_package(id).await?)
}
