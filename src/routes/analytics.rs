//! GET /analytics/dashboard

use crate::server::AppState;
use crate::types::Result;

use super::response::{ok, HttpResponse};

pub async fn handle_dashboard(state: &AppState) -> Result<HttpResponse> {
    ok(&state.catalog.dashboard().await?)
}
