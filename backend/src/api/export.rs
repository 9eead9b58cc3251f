//! Export API handlers
//!
//! Navigation deep link and plain-text itinerary for the current route.

use crate::error::AppError;
use crate::export::{build_navigation_url, format_plain_text, NavigationLink};
use crate::state::SharedState;
use axum::{extract::State, response::Json};

/// GET /api/export/navigation - Google Maps directions link
pub async fn navigation_link(
    State(state): State<SharedState>,
) -> Result<Json<NavigationLink>, AppError> {
    let state = state.read().await;
    let link = build_navigation_url(state.route().stops())?;
    Ok(Json(link))
}

/// GET /api/export/text - Plain-text itinerary
pub async fn plain_text(State(state): State<SharedState>) -> String {
    let state = state.read().await;
    format_plain_text(state.route().stops(), state.departure_time())
}
