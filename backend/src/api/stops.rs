//! Stop management API handlers
//!
//! CRUD over the route's stops plus manual reordering.

use super::utils::{validate_address, validate_detail, MessageResponse, StopsResponse};
use crate::error::AppError;
use crate::state::{ReorderSummary, SharedState, Stop, StopId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Create stop request
#[derive(Debug, Deserialize)]
pub struct CreateStopRequest {
    /// Free-text address of the delivery
    pub address: String,
}

/// Update stop request
#[derive(Debug, Deserialize)]
pub struct UpdateStopRequest {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-text note
    #[serde(default)]
    pub note: String,
}

/// Reorder request
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Desired delivery order; strings or numbers
    pub ids: Vec<StopId>,
}

/// Reorder response
#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    /// What happened to the requested sequence
    pub summary: ReorderSummary,
    /// Stops in their new order
    pub stops: Vec<Stop>,
}

/// GET /api/stops - List the route
pub async fn list_stops(State(state): State<SharedState>) -> Json<StopsResponse> {
    let state = state.read().await;
    Json(StopsResponse::from_state(&state))
}

/// POST /api/stops - Add a delivery stop
pub async fn create_stop(
    State(state): State<SharedState>,
    Json(request): Json<CreateStopRequest>,
) -> Result<(StatusCode, Json<Stop>), AppError> {
    validate_address(&request.address)?;

    let mut state = state.write().await;
    let stop = state
        .add_delivery_stop(&request.address)
        .ok_or_else(|| AppError::Validation("Address cannot be empty".to_string()))?;

    tracing::info!(stop_id = %stop.id, "Added delivery stop");
    Ok((StatusCode::CREATED, Json(stop)))
}

/// PUT /api/stops/:id - Replace a stop's name and note
pub async fn update_stop(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStopRequest>,
) -> Result<Json<Stop>, AppError> {
    validate_detail("Name", &request.name)?;
    validate_detail("Note", &request.note)?;

    let mut state = state.write().await;
    if !state.update_stop_details(&id, &request.name, &request.note) {
        return Err(AppError::StopNotFound(id));
    }

    let stop = state
        .route()
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Stop not found after update")))?;
    Ok(Json(stop))
}

/// DELETE /api/stops/:id - Remove a delivery stop
pub async fn delete_stop(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut state = state.write().await;
    state
        .delete_stop(&id)?
        .ok_or_else(|| AppError::StopNotFound(id.clone()))?;

    tracing::info!(stop_id = %id, "Deleted stop");
    Ok(Json(MessageResponse::ok("Stop deleted successfully")))
}

/// POST /api/stops/:id/toggle - Flip a delivery's completed flag
pub async fn toggle_stop(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Stop>, AppError> {
    let mut state = state.write().await;
    if state.toggle_completed(&id).is_none() {
        return match state.route().get(&id) {
            Some(_) => Err(AppError::Validation(
                "The start stop cannot be marked completed".to_string(),
            )),
            None => Err(AppError::StopNotFound(id)),
        };
    }

    let stop = state
        .route()
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Stop not found after toggle")))?;
    Ok(Json(stop))
}

/// POST /api/stops/reorder - Apply a manual delivery order
///
/// Never fails on unknown or repeated ids: they are ignored and any
/// delivery left out of the request keeps its place after the listed ones.
pub async fn reorder_stops(
    State(state): State<SharedState>,
    Json(request): Json<ReorderRequest>,
) -> Json<ReorderResponse> {
    let mut state = state.write().await;
    let summary = state.reorder(&request.ids);

    tracing::info!(
        placed = summary.placed,
        ignored = summary.ignored,
        appended = summary.appended,
        "Reordered stops"
    );

    Json(ReorderResponse {
        summary,
        stops: state.route().stops().to_vec(),
    })
}
