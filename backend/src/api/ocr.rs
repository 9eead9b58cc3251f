//! Delivery slip OCR API handlers
//!
//! Accepts a slip photo as multipart form data, stages the candidates
//! Gemini reads off it, and lets the driver commit or discard them.

use super::utils::{MessageResponse, StopsResponse};
use crate::error::AppError;
use crate::gemini::ImageInput;
use crate::ocr::{extract_candidates, OcrCandidate};
use crate::state::{Operation, SharedState, Stop};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// MIME type assumed when the upload does not declare one
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Staged candidates response
#[derive(Debug, Serialize)]
pub struct StagedResponse {
    /// Candidates waiting for confirmation
    pub candidates: Vec<OcrCandidate>,
    /// Number of candidates
    pub count: usize,
}

impl StagedResponse {
    fn new(candidates: Vec<OcrCandidate>) -> Self {
        Self {
            count: candidates.len(),
            candidates,
        }
    }
}

/// Commit request
#[derive(Debug, Default, Deserialize)]
pub struct CommitRequest {
    /// Edited candidates to commit instead of the staged ones
    #[serde(default)]
    pub candidates: Option<Vec<OcrCandidate>>,
}

/// Commit response
#[derive(Debug, Serialize)]
pub struct CommitResponse {
    /// Stops appended to the route
    pub added: Vec<Stop>,
    /// The route after the commit
    #[serde(flatten)]
    pub route: StopsResponse,
}

/// Read the slip image out of the multipart form
///
/// Accepts the file under `image` (or `images`/`file`); other fields are
/// ignored.
async fn read_image(multipart: &mut Multipart) -> Result<ImageInput, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {}", e);
        AppError::Validation(format!("Invalid multipart body: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" | "images" | "file" => {
                let mime_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
                    .unwrap_or(DEFAULT_IMAGE_MIME)
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    error!("Failed to read image data: {}", e);
                    AppError::Validation(format!("Failed to read image data: {}", e))
                })?;

                info!(mime_type = %mime_type, bytes = data.len(), "Received slip image");
                return Ok(ImageInput {
                    mime_type,
                    bytes: data.to_vec(),
                });
            }
            _ => {
                warn!("Unknown multipart field: {}", field_name);
            }
        }
    }

    Err(AppError::Validation(
        "Multipart body has no image field".to_string(),
    ))
}

/// POST /api/ocr - Read deliveries off a slip photo into the staging area
///
/// Replaces any previously staged candidates. Nothing touches the route
/// until the candidates are committed.
pub async fn upload_slip(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<StagedResponse>, AppError> {
    let image = read_image(&mut multipart).await?;

    let (client, gemini) = {
        let mut guard = state.write().await;
        if !guard.try_begin(Operation::Ocr) {
            return Err(AppError::Busy(format!(
                "{} is already running",
                Operation::Ocr.label()
            )));
        }
        (guard.http_client.clone(), guard.gemini.clone())
    };

    // Detached so a dropped connection cannot leave the in-flight flag set
    let shared = state.clone();
    let task = tokio::spawn(async move {
        let result = extract_candidates(&client, &gemini, &image).await;

        let mut state = shared.write().await;
        state.finish(Operation::Ocr);
        let candidates = result?;
        state.stage_candidates(candidates.clone());
        Ok::<_, AppError>(candidates)
    });

    let candidates = task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("OCR task failed: {}", e)))??;
    Ok(Json(StagedResponse::new(candidates)))
}

/// GET /api/ocr/staged - Candidates waiting for confirmation
pub async fn get_staged(State(state): State<SharedState>) -> Json<StagedResponse> {
    let state = state.read().await;
    Json(StagedResponse::new(state.staged().to_vec()))
}

/// POST /api/ocr/commit - Append candidates to the route
///
/// Commits the candidates in the body when given (the driver may have
/// corrected them), otherwise the staged ones. Clears the staging area.
pub async fn commit_staged(
    State(state): State<SharedState>,
    request: Option<Json<CommitRequest>>,
) -> Result<Json<CommitResponse>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let mut state = state.write().await;
    if request.candidates.is_none() && state.staged().is_empty() {
        return Err(AppError::Validation(
            "There are no staged candidates to commit".to_string(),
        ));
    }

    let added = state.commit_candidates(request.candidates);
    info!(added = added.len(), "Committed slip candidates");

    Ok(Json(CommitResponse {
        added,
        route: StopsResponse::from_state(&state),
    }))
}

/// DELETE /api/ocr/staged - Drop the staged candidates
pub async fn discard_staged(State(state): State<SharedState>) -> Json<MessageResponse> {
    let mut state = state.write().await;
    let discarded = state.discard_candidates();
    Json(MessageResponse::ok(format!(
        "Discarded {} candidate(s)",
        discarded
    )))
}
