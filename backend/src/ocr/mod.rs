//! Delivery slip OCR
//!
//! Sends a photographed delivery slip to Gemini and turns the reply into
//! candidate stops. Candidates are only proposals: they wait in the staging
//! area of `AppState` until the driver commits or discards them.

use crate::error::AppError;
use crate::gemini::json::parse_json_array;
use crate::gemini::{call_gemini_api, GeminiConfig, ImageInput};
use crate::state::Stop;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Address used when the model could not read one
pub const UNKNOWN_ADDRESS: &str = "地址未辨識";
/// Customer name used when the model could not read one
pub const UNKNOWN_CUSTOMER: &str = "未知客戶";

/// Largest accepted slip photo
pub const MAX_IMAGE_BYTES: usize = 7 * 1024 * 1024;

/// One delivery read off a slip, pending confirmation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OcrCandidate {
    /// Postal address, if readable
    #[serde(default)]
    pub address: Option<String>,
    /// Customer or company name, if readable
    #[serde(default, alias = "customerName", alias = "customer_name")]
    pub customer: Option<String>,
    /// Items, quantities and handling instructions
    #[serde(default)]
    pub note: Option<String>,
}

impl OcrCandidate {
    /// Convert into a delivery stop, filling placeholders for missing fields
    pub fn into_stop(self) -> Stop {
        Stop::delivery(
            self.address
                .filter(|a| !a.trim().is_empty())
                .map(|a| a.trim().to_string())
                .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
            self.customer
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string()),
            self.note.unwrap_or_default(),
        )
    }

    /// Read a candidate from one element of the model's array
    ///
    /// Non-object elements yield `None`.
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let field = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| object.get(*key))
                .find_map(text_of)
        };
        Some(Self {
            address: field(&["address"]),
            customer: field(&["customer", "customerName", "customer_name", "name"]),
            note: field(&["note"]),
        })
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract delivery candidates from a slip photo
///
/// # Errors
/// * `AppError::Validation` for an empty or oversized image
/// * `AppError::Unavailable` when no Gemini API key is configured
/// * `AppError::MalformedResponse` if the reply is not a non-empty JSON array
///   of objects
/// * `AppError::Transport` from the Gemini client
pub async fn extract_candidates(
    client: &reqwest::Client,
    config: &GeminiConfig,
    image: &ImageInput,
) -> Result<Vec<OcrCandidate>, AppError> {
    if image.bytes.is_empty() {
        return Err(AppError::Validation("Image upload is empty".to_string()));
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Validation(format!(
            "Image is too large: {} bytes (limit {} bytes)",
            image.bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }

    if !config.is_configured() {
        return Err(AppError::Unavailable(
            "Slip OCR unavailable: GEMINI_API_KEY is not set".to_string(),
        ));
    }

    let reply = call_gemini_api(client, config, SLIP_PROMPT, Some(image), true).await?;
    let candidates = parse_candidates(&reply)?;

    tracing::info!(
        candidates = candidates.len(),
        image_bytes = image.bytes.len(),
        "Extracted delivery candidates from slip"
    );

    Ok(candidates)
}

/// Parse the model reply into candidates
pub fn parse_candidates(reply: &str) -> Result<Vec<OcrCandidate>, AppError> {
    let items = parse_json_array(reply)?;
    let candidates: Vec<OcrCandidate> = items.iter().filter_map(OcrCandidate::from_value).collect();

    if candidates.is_empty() {
        return Err(AppError::MalformedResponse(
            "No deliveries could be read from the slip".to_string(),
        ));
    }

    Ok(candidates)
}

const SLIP_PROMPT: &str = r#"You are reading a photographed delivery slip for a tile distributor.
Extract every delivery listed on the slip.

Return ONLY a valid JSON array. Each element must be an object with these keys:
- "address": the full postal address of the delivery
- "customer": the customer or company name
- "note": items, quantities, payment or handling instructions

Use an empty string for any field you cannot read.
Do NOT include markdown formatting (like ```json). Just the raw JSON array."#;
