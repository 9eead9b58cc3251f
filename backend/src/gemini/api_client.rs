//! Gemini API client
//!
//! Direct HTTP client for calling the Gemini `generateContent` endpoint.
//! Used by slip OCR (text + image) and by the route optimizer (text only).

use crate::error::AppError;
use crate::gemini::config::GeminiConfig;
use crate::gemini::types::{
    GeminiApiRequest, GeminiApiResponse, GenerationConfig, InlineData, RequestContent,
    RequestPart,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Header carrying the API key, kept out of the URL
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Image payload attached to a prompt
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// Call Gemini API with a prompt and an optional image
///
/// # Arguments
/// * `client` - Shared HTTP client (connection pooling)
/// * `config` - API key, model and base URL
/// * `prompt` - The instruction prompt
/// * `image` - Optional image sent as inline data after the prompt
/// * `force_json` - If true, request JSON response format
///
/// # Returns
/// * `Ok(String)` - The text content from the first candidate
/// * `Err(AppError)` - If the key is missing, the request fails or the
///   response envelope is unusable
///
/// # Errors
/// * `AppError::Unavailable` when no API key is configured
/// * `AppError::Transport` for network failures and non-2xx statuses
/// * `AppError::MalformedResponse` for unparsable, blocked or empty replies
pub async fn call_gemini_api(
    client: &reqwest::Client,
    config: &GeminiConfig,
    prompt: &str,
    image: Option<&ImageInput>,
    force_json: bool,
) -> Result<String, AppError> {
    let api_key = match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => {
            return Err(AppError::Unavailable(
                "GEMINI_API_KEY is not set or is empty. Please set it to use the Gemini API."
                    .to_string(),
            ))
        }
    };

    let url = format!(
        "{}/models/{}:generateContent",
        config.api_base_url.trim_end_matches('/'),
        config.model
    );

    let request_body = build_request(prompt, image, force_json);

    tracing::debug!(
        model = %config.model,
        force_json = force_json,
        prompt_len = prompt.len(),
        image_bytes = image.map(|i| i.bytes.len()).unwrap_or(0),
        "Calling Gemini API"
    );

    let response = client
        .post(&url)
        .header(API_KEY_HEADER, api_key)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| {
            AppError::Transport(format!(
                "Failed to send HTTP request to Gemini API: {}",
                e.without_url()
            ))
        })?;

    // Check HTTP status
    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        tracing::error!(
            status_code = status_code,
            error_body = %error_body,
            "Gemini API returned error status"
        );

        if status_code == 429 {
            return Err(AppError::Transport(format!(
                "Gemini API rate limit exceeded (HTTP {}): {}",
                status_code, error_body
            )));
        }

        return Err(AppError::Transport(format!(
            "Gemini API returned error status {}: {}",
            status_code, error_body
        )));
    }

    let response_body = response.text().await.map_err(|e| {
        AppError::Transport(format!(
            "Failed to read response body from Gemini API: {}",
            e.without_url()
        ))
    })?;

    extract_text(&response_body)
}

/// Build the request payload: prompt first, then the image if any
fn build_request(prompt: &str, image: Option<&ImageInput>, force_json: bool) -> GeminiApiRequest {
    let mut parts = vec![RequestPart::Text {
        text: prompt.to_string(),
    }];
    if let Some(image) = image {
        parts.push(RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.bytes),
            },
        });
    }

    let generation_config = force_json.then(|| GenerationConfig {
        response_mime_type: Some("application/json".to_string()),
    });

    GeminiApiRequest {
        contents: vec![RequestContent { parts }],
        generation_config,
    }
}

/// Pull the candidate text out of a raw response body
fn extract_text(response_body: &str) -> Result<String, AppError> {
    let parsed: GeminiApiResponse = serde_json::from_str(response_body).map_err(|e| {
        AppError::MalformedResponse(format!(
            "Failed to parse JSON response from Gemini API: {} - Response body: {}",
            e, response_body
        ))
    })?;

    // Check for blocked prompt
    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_ref())
    {
        return Err(AppError::MalformedResponse(format!(
            "Gemini API blocked the prompt: {}",
            reason
        )));
    }

    let candidate = parsed.candidates.first().ok_or_else(|| {
        AppError::MalformedResponse("Gemini API response contains no candidates".to_string())
    })?;

    let text: String = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(AppError::MalformedResponse(format!(
            "Gemini API response text is empty (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    tracing::debug!(
        response_len = text.len(),
        "Successfully received response from Gemini API"
    );

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn test_config(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            api_base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_call_gemini_api_missing_api_key() {
        let client = reqwest::Client::new();
        let result =
            call_gemini_api(&client, &GeminiConfig::default(), "test prompt", None, false).await;
        let error = result.unwrap_err();
        assert!(matches!(error, AppError::Unavailable(_)));
        assert!(error.to_string().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    #[serial]
    async fn test_call_gemini_api_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "[\"a\", "}, {"text": "\"b\"]"}],
                            "role": "model"
                        },
                        "finishReason": "STOP"
                    }]
                }"#,
            )
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result = call_gemini_api(
            &client,
            &test_config(&server.url()),
            "test prompt",
            None,
            true,
        )
        .await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), r#"["a", "b"]"#);
    }

    #[tokio::test]
    #[serial]
    async fn test_call_gemini_api_sends_inline_image() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{
                    "parts": [
                        {"text": "read the slip"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                }],
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "[]"}]}}]}"#)
            .create_async()
            .await;

        let image = ImageInput {
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let client = reqwest::Client::new();
        let result = call_gemini_api(
            &client,
            &test_config(&server.url()),
            "read the slip",
            Some(&image),
            true,
        )
        .await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "[]");
    }

    #[tokio::test]
    #[serial]
    async fn test_call_gemini_api_empty_candidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result =
            call_gemini_api(&client, &test_config(&server.url()), "p", None, false).await;

        mock.assert_async().await;
        let error = result.unwrap_err();
        assert!(matches!(error, AppError::MalformedResponse(_)));
        assert!(error.to_string().contains("no candidates"));
    }

    #[tokio::test]
    #[serial]
    async fn test_call_gemini_api_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result =
            call_gemini_api(&client, &test_config(&server.url()), "p", None, false).await;

        mock.assert_async().await;
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("blocked the prompt"),
            "Error message should contain 'blocked the prompt', got: {}",
            error_msg
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_call_gemini_api_rate_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result =
            call_gemini_api(&client, &test_config(&server.url()), "p", None, false).await;

        mock.assert_async().await;
        let error = result.unwrap_err();
        assert!(matches!(error, AppError::Transport(_)));
        assert!(error.to_string().contains("rate limit"));
    }

    #[tokio::test]
    #[serial]
    async fn test_call_gemini_api_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result =
            call_gemini_api(&client, &test_config(&server.url()), "p", None, false).await;

        mock.assert_async().await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse JSON"));
    }

    #[tokio::test]
    async fn test_call_gemini_api_unreachable_host() {
        let client = reqwest::Client::new();
        let result =
            call_gemini_api(&client, &test_config("http://127.0.0.1:9"), "p", None, false).await;
        assert!(matches!(result, Err(AppError::Transport(_))));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_api_key() {
        use axum::response::IntoResponse;

        let config = GeminiConfig {
            api_key: Some("SECRET-KEY-123".to_string()),
            api_base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = reqwest::Client::new();
        let error = call_gemini_api(&client, &config, "p", None, false)
            .await
            .unwrap_err();
        assert!(!error.to_string().contains("SECRET-KEY-123"));

        let response = error.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Transport failure"));
        assert!(!body.contains("SECRET-KEY-123"));
    }
}
