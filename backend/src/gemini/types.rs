//! Gemini API wire types
//!
//! Structs that mirror the `generateContent` JSON request and response.
//! Responses use camelCase; snake_case aliases are accepted as well.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiResponse {
    /// List of candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A single candidate response from the model
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of this candidate
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating (if applicable)
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

/// Content structure containing parts of the response
#[derive(Deserialize, Debug)]
pub struct Content {
    /// List of content parts (typically one text part)
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of content
#[derive(Deserialize, Debug)]
pub struct Part {
    /// The text content of this part, absent for non-text parts
    #[serde(default)]
    pub text: Option<String>,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// Request structure for Gemini API
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiRequest {
    /// List of content items to send
    pub contents: Vec<RequestContent>,
    /// Optional generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content structure for requests
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// List of content parts
    pub parts: Vec<RequestPart>,
}

/// A single request part: text or inline binary data
#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum RequestPart {
    /// Plain text
    Text {
        /// The text content
        text: String,
    },
    /// Base64 encoded binary payload (images)
    InlineData {
        /// The inline payload
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Inline binary payload
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the payload, e.g. `image/jpeg`
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

/// Generation configuration for requests
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// MIME type to force for response (e.g., "application/json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiApiRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: "read this".to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "read this");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_response_accepts_both_casings() {
        let camel = r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#;
        let snake = r#"{"candidates": [], "prompt_feedback": {"block_reason": "SAFETY"}}"#;
        for body in [camel, snake] {
            let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
            let reason = parsed.prompt_feedback.and_then(|f| f.block_reason);
            assert_eq!(reason.as_deref(), Some("SAFETY"));
        }
    }
}
