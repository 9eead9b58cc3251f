//! Gemini-backed route optimizer
//!
//! All sequencing judgment is delegated to the model; this side only builds
//! the prompt and reads back a JSON array of ids.

use super::RouteOptimizer;
use crate::error::AppError;
use crate::gemini::json::{parse_json_array, value_as_id};
use crate::gemini::{call_gemini_api, GeminiConfig};
use crate::state::Stop;
use async_trait::async_trait;
use serde_json::json;

/// Optimizer that asks Gemini for the delivery order
#[derive(Debug, Clone)]
pub struct GeminiRouteOptimizer {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiRouteOptimizer {
    /// Create an optimizer using a shared HTTP client
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl RouteOptimizer for GeminiRouteOptimizer {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn propose_order(
        &self,
        start: &Stop,
        deliveries: &[Stop],
    ) -> Result<Vec<String>, AppError> {
        let prompt = build_route_prompt(start, deliveries);
        let reply = call_gemini_api(&self.client, &self.config, &prompt, None, true).await?;
        parse_order(&reply)
    }
}

/// Read the id order out of a model reply
///
/// Elements that are neither strings nor numbers are skipped.
pub fn parse_order(reply: &str) -> Result<Vec<String>, AppError> {
    let items = parse_json_array(reply)?;
    Ok(items.iter().filter_map(value_as_id).collect())
}

fn build_route_prompt(start: &Stop, deliveries: &[Stop]) -> String {
    let start_json = json!({
        "id": start.id,
        "address": start.address,
        "name": start.name,
    });
    let deliveries_json: Vec<_> = deliveries
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "address": s.address,
                "name": s.name,
                "note": s.note,
            })
        })
        .collect();

    format!(
        r#"You are a logistics route optimization expert.
I have a start point and a list of delivery stops.
Reorder the delivery stops into the most efficient driving route beginning at the start point.

Start Point: {}

Delivery Stops (to be reordered):
{}

Consider driving distance and logic.
Return ONLY a valid JSON array of strings, where each string is the "id" of a delivery stop in the optimized order.
Do NOT include the start point in the returned array.
Do NOT include markdown formatting (like ```json). Just the raw JSON array."#,
        start_json,
        serde_json::Value::Array(deliveries_json)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    #[test]
    fn test_parse_order_mixed_ids() {
        let order = parse_order("```json\n[\"b\", 1712345678901, null, \"a\"]\n```").unwrap();
        assert_eq!(order, vec!["b", "1712345678901", "a"]);
    }

    #[test]
    fn test_parse_order_rejects_non_array() {
        assert!(matches!(
            parse_order(r#"{"order": []}"#),
            Err(AppError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_order("I could not determine a route."),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_prompt_embeds_stops() {
        let start = Stop::start("新北市板橋區金門街215巷78-5號", "TilePark 本社", "");
        let delivery = Stop::delivery("新竹縣竹北市新溪街18號", "鼎晨磁磚", "樣品 5件");
        let prompt = build_route_prompt(&start, std::slice::from_ref(&delivery));

        assert!(prompt.contains("\"id\":\"start\""));
        assert!(prompt.contains(delivery.id.as_str()));
        assert!(prompt.contains("鼎晨磁磚"));
        assert!(prompt.contains("Do NOT include the start point"));
    }

    #[tokio::test]
    #[serial]
    async fn test_propose_order_via_gemini() {
        let mut server = Server::new_async().await;
        let start = Stop::start("Depot", "HQ", "");
        let a = Stop::delivery("A", "a", "");
        let b = Stop::delivery("B", "b", "");
        let reply = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": format!("[\"{}\", \"{}\"]", b.id, a.id)}]}
            }]
        });
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("delivery stops".to_string()))
            .with_status(200)
            .with_body(reply.to_string())
            .create_async()
            .await;

        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            api_base_url: server.url(),
            ..Default::default()
        };
        let optimizer = GeminiRouteOptimizer::new(reqwest::Client::new(), config);
        let order = optimizer.propose_order(&start, &[a.clone(), b.clone()]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(order, vec![b.id.to_string(), a.id.to_string()]);
    }
}
