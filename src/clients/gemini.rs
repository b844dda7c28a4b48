//! Google Generative Language REST client.
//!
//! One `generateContent` call per request. Search augmentation maps to the
//! `googleSearch` tool and thinking mode to `generationConfig.thinkingConfig`.
//! Grounding citations are read from `groundingMetadata.groundingChunks`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::clients::traits::{
    GenerationBackend, GenerationRequest, GenerationResponse, Part, Turn, UpstreamError,
};
use crate::config::GenerationConfig;
use crate::models::{ChatRole, GroundingSource};

const UNTITLED_SOURCE: &str = "Untitled Source";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(cfg: &GenerationConfig, api_key: impl Into<String>) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
        if cfg.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(cfg.timeout_ms));
        }
        let client = builder.build().map_err(|e| UpstreamError::Network {
            message: format!("Failed to build HTTP client: {}", e),
        })?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

fn turn_to_json(turn: &Turn) -> Value {
    let role = match turn.role {
        ChatRole::User => "user",
        ChatRole::Model => "model",
    };
    let parts: Vec<Value> = turn
        .parts
        .iter()
        .map(|p| match p {
            Part::Text(text) => json!({ "text": text }),
            Part::InlineData { mime_type, data } => json!({
                "inlineData": { "mimeType": mime_type, "data": data }
            }),
        })
        .collect();
    json!({ "role": role, "parts": parts })
}

/// Build the JSON request body for a generateContent call.
pub fn build_request_body(request: &GenerationRequest) -> Value {
    let contents: Vec<Value> = request.contents.iter().map(turn_to_json).collect();
    let mut body = json!({ "contents": contents });
    if request.use_search {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }
    if let Some(budget) = request.thinking_budget {
        body["generationConfig"] = json!({
            "thinkingConfig": { "thinkingBudget": budget }
        });
    }
    body
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<ApiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<ApiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct ApiGroundingChunk {
    #[serde(default)]
    web: Option<ApiWebChunk>,
}

#[derive(Debug, Deserialize)]
struct ApiWebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Turn a successful response body into text plus grounding sources.
pub fn parse_response_body(body: &Value) -> Result<GenerationResponse, UpstreamError> {
    let parsed: ApiResponse =
        serde_json::from_value(body.clone()).map_err(|e| UpstreamError::Network {
            message: format!("unexpected response shape: {}", e),
        })?;

    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(UpstreamError::Blocked { reason });
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(UpstreamError::Empty);
    };

    let text: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "RECITATION")) => {
                Err(UpstreamError::Blocked {
                    reason: reason.to_string(),
                })
            }
            _ => Err(UpstreamError::Empty),
        };
    }

    let sources = candidate
        .grounding_metadata
        .map(|m| {
            m.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri.filter(|u| !u.trim().is_empty())?;
                    let title = web
                        .title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| UNTITLED_SOURCE.to_string());
                    Some(GroundingSource { uri, title })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GenerationResponse { text, sources })
}

/// Convert a non-2xx response into an [`UpstreamError::Http`].
pub fn parse_error_body(status: u16, raw: &str) -> UpstreamError {
    match serde_json::from_str::<ApiErrorEnvelope>(raw) {
        Ok(env) => UpstreamError::Http {
            status,
            code: env.error.status,
            message: env.error.message,
        },
        Err(_) => UpstreamError::Http {
            status,
            code: String::new(),
            message: raw.chars().take(500).collect(),
        },
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let body = build_request_body(&request);
        tracing::debug!(
            "Calling {} (search={}, thinking_budget={:?}, turns={})",
            request.model,
            request.use_search,
            request.thinking_budget,
            request.contents.len()
        );

        let resp = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let err = parse_error_body(status.as_u16(), &raw);
            tracing::warn!("Gemini call failed: {}", err);
            return Err(err);
        }

        let value: Value = resp.json().await.map_err(|e| UpstreamError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        let out = parse_response_body(&value)?;
        tracing::debug!(
            "Gemini returned {} chars, {} grounding sources",
            out.text.len(),
            out.sources.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(use_search: bool, thinking_budget: Option<u32>) -> GenerationRequest {
        GenerationRequest {
            model: "gemini-2.5-flash".into(),
            contents: vec![Turn {
                role: ChatRole::User,
                parts: vec![
                    Part::InlineData {
                        mime_type: "application/pdf".into(),
                        data: "JVBERg==".into(),
                    },
                    Part::Text("Summarize".into()),
                ],
            }],
            use_search,
            thinking_budget,
        }
    }

    #[test]
    fn body_carries_inline_data_and_text() {
        let body = build_request_body(&request(false, None));
        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["text"], "Summarize");
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn body_enables_search_and_thinking() {
        let body = build_request_body(&request(true, Some(32768)));
        assert_eq!(body["tools"][0], json!({ "googleSearch": {} }));
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            32768
        );
    }

    #[test]
    fn response_text_skips_thought_parts_and_collects_sources() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "```json\n{}\n```" }
                ]},
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.org", "title": "A" } },
                    { "web": { "uri": "https://b.org" } },
                    { "web": { "title": "no uri" } }
                ]}
            }]
        });
        let out = parse_response_body(&body).unwrap();
        assert_eq!(out.text, "```json\n{}\n```");
        assert_eq!(
            out.sources,
            vec![
                GroundingSource { uri: "https://a.org".into(), title: "A".into() },
                GroundingSource { uri: "https://b.org".into(), title: UNTITLED_SOURCE.into() },
            ]
        );
    }

    #[test]
    fn safety_finish_without_text_is_blocked() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(
            parse_response_body(&body),
            Err(UpstreamError::Blocked { reason: "SAFETY".into() })
        );
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(parse_response_body(&body), Err(UpstreamError::Blocked { .. })));
        assert_eq!(parse_response_body(&json!({})), Err(UpstreamError::Empty));
    }

    #[test]
    fn error_envelope_is_decoded() {
        let raw = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = parse_error_body(429, raw);
        assert_eq!(
            err,
            UpstreamError::Http {
                status: 429,
                code: "RESOURCE_EXHAUSTED".into(),
                message: "Quota exceeded".into(),
            }
        );
        assert!(err.to_string().contains("429"));
        let err = parse_error_body(502, "<html>bad gateway</html>");
        assert!(matches!(err, UpstreamError::Http { status: 502, .. }));
    }
}
