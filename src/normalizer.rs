//! Extraction of typed results from free-form model replies.
//!
//! The model is asked for a single ```json fenced object. The fenced body is
//! tried first; if there is no fence, or the fenced body does not parse, the
//! whole reply is parsed as JSON. Anything else is a [`EchoLeafError::Format`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{EchoLeafError, Result};
use crate::models::{GeneratedContent, GroundingSource, ResearchData};

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```json\s*(.*?)\s*```").expect("json fence regex should compile")
});

fn format_error(message: impl Into<String>) -> EchoLeafError {
    EchoLeafError::Format {
        message: message.into(),
    }
}

/// Locate and parse the JSON object in a model reply.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    if let Some(body) = JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        match serde_json::from_str::<T>(body.as_str()) {
            Ok(value) => return Ok(value),
            Err(e) => tracing::debug!("Fenced JSON did not parse, trying whole reply: {}", e),
        }
    }
    serde_json::from_str::<T>(text.trim()).map_err(|e| {
        tracing::debug!("Reply is not JSON either: {}", e);
        format_error(format!("no parseable JSON object in model reply: {}", e))
    })
}

/// Parse and validate a study result.
pub fn normalize_generated_content(text: &str) -> Result<GeneratedContent> {
    let content: GeneratedContent = extract_json(text)?;
    if content.title.trim().is_empty() {
        return Err(format_error("generated content has an empty title"));
    }
    if content.summary.trim().is_empty() && content.main_content.trim().is_empty() {
        return Err(format_error(
            "generated content has neither a summary nor main content",
        ));
    }
    Ok(content)
}

/// Parse a research report and attach grounding sources from response
/// metadata. Whatever the model wrote into `sources` is discarded.
pub fn normalize_research(text: &str, sources: Vec<GroundingSource>) -> Result<ResearchData> {
    let mut data: ResearchData = extract_json(text)?;
    if data.summary_header.topic.trim().is_empty() {
        return Err(format_error("research report has an empty topic"));
    }
    if !data.sources.is_empty() {
        tracing::debug!(
            "Discarding {} model-written sources in favour of grounding metadata",
            data.sources.len()
        );
    }
    data.sources = sources;
    Ok(data)
}
