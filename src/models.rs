//! Core data model: submissions, generated results, research reports and chat.

use serde::{Deserialize, Deserializer, Serialize};

use crate::deserializers::{
    NOT_SPECIFIED, de_count, de_evidence_text, de_percentage, de_string_list, de_text, de_year,
    not_specified,
};
use crate::options::{
    Audience, Category, Language, Length, OutputFormat, StyleRewrite, TaskTemplate, Tone,
};

/// An uploaded study document, carried inline as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyFile {
    pub name: String,
    pub mime_type: String,
    /// Standard base64 of the file bytes
    pub data: String,
}

/// One user submission. Created per request and discarded afterwards unless
/// the result is saved to the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    #[serde(default)]
    pub study_text: String,
    #[serde(default)]
    pub study_file: Option<StudyFile>,
    #[serde(default)]
    pub study_urls: Vec<String>,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub length: Length,
    #[serde(default)]
    pub style_rewrite: Vec<StyleRewrite>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub task_template: TaskTemplate,
    #[serde(default)]
    pub thinking_mode: bool,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            study_text: String::new(),
            study_file: None,
            study_urls: Vec::new(),
            tone: Tone::default(),
            output_format: OutputFormat::default(),
            category: Category::default(),
            audience: Audience::default(),
            length: Length::default(),
            style_rewrite: Vec::new(),
            language: Language::default(),
            task_template: TaskTemplate::default(),
            thinking_mode: false,
        }
    }
}

impl FormData {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            study_text: text.into(),
            ..Self::default()
        }
    }

    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            study_urls: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_file(file: StudyFile) -> Self {
        Self {
            study_file: Some(file),
            ..Self::default()
        }
    }

    /// Human-readable list of the selected style rewrites, or "None".
    pub fn style_rewrite_label(&self) -> String {
        if self.style_rewrite.is_empty() {
            "None".to_string()
        } else {
            self.style_rewrite
                .iter()
                .map(|s| s.label())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

/// Quantitative evidence pulled out of a study. Fields the model could not
/// find hold [`NOT_SPECIFIED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvidence {
    #[serde(default = "not_specified", deserialize_with = "de_evidence_text")]
    pub sample_size: String,
    #[serde(default = "not_specified", deserialize_with = "de_evidence_text")]
    pub study_type: String,
    #[serde(default = "not_specified", deserialize_with = "de_evidence_text")]
    pub main_results: String,
    #[serde(default = "not_specified", deserialize_with = "de_evidence_text")]
    pub confidence_intervals: String,
    #[serde(default = "not_specified", deserialize_with = "de_evidence_text")]
    pub p_values: String,
}

impl Default for KeyEvidence {
    fn default() -> Self {
        Self {
            sample_size: not_specified(),
            study_type: not_specified(),
            main_results: not_specified(),
            confidence_intervals: not_specified(),
            p_values: not_specified(),
        }
    }
}

/// Whether an evidence value carries data rather than a placeholder.
pub fn is_specified(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && !trimmed.eq_ignore_ascii_case(NOT_SPECIFIED)
        && !trimmed.eq_ignore_ascii_case("n/a")
        && !trimmed.eq_ignore_ascii_case("not reported")
}

/// `null` key evidence means the same as a missing object: all placeholders.
fn de_key_evidence<'de, D>(deserializer: D) -> Result<KeyEvidence, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<KeyEvidence>::deserialize(deserializer)?.unwrap_or_default())
}

impl KeyEvidence {
    /// Label/value pairs that hold real data, in display order.
    pub fn specified_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Sample Size", self.sample_size.as_str()),
            ("Study Type", self.study_type.as_str()),
            ("Main Results", self.main_results.as_str()),
            ("Confidence Intervals", self.confidence_intervals.as_str()),
            ("P-Values", self.p_values.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| is_specified(v))
        .collect()
    }

    pub fn has_data(&self) -> bool {
        !self.specified_fields().is_empty()
    }
}

/// Normalized model output for one study or synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub title: String,
    #[serde(default, deserialize_with = "de_text")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "de_text")]
    pub summary: String,
    #[serde(default, deserialize_with = "de_text")]
    pub author_year: String,
    #[serde(default, deserialize_with = "de_text")]
    pub contradiction: String,
    #[serde(default, deserialize_with = "de_text")]
    pub clarity_engine: String,
    #[serde(default, deserialize_with = "de_string_list")]
    pub insights: Vec<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub main_content: String,
    #[serde(default, deserialize_with = "de_key_evidence")]
    pub key_evidence: KeyEvidence,
    #[serde(default, deserialize_with = "de_string_list")]
    pub limitations_and_bias: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_help_outline: Option<String>,
}

/// A library entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedStudy {
    pub id: String,
    pub saved_at: chrono::DateTime<chrono::Utc>,
    pub original_inputs: FormData,
    pub generated_content: GeneratedContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryScore {
    #[serde(rename = "Strong Evidence")]
    Strong,
    #[serde(rename = "Moderate Evidence", alias = "Moderate")]
    Moderate,
    #[serde(rename = "Preliminary Evidence", alias = "Preliminary")]
    Preliminary,
}

impl SummaryScore {
    pub fn label(self) -> &'static str {
        match self {
            SummaryScore::Strong => "Strong Evidence",
            SummaryScore::Moderate => "Moderate Evidence",
            SummaryScore::Preliminary => "Preliminary Evidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Strong", alias = "high", alias = "High")]
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryHeader {
    pub topic: String,
    #[serde(default, deserialize_with = "de_text")]
    pub generated_date: String,
    pub summary_score: SummaryScore,
    #[serde(default, deserialize_with = "de_string_list")]
    pub available_filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceBlock {
    #[serde(default, deserialize_with = "de_string_list")]
    pub key_findings: Vec<String>,
    pub strength_of_evidence: EvidenceStrength,
    #[serde(default, deserialize_with = "de_percentage")]
    pub confidence: u8,
    #[serde(default, deserialize_with = "de_text")]
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativeRow {
    pub topic: String,
    #[serde(default, deserialize_with = "de_text")]
    pub impact_strength: String,
    #[serde(default, deserialize_with = "de_text")]
    pub effect_type: String,
    #[serde(default, deserialize_with = "de_count")]
    pub citation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    #[serde(deserialize_with = "de_year")]
    pub year: i32,
    #[serde(default, deserialize_with = "de_count")]
    pub citation_count: u32,
    #[serde(default, deserialize_with = "de_text")]
    pub summary: String,
}

/// A citation reported by the search-augmentation feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

/// Search-grounded topic report produced by research mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchData {
    pub summary_header: SummaryHeader,
    #[serde(default)]
    pub evidence_blocks: Vec<EvidenceBlock>,
    #[serde(default)]
    pub comparative_table: Vec<ComparativeRow>,
    #[serde(default)]
    pub evolution_timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub question_generator: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_evidence_is_filled_with_placeholders() {
        let content: GeneratedContent =
            serde_json::from_str(r#"{"title":"T","keyEvidence":{"sampleSize":"n=40","pValues":null}}"#)
                .unwrap();
        assert_eq!(content.key_evidence.sample_size, "n=40");
        assert_eq!(content.key_evidence.p_values, NOT_SPECIFIED);
        assert_eq!(content.key_evidence.study_type, NOT_SPECIFIED);
        assert!(content.limitations_and_bias.is_empty());
        assert_eq!(content.key_evidence.specified_fields().len(), 1);
    }

    #[test]
    fn null_evidence_and_text_fields_become_defaults() {
        let content: GeneratedContent = serde_json::from_str(
            r#"{"title":"T","subtitle":null,"summary":"s","mainContent":null,"keyEvidence":null,"insights":null}"#,
        )
        .unwrap();
        assert_eq!(content.key_evidence, KeyEvidence::default());
        assert_eq!(content.subtitle, "");
        assert_eq!(content.main_content, "");
        assert!(content.insights.is_empty());
    }

    #[test]
    fn placeholders_are_not_data() {
        assert!(!is_specified("Not specified"));
        assert!(!is_specified("  "));
        assert!(!is_specified("N/A"));
        assert!(is_specified("p < 0.05"));
        assert!(!KeyEvidence::default().has_data());
    }

    #[test]
    fn form_data_uses_camel_case_on_the_wire() {
        let form = FormData::from_text("abc");
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["studyText"], "abc");
        assert_eq!(json["taskTemplate"], "Standard Summary");
        assert_eq!(json["length"], "Medium (~500 words)");
    }

    #[test]
    fn evidence_strength_accepts_capitalized_variants() {
        let s: EvidenceStrength = serde_json::from_str("\"High\"").unwrap();
        assert_eq!(s, EvidenceStrength::Strong);
        let s: SummaryScore = serde_json::from_str("\"Moderate Evidence\"").unwrap();
        assert_eq!(s, SummaryScore::Moderate);
    }
}
