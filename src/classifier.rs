//! Request classification heuristics
//!
//! Decides which generation strategy a submission gets. The topic-list test
//! is deliberately cheap and can misclassify; its thresholds come from
//! [`ClassifierConfig`] so they can be tuned without code changes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ClassifierConfig;
use crate::models::FormData;
use crate::options::TaskTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    SingleStudy,
    MultiSourceSynthesis,
    SelfHelpOutline,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestKind::SingleStudy => "single-study",
            RequestKind::MultiSourceSynthesis => "multi-source-synthesis",
            RequestKind::SelfHelpOutline => "self-help-outline",
        };
        f.write_str(s)
    }
}

/// Non-empty, trimmed lines of pasted text. Used both for classification and
/// to enumerate topics in synthesis prompts.
pub fn topic_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Whether pasted text reads like a short topic or a one-per-line list
/// rather than continuous study prose.
pub fn looks_like_topic_list(text: &str, cfg: &ClassifierConfig) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.chars().count() < cfg.topic_max_chars {
        return true;
    }
    let lines = topic_lines(trimmed);
    let words = trimmed.split_whitespace().count();
    let words_per_line = words as f64 / lines.len().max(1) as f64;
    words_per_line < cfg.topic_max_words_per_line
}

/// Classify a submission.
///
/// Self-help template wins outright; otherwise more than one URL, or a
/// text-only submission that looks like a topic list, is a synthesis.
pub fn classify(form: &FormData, cfg: &ClassifierConfig) -> RequestKind {
    if form.task_template == TaskTemplate::SelfHelpOutline {
        return RequestKind::SelfHelpOutline;
    }
    if form.study_urls.len() > 1 {
        return RequestKind::MultiSourceSynthesis;
    }
    let text_only = form.study_file.is_none() && form.study_urls.is_empty();
    if text_only && looks_like_topic_list(&form.study_text, cfg) {
        return RequestKind::MultiSourceSynthesis;
    }
    RequestKind::SingleStudy
}
