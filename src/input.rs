//! Submission checks that run before any network call.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::{EchoLeafError, Result};
use crate::models::{FormData, StudyFile};

pub const PDF_MIME: &str = "application/pdf";

/// Parses and checks a single study URL. Only absolute http(s) URLs are accepted.
pub fn parse_study_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|_| EchoLeafError::validation("Please enter a valid URL."))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(EchoLeafError::validation("Please enter a valid URL.")),
    }
}

/// Ordered, duplicate-free list of study URLs, capped at `max_urls`.
#[derive(Debug, Clone, Default)]
pub struct UrlList {
    urls: Vec<String>,
    max_urls: usize,
}

impl UrlList {
    pub fn new(max_urls: usize) -> Self {
        Self {
            urls: Vec::new(),
            max_urls,
        }
    }

    pub fn add(&mut self, raw: &str) -> Result<()> {
        let candidate = raw.trim();
        if candidate.is_empty() {
            return Ok(());
        }
        if self.urls.len() >= self.max_urls {
            return Err(EchoLeafError::validation(format!(
                "You can add a maximum of {} URLs.",
                self.max_urls
            )));
        }
        let normalized = parse_study_url(candidate)?.to_string();
        if self.urls.iter().any(|u| *u == normalized) {
            return Err(EchoLeafError::validation(
                "This URL has already been added.",
            ));
        }
        self.urls.push(normalized);
        Ok(())
    }

    pub fn remove(&mut self, url: &str) {
        self.urls.retain(|u| u != url);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// Reads study text from a file, or from stdin when `path` is `-`.
pub fn read_study_text(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).map_err(|e| {
            EchoLeafError::validation(format!("Failed to read study text from stdin: {}", e))
        })?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| {
        EchoLeafError::validation(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// Reads a PDF from disk into an inline [`StudyFile`].
pub fn load_pdf(path: &Path) -> Result<StudyFile> {
    let is_pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf_ext {
        return Err(EchoLeafError::validation("Please select a PDF file."));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        EchoLeafError::validation(format!("Failed to read file {}: {}", path.display(), e))
    })?;
    if !bytes.starts_with(b"%PDF") {
        return Err(EchoLeafError::validation("Please select a PDF file."));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "study.pdf".to_string());
    tracing::debug!("Loaded PDF {} ({} bytes)", name, bytes.len());
    Ok(StudyFile {
        name,
        mime_type: PDF_MIME.to_string(),
        data: STANDARD.encode(&bytes),
    })
}

/// Rejects submissions that cannot be sent upstream.
pub fn validate_form(form: &FormData, limits: &LimitsConfig) -> Result<()> {
    if form.study_text.trim().is_empty() && form.study_file.is_none() && form.study_urls.is_empty()
    {
        return Err(EchoLeafError::validation(
            "Please paste study text, upload a PDF, or provide a URL to synthesize.",
        ));
    }

    if let Some(file) = &form.study_file {
        if file.mime_type != PDF_MIME {
            return Err(EchoLeafError::validation("Please select a PDF file."));
        }
        if file.data.trim().is_empty() || STANDARD.decode(file.data.trim()).is_err() {
            return Err(EchoLeafError::validation("Failed to read file."));
        }
    }

    if form.study_urls.len() > limits.max_urls {
        return Err(EchoLeafError::validation(format!(
            "You can add a maximum of {} URLs.",
            limits.max_urls
        )));
    }
    let mut seen: Vec<url::Url> = Vec::with_capacity(form.study_urls.len());
    for raw in &form.study_urls {
        let parsed = parse_study_url(raw)?;
        if seen.contains(&parsed) {
            return Err(EchoLeafError::validation(
                "This URL has already been added.",
            ));
        }
        seen.push(parsed);
    }

    Ok(())
}
