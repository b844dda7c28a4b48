//! Citation and document export for generated results.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{GeneratedContent, ResearchData};

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("year regex should compile"));

/// BibTeX entry for a saved result, derived from its `authorYear` field.
///
/// Author is the text before the first `(`; the key is the first alphabetic
/// word of the author followed by the first four-digit year found, falling
/// back to the current year.
pub fn to_bibtex(content: &GeneratedContent) -> String {
    to_bibtex_with_year(content, chrono::Utc::now().year())
}

fn to_bibtex_with_year(content: &GeneratedContent, fallback_year: i32) -> String {
    let author_part = content
        .author_year
        .split('(')
        .next()
        .unwrap_or("")
        .trim();
    let author = if author_part.is_empty() {
        "Unknown Author"
    } else {
        author_part
    };
    let year = YEAR
        .captures(&content.author_year)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| fallback_year.to_string());
    let clean: String = author
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    let key_author = clean.split_whitespace().next().unwrap_or("Unknown");

    format!(
        "@article{{{key_author}{year},\n  title = {{{{{title}}}}},\n  author = {{{author}}},\n  year = {{{year}}},\n  note = {{Synthesized by EchoLeaf AI}}\n}}",
        title = content.title,
    )
}

/// Markdown rendering of a result, suitable for saving or pasting.
pub fn to_markdown(content: &GeneratedContent) -> String {
    let mut out = format!("# {}\n", content.title);
    if !content.subtitle.trim().is_empty() {
        out.push_str(&format!("\n_{}_\n", content.subtitle.trim()));
    }
    if !content.author_year.trim().is_empty() {
        out.push_str(&format!("\n**Source:** {}\n", content.author_year.trim()));
    }
    if !content.summary.trim().is_empty() {
        out.push_str(&format!("\n## TL;DR\n\n{}\n", content.summary.trim()));
    }
    if !content.contradiction.trim().is_empty() {
        out.push_str(&format!(
            "\n## The Core Contradiction\n\n{}\n",
            content.contradiction.trim()
        ));
    }
    if !content.clarity_engine.trim().is_empty() {
        out.push_str(&format!(
            "\n## In Simple Terms\n\n{}\n",
            content.clarity_engine.trim()
        ));
    }
    if !content.insights.is_empty() {
        out.push_str("\n## Key Insights\n\n");
        for insight in &content.insights {
            out.push_str(&format!("- {}\n", insight));
        }
    }
    if !content.main_content.trim().is_empty() {
        out.push_str(&format!("\n{}\n", content.main_content.trim()));
    }
    let evidence = content.key_evidence.specified_fields();
    if !evidence.is_empty() {
        out.push_str("\n## Key Evidence\n\n");
        for (label, value) in evidence {
            out.push_str(&format!("- **{}:** {}\n", label, value));
        }
    }
    if !content.limitations_and_bias.is_empty() {
        out.push_str("\n## Limitations & Bias\n\n");
        for item in &content.limitations_and_bias {
            out.push_str(&format!("- {}\n", item));
        }
    }
    if let Some(outline) = content
        .self_help_outline
        .as_deref()
        .filter(|o| !o.trim().is_empty())
    {
        out.push_str(&format!("\n## Self-Help Outline\n\n{}\n", outline.trim()));
    }
    out
}

/// Markdown rendering of a research report.
pub fn research_to_markdown(data: &ResearchData) -> String {
    let header = &data.summary_header;
    let mut out = format!(
        "# Research: {}\n\n**Evidence:** {}",
        header.topic,
        header.summary_score.label()
    );
    if !header.generated_date.is_empty() {
        out.push_str(&format!("  \n**Generated:** {}", header.generated_date));
    }
    out.push('\n');

    for (i, block) in data.evidence_blocks.iter().enumerate() {
        out.push_str(&format!(
            "\n## Evidence {} ({:?}, {}% confidence)\n\n",
            i + 1,
            block.strength_of_evidence,
            block.confidence
        ));
        for finding in &block.key_findings {
            out.push_str(&format!("- {}\n", finding));
        }
        if !block.insight.is_empty() {
            out.push_str(&format!("\n> {}\n", block.insight));
        }
    }

    if !data.comparative_table.is_empty() {
        out.push_str("\n## Comparison\n\n| Topic | Impact | Effect | Citations |\n|---|---|---|---|\n");
        for row in &data.comparative_table {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                row.topic, row.impact_strength, row.effect_type, row.citation_count
            ));
        }
    }

    if !data.evolution_timeline.is_empty() {
        out.push_str("\n## Timeline\n\n");
        let mut timeline = data.evolution_timeline.clone();
        timeline.sort_by_key(|e| e.year);
        for entry in &timeline {
            out.push_str(&format!(
                "- **{}** ({} citations): {}\n",
                entry.year, entry.citation_count, entry.summary
            ));
        }
    }

    if !data.sources.is_empty() {
        out.push_str("\n## Sources\n\n");
        for source in &data.sources {
            out.push_str(&format!("- [{}]({})\n", source.title, source.uri));
        }
    }

    if !data.question_generator.is_empty() {
        out.push_str("\n## Questions to Explore\n\n");
        for q in &data.question_generator {
            out.push_str(&format!("- {}\n", q));
        }
    }
    out
}
