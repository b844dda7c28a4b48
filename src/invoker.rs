//! Maps a classified submission onto a single upstream request.

use crate::classifier::RequestKind;
use crate::clients::{GenerationRequest, Part, Turn};
use crate::config::GenerationConfig;
use crate::models::{ChatMessage, ChatRole, FormData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputModality {
    /// Inline file bytes with a MIME type
    InlineFile,
    /// One or more URLs the model must retrieve via search
    Url,
    Text,
}

pub fn modality(form: &FormData) -> InputModality {
    if form.study_file.is_some() {
        InputModality::InlineFile
    } else if !form.study_urls.is_empty() {
        InputModality::Url
    } else {
        InputModality::Text
    }
}

/// Model id and thinking budget for the user's thinking-mode toggle.
pub fn select_model(thinking_mode: bool, cfg: &GenerationConfig) -> (String, Option<u32>) {
    if thinking_mode {
        (cfg.thinking_model.clone(), Some(cfg.thinking_budget))
    } else {
        (cfg.fast_model.clone(), None)
    }
}

/// Build the request for a study submission.
///
/// Search is enabled for URL input, for syntheses, and for self-help
/// requests whose text is a topic rather than a study (`topic_query`).
pub fn plan_study_request(
    form: &FormData,
    kind: RequestKind,
    prompt: String,
    topic_query: bool,
    cfg: &GenerationConfig,
) -> GenerationRequest {
    let input = modality(form);
    let (model, thinking_budget) = select_model(form.thinking_mode, cfg);
    let use_search = input == InputModality::Url
        || kind == RequestKind::MultiSourceSynthesis
        || (input == InputModality::Text && topic_query);

    let mut parts = Vec::with_capacity(2);
    if let Some(file) = &form.study_file {
        parts.push(Part::InlineData {
            mime_type: file.mime_type.clone(),
            data: file.data.clone(),
        });
    }
    parts.push(Part::Text(prompt));

    GenerationRequest {
        model,
        contents: vec![Turn {
            role: ChatRole::User,
            parts,
        }],
        use_search,
        thinking_budget,
    }
}

/// Research mode always uses the research model with search and thinking.
pub fn plan_research_request(prompt: String, cfg: &GenerationConfig) -> GenerationRequest {
    GenerationRequest {
        model: cfg.research_model.clone(),
        contents: vec![Turn::user_text(prompt)],
        use_search: true,
        thinking_budget: Some(cfg.thinking_budget),
    }
}

/// Chat request: prior history verbatim, then the latest question rewritten
/// with study context.
pub fn plan_chat_request(
    prior: &[ChatMessage],
    prompt: String,
    cfg: &GenerationConfig,
) -> GenerationRequest {
    let mut contents: Vec<Turn> = prior
        .iter()
        .map(|m| Turn {
            role: m.role,
            parts: vec![Part::Text(m.content.clone())],
        })
        .collect();
    contents.push(Turn::user_text(prompt));
    GenerationRequest {
        model: cfg.chat_model.clone(),
        contents,
        use_search: false,
        thinking_budget: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudyFile;

    #[test]
    fn thinking_toggle_selects_model_and_budget() {
        let cfg = GenerationConfig::default();
        assert_eq!(select_model(false, &cfg), ("gemini-2.5-flash".to_string(), None));
        assert_eq!(
            select_model(true, &cfg),
            ("gemini-2.5-pro".to_string(), Some(32_768))
        );
    }

    #[test]
    fn file_input_goes_inline_before_prompt() {
        let form = FormData::from_file(StudyFile {
            name: "s.pdf".into(),
            mime_type: "application/pdf".into(),
            data: "JVBERg==".into(),
        });
        let req = plan_study_request(
            &form,
            RequestKind::SingleStudy,
            "p".into(),
            false,
            &GenerationConfig::default(),
        );
        assert!(!req.use_search);
        assert!(matches!(req.contents[0].parts[0], Part::InlineData { .. }));
        assert_eq!(req.contents[0].parts[1], Part::Text("p".into()));
    }

    #[test]
    fn url_and_synthesis_enable_search() {
        let cfg = GenerationConfig::default();
        let url = FormData::from_urls(["https://a.org"]);
        assert!(plan_study_request(&url, RequestKind::SingleStudy, "p".into(), false, &cfg).use_search);

        let text = FormData::from_text("topic");
        assert!(
            plan_study_request(&text, RequestKind::MultiSourceSynthesis, "p".into(), true, &cfg)
                .use_search
        );
        assert!(!plan_study_request(&text, RequestKind::SingleStudy, "p".into(), false, &cfg).use_search);
    }

    #[test]
    fn chat_request_keeps_history_roles() {
        let prior = vec![ChatMessage::user("hi"), ChatMessage::model("hello")];
        let req = plan_chat_request(&prior, "why?".into(), &GenerationConfig::default());
        assert_eq!(req.model, "gemini-2.5-flash-lite");
        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[1].role, ChatRole::Model);
        assert_eq!(req.contents[2].parts, vec![Part::Text("why?".into())]);
    }
}
