//! Per-request pipeline: validate, classify, build prompt, invoke, normalize.
//!
//! Every public operation performs at most one upstream call. A busy flag
//! rejects a second request on the same instance while one is in flight.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::chat::ChatSession;
use crate::classifier::{self, RequestKind};
use crate::clients::GenerationBackend;
use crate::config::Config;
use crate::error::{EchoLeafError, Result};
use crate::input;
use crate::invoker;
use crate::models::{ChatMessage, FormData, GeneratedContent, ResearchData};
use crate::normalizer;
use crate::prompts;

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EchoLeafError::validation(
                "A request is already in progress. Please wait for it to finish.",
            ));
        }
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct EchoLeaf<B: GenerationBackend> {
    backend: B,
    config: Config,
    busy: AtomicBool,
}

impl<B: GenerationBackend> EchoLeaf<B> {
    pub fn new(backend: B, config: Config) -> Self {
        Self {
            backend,
            config,
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Classification the pipeline would use for this submission.
    pub fn classify(&self, form: &FormData) -> RequestKind {
        classifier::classify(form, &self.config.classifier)
    }

    /// Generate a structured explanation for a study submission.
    pub async fn synthesize(&self, form: &FormData) -> Result<GeneratedContent> {
        input::validate_form(form, &self.config.limits)?;
        let _guard = BusyGuard::acquire(&self.busy)?;

        let kind = self.classify(form);
        let topic_query = classifier::looks_like_topic_list(&form.study_text, &self.config.classifier);
        let prompt = prompts::build_prompt(form, kind);
        let request = invoker::plan_study_request(
            form,
            kind,
            prompt,
            topic_query,
            &self.config.generation,
        );
        info!(
            "Synthesizing {} with {} (search={})",
            kind, request.model, request.use_search
        );

        let response = self.backend.generate(request).await?;
        let content = normalizer::normalize_generated_content(&response.text).inspect_err(|e| {
            warn!("Model reply could not be normalized: {}", e);
        })?;
        if kind == RequestKind::SelfHelpOutline && content.self_help_outline.is_none() {
            debug!("Self-help request returned no outline");
        }
        info!("Generated \"{}\"", content.title);
        Ok(content)
    }

    /// Ask a follow-up question. The question and the reply (or an apology on
    /// failure) are appended to `session`.
    pub async fn send_message(
        &self,
        session: &mut ChatSession,
        question: &str,
        context: Option<&GeneratedContent>,
    ) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EchoLeafError::validation("Please enter a question."));
        }
        let _guard = BusyGuard::acquire(&self.busy)?;

        let prior = session.messages().to_vec();
        session.push(ChatMessage::user(question));

        let prompt =
            prompts::build_chat_prompt(question, context, self.config.limits.chat_context_chars);
        let request = invoker::plan_chat_request(&prior, prompt, &self.config.generation);
        debug!("Chat request with {} prior messages", prior.len());

        match self.backend.generate(request).await {
            Ok(response) => {
                session.push(ChatMessage::model(response.text.clone()));
                Ok(response.text)
            }
            Err(e) => {
                let err = EchoLeafError::from(e);
                warn!("Chat request failed: {}", err);
                session.push(ChatMessage::model(format!(
                    "Sorry, I encountered an error: {}",
                    err.user_message()
                )));
                Err(err)
            }
        }
    }

    /// Search-grounded research report on a topic.
    pub async fn research(&self, topic: &str) -> Result<ResearchData> {
        let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        self.research_dated(topic, &date).await
    }

    pub async fn research_dated(&self, topic: &str, generated_date: &str) -> Result<ResearchData> {
        if topic.trim().is_empty() {
            return Err(EchoLeafError::validation("Please enter a research topic."));
        }
        let _guard = BusyGuard::acquire(&self.busy)?;

        let prompt = prompts::build_research_prompt(topic, generated_date);
        let request = invoker::plan_research_request(prompt, &self.config.generation);
        info!("Researching \"{}\" with {}", topic.trim(), request.model);

        let response = self.backend.generate(request).await?;
        let data = normalizer::normalize_research(&response.text, response.sources)
            .inspect_err(|e| warn!("Research reply could not be normalized: {}", e))?;
        info!(
            "Research returned {} evidence blocks, {} sources",
            data.evidence_blocks.len(),
            data.sources.len()
        );
        Ok(data)
    }
}
