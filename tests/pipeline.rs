//! End-to-end pipeline tests against a scripted generation backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use echoleaf::chat::ChatSession;
use echoleaf::clients::{GenerationBackend, GenerationRequest, GenerationResponse, UpstreamError};
use echoleaf::error_map;
use echoleaf::library::Library;
use echoleaf::models::{ChatRole, GroundingSource};
use echoleaf::storage::{FileStore, KeyValueStore, MemoryStore};
use echoleaf::{Config, EchoLeaf, EchoLeafError, FormData, GeneratedContent};

#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<GenerationResponse, UpstreamError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    fn replying(replies: Vec<Result<GenerationResponse, UpstreamError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn text(text: &str) -> Arc<Self> {
        Self::replying(vec![Ok(GenerationResponse {
            text: text.to_string(),
            sources: Vec::new(),
        })])
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UpstreamError::Empty))
    }
}

fn sample_content() -> GeneratedContent {
    serde_json::from_value(json!({
        "title": "Sleep and Memory",
        "subtitle": "What one night changes",
        "summary": "Sleep after learning improved recall.",
        "authorYear": "Walker et al., 2023",
        "contradiction": "Earlier work found smaller effects.",
        "clarityEngine": "Think of sleep as saving your work.",
        "insights": ["Sleep consolidates memory", "Naps help too"],
        "mainContent": "A randomized trial of 120 adults...",
        "keyEvidence": {
            "sampleSize": "120",
            "studyType": "Randomized controlled trial",
            "mainResults": "Recall improved by 20%",
            "confidenceIntervals": "95% CI 12-28%",
            "pValues": "p < 0.01"
        },
        "limitationsAndBias": ["Young participants only"]
    }))
    .unwrap()
}

fn fenced(content: &GeneratedContent) -> String {
    format!(
        "Here is the result.\n```json\n{}\n```\n",
        serde_json::to_string_pretty(content).unwrap()
    )
}

fn long_study_text() -> String {
    let sentence = "In this randomized trial participants who slept eight hours after learning \
                    recalled more word pairs than those kept awake overnight. ";
    sentence.repeat(4000 / sentence.len() + 1)
}

#[tokio::test]
async fn single_study_text_keeps_title_verbatim() {
    let content = sample_content();
    let backend = ScriptedBackend::text(&fenced(&content));
    let app = EchoLeaf::new(backend.clone(), Config::default());

    let form = FormData::from_text(long_study_text());
    let result = app.synthesize(&form).await.unwrap();
    assert_eq!(result.title, "Sleep and Memory");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let prompt = requests[0].prompt_text();
    assert!(prompt.contains("INPUT STUDY TEXT"));
    assert!(!prompt.contains("SYNTHESIS TASK"));
    assert!(!requests[0].use_search);
    assert_eq!(requests[0].model, "gemini-2.5-flash");
}

#[tokio::test]
async fn two_urls_become_a_synthesis_with_search() {
    let backend = ScriptedBackend::text(&fenced(&sample_content()));
    let app = EchoLeaf::new(backend.clone(), Config::default());

    let form = FormData::from_urls(["https://a.org/study-one", "https://b.org/study-two"]);
    app.synthesize(&form).await.unwrap();

    let requests = backend.requests();
    let prompt = requests[0].prompt_text();
    assert!(prompt.contains("https://a.org/study-one"));
    assert!(prompt.contains("https://b.org/study-two"));
    assert!(prompt.to_lowercase().contains("synthesis"));
    assert!(requests[0].use_search);
}

#[tokio::test]
async fn fenced_reply_round_trips_exactly() {
    let content = sample_content();
    let app = EchoLeaf::new(ScriptedBackend::text(&fenced(&content)), Config::default());
    let result = app
        .synthesize(&FormData::from_text(long_study_text()))
        .await
        .unwrap();
    assert_eq!(result, content);
}

#[tokio::test]
async fn prose_reply_is_a_format_error() {
    let app = EchoLeaf::new(
        ScriptedBackend::text("I'm sorry, I could not read that study."),
        Config::default(),
    );
    let err = app
        .synthesize(&FormData::from_text(long_study_text()))
        .await
        .unwrap_err();
    assert!(matches!(err, EchoLeafError::Format { .. }));
    assert!(!app.is_busy());
}

#[tokio::test]
async fn quota_failure_maps_to_fixed_message() {
    let backend = ScriptedBackend::replying(vec![Err(UpstreamError::Http {
        status: 429,
        code: "RESOURCE_EXHAUSTED".into(),
        message: "Quota exceeded for metric".into(),
    })]);
    let app = EchoLeaf::new(backend.clone(), Config::default());
    let err = app
        .synthesize(&FormData::from_text(long_study_text()))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), error_map::QUOTA_EXCEEDED);
    // one attempt, no retry
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn invalid_input_never_reaches_backend() {
    let backend = ScriptedBackend::text("unused");
    let app = EchoLeaf::new(backend.clone(), Config::default());
    let err = app.synthesize(&FormData::default()).await.unwrap_err();
    assert!(matches!(err, EchoLeafError::InputValidation { .. }));
    assert!(backend.requests().is_empty());
}

struct GatedBackend {
    gate: Notify,
    reply: String,
}

#[async_trait]
impl GenerationBackend for GatedBackend {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        self.gate.notified().await;
        Ok(GenerationResponse {
            text: self.reply.clone(),
            sources: Vec::new(),
        })
    }
}

#[tokio::test]
async fn overlapping_request_is_rejected() {
    let backend = Arc::new(GatedBackend {
        gate: Notify::new(),
        reply: fenced(&sample_content()),
    });
    let app = EchoLeaf::new(backend.clone(), Config::default());
    let form = FormData::from_text(long_study_text());

    let (first, second, _) = tokio::join!(app.synthesize(&form), app.synthesize(&form), async {
        tokio::task::yield_now().await;
        backend.gate.notify_one();
    });
    assert!(first.is_ok());
    assert!(matches!(second, Err(EchoLeafError::InputValidation { .. })));
    assert!(!app.is_busy());
}

#[tokio::test]
async fn chat_failure_appends_apology() {
    let backend = ScriptedBackend::replying(vec![
        Ok(GenerationResponse {
            text: "It means memory improved.".into(),
            sources: Vec::new(),
        }),
        Err(UpstreamError::Http {
            status: 503,
            code: "UNAVAILABLE".into(),
            message: "The model is overloaded".into(),
        }),
    ]);
    let app = EchoLeaf::new(backend.clone(), Config::default());
    let content = sample_content();
    let mut session = ChatSession::new();

    let reply = app
        .send_message(&mut session, "What does it mean?", Some(&content))
        .await
        .unwrap();
    assert_eq!(reply, "It means memory improved.");

    let err = app
        .send_message(&mut session, "And for older adults?", Some(&content))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), error_map::SERVICE_UNAVAILABLE);

    let messages = session.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, ChatRole::User);
    assert_eq!(messages[3].role, ChatRole::Model);
    assert_eq!(
        messages[3].content,
        format!("Sorry, I encountered an error: {}", error_map::SERVICE_UNAVAILABLE)
    );

    // second request carries the first exchange as history
    let requests = backend.requests();
    assert_eq!(requests[1].contents.len(), 3);
    assert!(requests[1].prompt_text().contains("\"Sleep and Memory\""));
}

#[tokio::test]
async fn research_sources_come_from_grounding() {
    let reply = r#"```json
{
  "summaryHeader": {"topic": "Intermittent fasting", "generatedDate": "2025-01-01", "summaryScore": "Moderate Evidence"},
  "evidenceBlocks": [{"keyFindings": ["Weight loss"], "strengthOfEvidence": "medium", "confidence": 80, "insight": "Modest effect"}],
  "sources": [{"uri": "https://made-up.example", "title": "Invented"}],
  "questionGenerator": ["Is it safe?"]
}
```"#;
    let grounding = vec![
        GroundingSource {
            uri: "https://pubmed.example/1".into(),
            title: "Trial A".into(),
        },
        GroundingSource {
            uri: "https://pubmed.example/2".into(),
            title: "Untitled Source".into(),
        },
    ];
    let backend = ScriptedBackend::replying(vec![Ok(GenerationResponse {
        text: reply.into(),
        sources: grounding.clone(),
    })]);
    let app = EchoLeaf::new(backend.clone(), Config::default());

    let data = app
        .research_dated("Intermittent fasting", "2025-01-01")
        .await
        .unwrap();
    assert_eq!(data.sources, grounding);
    assert_eq!(data.evidence_blocks[0].confidence, 80);

    let request = &backend.requests()[0];
    assert!(request.use_search);
    assert_eq!(request.model, "gemini-2.5-pro");
    assert!(request.prompt_text().contains("\"Intermittent fasting\""));
}

#[test]
fn save_then_delete_leaves_persisted_library_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));

    let mut library = Library::load(store.clone());
    library.save(FormData::from_text("first study"), sample_content());
    let before = store.read(echoleaf::library::LIBRARY_KEY).unwrap();

    let saved = library.save(FormData::from_text("second study"), sample_content());
    assert!(library.delete(&saved.id));
    assert_eq!(store.read(echoleaf::library::LIBRARY_KEY).unwrap(), before);

    let reloaded = Library::load(store);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.studies()[0].original_inputs.study_text, "first study");
}

#[test]
fn library_survives_corrupt_storage() {
    let store = Arc::new(MemoryStore::new());
    store
        .write(echoleaf::library::LIBRARY_KEY, "{not json")
        .unwrap();
    let library = Library::load(store);
    assert!(library.is_empty());
}
