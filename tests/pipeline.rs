//! End-to-end pipeline tests: ingest → retrieve → prompt → generate →
//! parse, with deterministic offline backends.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use studyrag::llm::{ChatBackend, HashEmbedder};
use studyrag::{
    AppConfig, Artifact, DocumentKind, DocumentSource, PuzzleKind, PuzzleSet, QuestionKind,
    QuestionSet, RagError, StudyService,
};

const DIMS: usize = 256;

/// Chat backend that records every prompt and replies from a script.
struct ScriptedBackend {
    name: &'static str,
    reply: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn up(name: &'static str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn down(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(RagError::GenerationFailed("backend offline".to_string())),
        }
    }
}

fn test_config(index_root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.index_root = index_root.display().to_string();
    config.embedding.dimensions = DIMS;
    config
}

fn service_with(
    index_root: &Path,
    primary: Arc<ScriptedBackend>,
    secondary: Option<Arc<ScriptedBackend>>,
) -> StudyService {
    StudyService::with_backends(
        test_config(index_root),
        Arc::new(HashEmbedder::new(DIMS)),
        primary,
        secondary.map(|s| s as Arc<dyn ChatBackend>),
    )
    .unwrap()
}

async fn ingest_text(
    service: &StudyService,
    dir: &Path,
    user: &str,
    doc_id: &str,
    name: &str,
    text: &str,
) -> studyrag::IngestReport {
    let path = dir.join(name);
    tokio::fs::write(&path, text).await.unwrap();
    service
        .ingest(&DocumentSource {
            document_id: doc_id.to_string(),
            owner_user_id: user.to_string(),
            storage_path: path,
            declared_type: DocumentKind::Text,
            original_name: name.to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn chat_answer_is_grounded_in_the_users_document() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "Paris is the capital, per your notes.");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    let report = ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "france.txt",
        "The capital of France is Paris.",
    )
    .await;
    assert_eq!(report.chunk_count, 1);

    let answer = service
        .answer_chat("alice", "What is the capital of France?")
        .await
        .unwrap();

    assert_eq!(answer.sources, vec!["france.txt".to_string()]);
    let prompt = primary.last_prompt();
    assert!(prompt.contains("The capital of France is Paris."));
    assert!(prompt.contains("[Source: france.txt | chunk 0]"));
}

#[tokio::test]
async fn user_with_no_documents_gets_the_empty_context_prompt() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "I don't have that in my notes.");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    let answer = service.answer_chat("nobody", "anything at all").await.unwrap();

    assert!(answer.sources.is_empty());
    let prompt = primary.last_prompt();
    assert!(prompt.contains("No relevant material was found"));
    assert!(prompt.contains("MUST respond exactly"));
}

#[tokio::test]
async fn users_never_see_each_others_chunks() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "ok");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "a-doc",
        "alice.txt",
        "The capital of France is Paris.",
    )
    .await;
    ingest_text(
        &service,
        tmp.path(),
        "bob",
        "b-doc",
        "bob.txt",
        "The capital of France is definitely Lyon, says Bob.",
    )
    .await;

    let answer = service
        .answer_chat("alice", "What is the capital of France?")
        .await
        .unwrap();

    assert_eq!(answer.sources, vec!["alice.txt".to_string()]);
    let prompt = primary.last_prompt();
    assert!(!prompt.contains("Bob"));
    assert!(!prompt.contains("bob.txt"));
}

#[tokio::test]
async fn removing_a_document_empties_subsequent_retrieval() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "ok");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "france.txt",
        "The capital of France is Paris.",
    )
    .await;
    service.remove("doc-1", "alice").await.unwrap();

    let answer = service
        .answer_chat("alice", "What is the capital of France?")
        .await
        .unwrap();
    assert!(answer.sources.is_empty());
    assert!(primary.last_prompt().contains("No relevant material was found"));
}

#[tokio::test]
async fn reingesting_the_same_document_does_not_duplicate_chunks() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "ok");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "notes.txt",
        "Photosynthesis converts light into chemical energy.",
    )
    .await;
    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "notes.txt",
        "Photosynthesis converts light into chemical energy.",
    )
    .await;

    assert_eq!(service.chunk_count("alice").await, 1);
}

#[tokio::test]
async fn quiz_generation_parses_fenced_model_output() {
    let tmp = tempfile::tempdir().unwrap();
    let reply = "Here is your quiz!\n```json\n{\"items\":[{\"id\":\"q1\",\
                 \"question\":\"What is the capital of France?\",\
                 \"options\":{\"a\":\"Paris\",\"b\":\"Lyon\"},\
                 \"answer\":\"a\",\"explanation\":\"Stated in the notes.\"}],\
                 \"note\":null}\n```";
    let primary = ScriptedBackend::up("local", reply);
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "france.txt",
        "The capital of France is Paris.",
    )
    .await;

    let quiz = service
        .generate_quiz("alice", Some("france"), 25)
        .await
        .unwrap();
    assert_eq!(quiz.items.len(), 1);
    assert_eq!(quiz.items[0].answer, "a");

    // Requested 25 items, but the prompt clamps to the ceiling.
    assert!(primary.last_prompt().contains("exactly 10 multiple-choice questions"));
}

#[tokio::test]
async fn puzzle_and_question_generation_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let puzzle_reply = "{\"items\":[{\"id\":\"p1\",\
                        \"sentence\":\"Water moves across membranes by _____.\",\
                        \"answer\":\"osmosis\",\"hint\":\"passive transport\"}],\"note\":null}";
    let primary = ScriptedBackend::up("local", puzzle_reply);
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "bio.txt",
        "Water moves across membranes by osmosis.",
    )
    .await;

    let artifact = service
        .generate_puzzle("alice", PuzzleKind::FillBlank, 3)
        .await
        .unwrap();
    match &artifact.puzzles {
        PuzzleSet::FillBlank(items) => assert_eq!(items[0].answer, "osmosis"),
        other => panic!("unexpected puzzle set: {other:?}"),
    }

    let questions_reply = "{\"items\":[{\"id\":\"q1\",\"front\":\"Osmosis\",\
                           \"back\":\"Passive water transport\"}],\"note\":null}";
    let primary = ScriptedBackend::up("local", questions_reply);
    let service = service_with(tmp.path(), Arc::clone(&primary), None);
    let bank = service
        .generate_questions("alice", QuestionKind::Flashcard, 2)
        .await
        .unwrap();
    match &bank.questions {
        QuestionSet::Flashcard(items) => assert_eq!(items[0].front, "Osmosis"),
        other => panic!("unexpected question set: {other:?}"),
    }

    // Artifacts serialize with their type tags for session storage.
    let value = serde_json::to_value(Artifact::from(bank)).unwrap();
    assert_eq!(value["type"], "questions");
    assert_eq!(value["questions"]["kind"], "flashcard");
}

#[tokio::test]
async fn failed_primary_is_covered_by_the_fallback_backend() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::down("local");
    let secondary = ScriptedBackend::up("cloud", "Answer from the cloud.");
    let service = service_with(tmp.path(), Arc::clone(&primary), Some(Arc::clone(&secondary)));

    let answer = service.answer_chat("alice", "hello").await.unwrap();
    assert_eq!(answer.answer, "Answer from the cloud.");
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
}

#[tokio::test]
async fn both_backends_failing_surface_a_generation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::down("local");
    let secondary = ScriptedBackend::down("cloud");
    let service = service_with(tmp.path(), Arc::clone(&primary), Some(Arc::clone(&secondary)));

    let err = service.answer_chat("alice", "hello").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationFailed(_)));
    assert_eq!(secondary.calls(), 1);
}

#[tokio::test]
async fn unparseable_model_output_is_a_retryable_error() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "Sorry, I cannot produce JSON today.");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "notes.txt",
        "Some study material.",
    )
    .await;

    let err = service.generate_quiz("alice", None, 5).await.unwrap_err();
    assert!(matches!(err, RagError::MalformedOutput(_)));
}

#[tokio::test]
async fn deleting_a_user_removes_their_persisted_index() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "ok");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "notes.txt",
        "Some study material.",
    )
    .await;
    assert!(tmp.path().join("alice").exists());

    service.delete_user("alice").await.unwrap();
    assert!(!tmp.path().join("alice").exists());
    assert_eq!(service.chunk_count("alice").await, 0);
}

#[tokio::test]
async fn index_survives_a_service_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = ScriptedBackend::up("local", "ok");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);

    ingest_text(
        &service,
        tmp.path(),
        "alice",
        "doc-1",
        "france.txt",
        "The capital of France is Paris.",
    )
    .await;
    drop(service);

    let primary = ScriptedBackend::up("local", "still here");
    let service = service_with(tmp.path(), Arc::clone(&primary), None);
    let answer = service
        .answer_chat("alice", "What is the capital of France?")
        .await
        .unwrap();
    assert_eq!(answer.sources, vec!["france.txt".to_string()]);
}

#[tokio::test]
async fn unsupported_upload_type_is_rejected_before_ingestion() {
    let err = DocumentKind::from_declared("docx").unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFormat(_)));
}
