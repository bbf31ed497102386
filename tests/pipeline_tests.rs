// tests/pipeline_tests.rs
//
// State-machine tests against the DocumentProcessor directly, with the
// in-memory store, a tempdir cache, and scripted providers.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use learnanything_backend::ai::{AiError, AiProvider, GenerateQuizParams, GeneratedQuiz};
use learnanything_backend::cache::ArtifactCache;
use learnanything_backend::models::document::{Document, DocumentStatus, NewDocument};
use learnanything_backend::models::quiz::QuizQuestion;
use learnanything_backend::processing::{DocumentProcessor, GenerateOptions, ProcessingError};
use learnanything_backend::store::{MemoryMetadataStore, MetadataStore};

enum Mode {
    Succeed,
    Fail,
    /// Returns a structurally invalid quiz (three options per question).
    InvalidShape,
}

struct ScriptedProvider {
    mode: Mode,
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate_quiz(&self, params: GenerateQuizParams) -> Result<GeneratedQuiz, AiError> {
        match self.mode {
            Mode::Fail => Err(AiError::EmptyResponse {
                provider: "scripted",
            }),
            Mode::Succeed => {
                let questions = (0..params.num_questions)
                    .map(|i| QuizQuestion {
                        question: format!("Q{}", i + 1),
                        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        correct_answer: 0,
                        explanation: "E".to_string(),
                    })
                    .collect();
                Ok(GeneratedQuiz {
                    title: "T".to_string(),
                    questions,
                })
            }
            Mode::InvalidShape => Ok(GeneratedQuiz {
                title: "T".to_string(),
                questions: vec![QuizQuestion {
                    question: "Q1".to_string(),
                    options: vec!["a".into(), "b".into(), "c".into()],
                    correct_answer: 0,
                    explanation: "E".to_string(),
                }],
            }),
        }
    }
}

struct Harness {
    db: Arc<MemoryMetadataStore>,
    cache: ArtifactCache,
    _tmp: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        Self {
            db: Arc::new(MemoryMetadataStore::new()),
            cache: ArtifactCache::new(tmp.path().join("pdf-cache")),
            _tmp: tmp,
        }
    }

    fn processor(&self, mode: Mode) -> DocumentProcessor {
        DocumentProcessor::new(
            self.db.clone(),
            self.cache.clone(),
            Arc::new(ScriptedProvider { mode }),
        )
    }

    async fn seed_document(&self, cached: bool) -> Document {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();
        let document = self
            .db
            .insert_document(NewDocument {
                id,
                user_id,
                title: "Notes".to_string(),
                file_path: format!("{}/{}.pdf", user_id, id),
                size_bytes: 64,
                page_count: None,
            })
            .await
            .expect("insert document");

        if cached {
            self.cache
                .store(id, b"%PDF-1.4 cached bytes")
                .await
                .expect("cache store");
        }

        document
    }

    async fn status_of(&self, id: Uuid) -> DocumentStatus {
        self.db
            .get_document(id)
            .await
            .expect("get document")
            .expect("document present")
            .status
    }
}

#[tokio::test]
async fn successful_run_persists_a_quiz_and_marks_ready() {
    let harness = Harness::new();
    let document = harness.seed_document(true).await;

    let quiz = harness
        .processor(Mode::Succeed)
        .process(&document, GenerateOptions::default())
        .await
        .expect("process");

    assert_eq!(quiz.document_id, document.id);
    assert_eq!(quiz.questions.len(), 5);
    assert_eq!(harness.status_of(document.id).await, DocumentStatus::Ready);

    let quizzes = harness
        .db
        .list_quizzes_for_document(document.id)
        .await
        .expect("list quizzes");
    assert_eq!(quizzes.len(), 1);
}

#[tokio::test]
async fn cache_miss_marks_the_document_error() {
    let harness = Harness::new();
    let document = harness.seed_document(false).await;

    let err = harness
        .processor(Mode::Succeed)
        .process(&document, GenerateOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "cache_miss");
    assert!(matches!(err, ProcessingError::CacheMiss(_)));

    // The claim precedes the cache read, so the failure lands in `error`
    // with the re-upload message rather than reverting to `uploaded`.
    let stored = harness
        .db
        .get_document(document.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(stored.status, DocumentStatus::Error);
    assert!(
        stored
            .error_message
            .as_deref()
            .expect("error message")
            .contains("re-upload")
    );
}

#[tokio::test]
async fn deterministic_failure_lands_in_error_both_times() {
    let harness = Harness::new();
    let document = harness.seed_document(true).await;
    let processor = harness.processor(Mode::Fail);

    for _ in 0..2 {
        let err = processor
            .process(&document, GenerateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation_failed");
        // Never left dangling at `processing`.
        assert_eq!(harness.status_of(document.id).await, DocumentStatus::Error);
    }
}

#[tokio::test]
async fn invalid_quiz_shape_is_a_generation_failure() {
    let harness = Harness::new();
    let document = harness.seed_document(true).await;

    let err = harness
        .processor(Mode::InvalidShape)
        .process(&document, GenerateOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "generation_failed");
    assert!(matches!(err, ProcessingError::Generation(_)));
    assert_eq!(harness.status_of(document.id).await, DocumentStatus::Error);

    // The violating quiz must not have been persisted.
    let quizzes = harness
        .db
        .list_quizzes_for_document(document.id)
        .await
        .expect("list quizzes");
    assert!(quizzes.is_empty());
}

#[tokio::test]
async fn a_document_already_processing_cannot_be_claimed_again() {
    let harness = Harness::new();
    let document = harness.seed_document(true).await;

    assert!(
        harness
            .db
            .claim_for_processing(document.id)
            .await
            .expect("claim")
    );

    let err = harness
        .processor(Mode::Succeed)
        .process(&document, GenerateOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "conflict");
    // The rejected run must not disturb the in-flight state.
    assert_eq!(
        harness.status_of(document.id).await,
        DocumentStatus::Processing
    );
}

#[tokio::test]
async fn regenerating_from_ready_appends_a_quiz() {
    let harness = Harness::new();
    let document = harness.seed_document(true).await;
    let processor = harness.processor(Mode::Succeed);

    processor
        .process(&document, GenerateOptions::default())
        .await
        .expect("first run");
    processor
        .process(&document, GenerateOptions::default())
        .await
        .expect("second run");

    assert_eq!(harness.status_of(document.id).await, DocumentStatus::Ready);
    let quizzes = harness
        .db
        .list_quizzes_for_document(document.id)
        .await
        .expect("list quizzes");
    assert_eq!(quizzes.len(), 2);
}

#[tokio::test]
async fn options_flow_through_to_the_provider() {
    let harness = Harness::new();
    let document = harness.seed_document(true).await;

    let quiz = harness
        .processor(Mode::Succeed)
        .process(
            &document,
            GenerateOptions {
                num_questions: 3,
                difficulty: learnanything_backend::models::quiz::Difficulty::Hard,
            },
        )
        .await
        .expect("process");

    assert_eq!(quiz.questions.len(), 3);
    assert_eq!(
        quiz.difficulty,
        learnanything_backend::models::quiz::Difficulty::Hard
    );
}
