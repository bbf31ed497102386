// src/processing.rs
//
// Document lifecycle manager. Owns the status state machine
// (uploaded -> processing -> ready | error) and runs the generation
// pipeline as one sequential attempt: claim, read cache, call the AI
// provider, validate, persist the quiz, mark ready. Any failure marks the
// document `error` with the captured message; there is no internal retry,
// the user re-invokes the action.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::ai::{AiError, AiProvider, GenerateQuizParams, QuizSource};
use crate::cache::{ArtifactCache, CacheError};
use crate::models::document::{Document, DocumentStatus};
use crate::models::quiz::{Difficulty, NewQuiz, Quiz};
use crate::store::{MetadataStore, StoreError};

/// Failure categories of one processing run. Tagged so callers can branch:
/// a cache miss means "prompt re-upload", a generation failure means
/// "offer retry", a conflict means a run is already in flight.
#[derive(Debug)]
pub enum ProcessingError {
    /// Another run holds the `processing` state (or the row vanished
    /// between the caller's lookup and the claim).
    AlreadyProcessing { document_id: Uuid },
    /// Local artifact absent or empty; recoverable by re-upload.
    CacheMiss(CacheError),
    /// The backing AI service failed, returned nothing usable, or returned
    /// a shape that failed validation.
    Generation(AiError),
    /// A metadata write failed.
    Persistence(StoreError),
}

impl ProcessingError {
    /// Stable machine-readable category, surfaced in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::AlreadyProcessing { .. } => "conflict",
            ProcessingError::CacheMiss(_) => "cache_miss",
            ProcessingError::Generation(_) => "generation_failed",
            ProcessingError::Persistence(_) => "persistence_failed",
        }
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::AlreadyProcessing { document_id } => write!(
                f,
                "document {} already has a generation run in flight",
                document_id
            ),
            ProcessingError::CacheMiss(e) => write!(f, "{}", e),
            ProcessingError::Generation(e) => write!(f, "{}", e),
            ProcessingError::Persistence(e) => write!(f, "failed to save quiz: {}", e),
        }
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessingError::CacheMiss(e) => Some(e),
            ProcessingError::Generation(e) => Some(e),
            ProcessingError::Persistence(e) => Some(e),
            ProcessingError::AlreadyProcessing { .. } => None,
        }
    }
}

/// Options for one generation run.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub num_questions: u32,
    pub difficulty: Difficulty,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            num_questions: 5,
            difficulty: Difficulty::Medium,
        }
    }
}

pub struct DocumentProcessor {
    db: Arc<dyn MetadataStore>,
    cache: ArtifactCache,
    ai: Arc<dyn AiProvider>,
}

impl DocumentProcessor {
    pub fn new(db: Arc<dyn MetadataStore>, cache: ArtifactCache, ai: Arc<dyn AiProvider>) -> Self {
        Self { db, cache, ai }
    }

    /// Runs one generation attempt for a document.
    ///
    /// The claim is written before any remote call so concurrent observers
    /// see the in-flight state immediately, and the final status write is
    /// ordered strictly after the quiz insert completes or fails.
    /// Regeneration is allowed from `error` and from `ready`; each
    /// successful run appends a new quiz and leaves prior ones in place.
    pub async fn process(
        &self,
        document: &Document,
        options: GenerateOptions,
    ) -> Result<Quiz, ProcessingError> {
        let claimed = self
            .db
            .claim_for_processing(document.id)
            .await
            .map_err(ProcessingError::Persistence)?;
        if !claimed {
            return Err(ProcessingError::AlreadyProcessing {
                document_id: document.id,
            });
        }

        tracing::info!(
            "Processing document {} ({} questions, {})",
            document.id,
            options.num_questions,
            options.difficulty
        );

        match self.run(document, options).await {
            Ok(quiz) => {
                self.db
                    .set_document_status(document.id, DocumentStatus::Ready, None)
                    .await
                    .map_err(ProcessingError::Persistence)?;
                tracing::info!("Document {} is ready (quiz {})", document.id, quiz.id);
                Ok(quiz)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!("Processing document {} failed: {}", document.id, message);
                // Best effort: the caller gets the original pipeline error
                // even if recording the failed status itself fails.
                if let Err(status_err) = self
                    .db
                    .set_document_status(document.id, DocumentStatus::Error, Some(&message))
                    .await
                {
                    tracing::error!(
                        "Failed to record error status for document {}: {}",
                        document.id,
                        status_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        document: &Document,
        options: GenerateOptions,
    ) -> Result<Quiz, ProcessingError> {
        let bytes = self
            .cache
            .retrieve(document.id)
            .await
            .map_err(ProcessingError::CacheMiss)?;

        let generated = self
            .ai
            .generate_quiz(GenerateQuizParams {
                source: QuizSource::Document {
                    bytes,
                    media_type: "application/pdf".to_string(),
                    filename: format!("{}.pdf", document.id),
                },
                num_questions: options.num_questions,
                difficulty: options.difficulty,
            })
            .await
            .map_err(ProcessingError::Generation)?;

        // Providers validate before returning, but the pipeline re-checks
        // the invariants it is about to persist.
        generated
            .validate()
            .map_err(|reason| ProcessingError::Generation(AiError::InvalidResponse { reason }))?;

        let quiz = self
            .db
            .insert_quiz(NewQuiz {
                document_id: document.id,
                user_id: document.user_id,
                title: generated.title,
                questions: generated.questions,
                difficulty: options.difficulty,
            })
            .await
            .map_err(ProcessingError::Persistence)?;

        Ok(quiz)
    }
}
