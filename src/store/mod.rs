// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::attempt::{NewAttempt, QuizAttempt};
use crate::models::document::{Document, DocumentStatus, NewDocument};
use crate::models::quiz::{NewQuiz, Quiz};
use crate::models::user::{NewUser, Profile, User};

pub use memory::MemoryMetadataStore;
pub use postgres::PgMetadataStore;

#[derive(Debug)]
pub enum StoreError {
    /// Unique-constraint violation, e.g. a duplicate username.
    UniqueViolation(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation(msg) => write!(f, "unique constraint violated: {}", msg),
            StoreError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            // Postgres error code for unique violation is 23505.
            if db.code().as_deref() == Some("23505") {
                return StoreError::UniqueViolation(db.message().to_string());
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// Per-user aggregate counters surfaced on the profile screen.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserStats {
    pub documents_count: i64,
    pub quizzes_completed: i64,
}

/// System of record for users, profiles, documents, quizzes and attempts.
///
/// The Postgres implementation backs the running service; the in-memory
/// implementation backs hermetic tests. Handlers and the processing
/// pipeline only ever see this trait.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // -- users / profiles

    /// Insert a user together with its profile row.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn user_stats(&self, user_id: Uuid) -> Result<UserStats, StoreError>;

    // -- documents

    async fn insert_document(&self, doc: NewDocument) -> Result<Document, StoreError>;

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Documents owned by a user, newest first.
    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, StoreError>;

    /// Conditionally move a document into `processing`.
    ///
    /// Succeeds only from `uploaded`, `error` or `ready`; returns false when
    /// the document is missing or another run already holds `processing`.
    /// This is the transition guard that serializes concurrent generation
    /// attempts on the same document.
    async fn claim_for_processing(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Delete a document row; quizzes and attempts cascade.
    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError>;

    // -- quizzes

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, StoreError>;

    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError>;

    /// Quizzes generated for a document, newest first.
    async fn list_quizzes_for_document(&self, document_id: Uuid) -> Result<Vec<Quiz>, StoreError>;

    // -- attempts

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt, StoreError>;

    /// Attempts by a user, newest first.
    async fn list_attempts(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, StoreError>;
}
