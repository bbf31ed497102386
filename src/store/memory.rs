// src/store/memory.rs
//
// In-memory metadata store. Backs integration tests so the full HTTP
// surface can run without Postgres; mirrors the Postgres implementation's
// semantics, including the conditional processing claim.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::attempt::{NewAttempt, QuizAttempt};
use crate::models::document::{Document, DocumentStatus, NewDocument};
use crate::models::quiz::{NewQuiz, Quiz};
use crate::models::user::{NewUser, Profile, User};

use super::{MetadataStore, StoreError, UserStats};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    documents: HashMap<Uuid, Document>,
    quizzes: HashMap<Uuid, Quiz>,
    attempts: Vec<QuizAttempt>,
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<Inner>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(format!(
                "users_username_key: {}",
                user.username
            )));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            password: user.password_hash,
            created_at: now,
        };
        inner.users.insert(created.id, created.clone());
        inner.profiles.insert(
            created.id,
            Profile {
                user_id: created.id,
                display_name: user.display_name,
                avatar_url: None,
                created_at: now,
            },
        );

        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&user_id).cloned())
    }

    async fn user_stats(&self, user_id: Uuid) -> Result<UserStats, StoreError> {
        let inner = self.inner.read().await;
        Ok(UserStats {
            documents_count: inner
                .documents
                .values()
                .filter(|d| d.user_id == user_id)
                .count() as i64,
            quizzes_completed: inner
                .attempts
                .iter()
                .filter(|a| a.user_id == user_id)
                .count() as i64,
        })
    }

    async fn insert_document(&self, doc: NewDocument) -> Result<Document, StoreError> {
        let mut inner = self.inner.write().await;

        let created = Document {
            id: doc.id,
            user_id: doc.user_id,
            title: doc.title,
            file_path: doc.file_path,
            status: DocumentStatus::Uploaded,
            size_bytes: doc.size_bytes,
            page_count: doc.page_count,
            error_message: None,
            created_at: Utc::now(),
        };
        inner.documents.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(&id).cloned())
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.documents.get_mut(&id) {
            Some(doc)
                if matches!(
                    doc.status,
                    DocumentStatus::Uploaded | DocumentStatus::Error | DocumentStatus::Ready
                ) =>
            {
                doc.status = DocumentStatus::Processing;
                doc.error_message = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(doc) = inner.documents.get_mut(&id) {
            doc.status = status;
            doc.error_message = error_message.map(str::to_string);
        }
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.documents.remove(&id);

        let quiz_ids: Vec<Uuid> = inner
            .quizzes
            .values()
            .filter(|q| q.document_id == id)
            .map(|q| q.id)
            .collect();
        for quiz_id in &quiz_ids {
            inner.quizzes.remove(quiz_id);
        }
        inner.attempts.retain(|a| !quiz_ids.contains(&a.quiz_id));

        Ok(())
    }

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, StoreError> {
        let mut inner = self.inner.write().await;

        let created = Quiz {
            id: Uuid::new_v4(),
            document_id: quiz.document_id,
            user_id: quiz.user_id,
            title: quiz.title,
            questions: quiz.questions,
            difficulty: quiz.difficulty,
            created_at: Utc::now(),
        };
        inner.quizzes.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.quizzes.get(&id).cloned())
    }

    async fn list_quizzes_for_document(&self, document_id: Uuid) -> Result<Vec<Quiz>, StoreError> {
        let inner = self.inner.read().await;
        let mut quizzes: Vec<Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.document_id == document_id)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt, StoreError> {
        let mut inner = self.inner.write().await;

        let created = QuizAttempt {
            id: Uuid::new_v4(),
            user_id: attempt.user_id,
            quiz_id: attempt.quiz_id,
            score: attempt.score,
            total_questions: attempt.total_questions,
            answers: attempt.answers,
            completed_at: Utc::now(),
        };
        inner.attempts.push(created.clone());

        Ok(created)
    }

    async fn list_attempts(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, StoreError> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<QuizAttempt> = inner
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_document(user_id: Uuid) -> NewDocument {
        let id = Uuid::new_v4();
        NewDocument {
            id,
            user_id,
            title: "Notes".to_string(),
            file_path: format!("{}/{}.pdf", user_id, id),
            size_bytes: 1024,
            page_count: None,
        }
    }

    #[tokio::test]
    async fn claim_moves_uploaded_to_processing_once() {
        let store = MemoryMetadataStore::new();
        let doc = store
            .insert_document(new_document(Uuid::new_v4()))
            .await
            .expect("insert");

        assert!(store.claim_for_processing(doc.id).await.expect("claim"));
        // Second claim while processing is rejected.
        assert!(!store.claim_for_processing(doc.id).await.expect("claim"));

        let stored = store
            .get_document(doc.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(stored.status, DocumentStatus::Processing);
    }

    #[tokio::test]
    async fn claim_is_allowed_from_error_and_ready() {
        let store = MemoryMetadataStore::new();
        let doc = store
            .insert_document(new_document(Uuid::new_v4()))
            .await
            .expect("insert");

        for status in [DocumentStatus::Error, DocumentStatus::Ready] {
            store
                .set_document_status(doc.id, status, None)
                .await
                .expect("set status");
            assert!(store.claim_for_processing(doc.id).await.expect("claim"));
            let stored = store
                .get_document(doc.id)
                .await
                .expect("get")
                .expect("present");
            assert_eq!(stored.status, DocumentStatus::Processing);
        }
    }

    #[tokio::test]
    async fn claim_on_missing_document_is_false() {
        let store = MemoryMetadataStore::new();
        assert!(!store
            .claim_for_processing(Uuid::new_v4())
            .await
            .expect("claim"));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let store = MemoryMetadataStore::new();
        let user = NewUser {
            username: "sam".to_string(),
            password_hash: "hash".to_string(),
            display_name: None,
        };

        store.create_user(user.clone()).await.expect("create");
        let err = store.create_user(user).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }
}
