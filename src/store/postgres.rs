// src/store/postgres.rs
//
// Postgres implementation of the metadata store.
//
// Queries are runtime-checked (`sqlx::query_as` with explicit row structs)
// and rows are converted to domain entities through explicit, fallible
// mapping functions so schema drift surfaces at the boundary instead of
// leaking half-renamed fields into the domain.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::attempt::{NewAttempt, QuizAttempt};
use crate::models::document::{Document, DocumentStatus, NewDocument};
use crate::models::quiz::{Difficulty, NewQuiz, Quiz, QuizQuestion};
use crate::models::user::{NewUser, Profile, User};

use super::{MetadataStore, StoreError, UserStats};

#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: Uuid,
    display_name: Option<String>,
    avatar_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    file_path: String,
    status: String,
    size_bytes: i64,
    page_count: Option<i32>,
    error_message: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct QuizRow {
    id: Uuid,
    document_id: Uuid,
    user_id: Uuid,
    title: String,
    questions: Json<Vec<QuizQuestion>>,
    difficulty: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct AttemptRow {
    id: Uuid,
    user_id: Uuid,
    quiz_id: Uuid,
    score: i32,
    total_questions: i32,
    answers: Json<Vec<i32>>,
    completed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
struct StatsRow {
    documents_count: i64,
    quizzes_completed: i64,
}

fn user_from_row(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
        password: row.password,
        created_at: row.created_at,
    }
}

fn profile_from_row(row: ProfileRow) -> Profile {
    Profile {
        user_id: row.user_id,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        created_at: row.created_at,
    }
}

fn document_from_row(row: DocumentRow) -> Result<Document, StoreError> {
    let status = row
        .status
        .parse::<DocumentStatus>()
        .map_err(StoreError::Database)?;
    Ok(Document {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        file_path: row.file_path,
        status,
        size_bytes: row.size_bytes,
        page_count: row.page_count,
        error_message: row.error_message,
        created_at: row.created_at,
    })
}

fn quiz_from_row(row: QuizRow) -> Result<Quiz, StoreError> {
    let difficulty = row
        .difficulty
        .parse::<Difficulty>()
        .map_err(StoreError::Database)?;
    Ok(Quiz {
        id: row.id,
        document_id: row.document_id,
        user_id: row.user_id,
        title: row.title,
        questions: row.questions.0,
        difficulty,
        created_at: row.created_at,
    })
}

fn attempt_from_row(row: AttemptRow) -> QuizAttempt {
    QuizAttempt {
        id: row.id,
        user_id: row.user_id,
        quiz_id: row.quiz_id,
        score: row.score,
        total_questions: row.total_questions,
        answers: row.answers.0,
        completed_at: row.completed_at,
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, password)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id, display_name) VALUES ($1, $2)")
            .bind(row.id)
            .bind(&user.display_name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user_from_row(row))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, display_name, avatar_url, created_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(profile_from_row))
    }

    async fn user_stats(&self, user_id: Uuid) -> Result<UserStats, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM documents WHERE user_id = $1) AS documents_count,
                (SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1) AS quizzes_completed
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            documents_count: row.documents_count,
            quizzes_completed: row.quizzes_completed,
        })
    }

    async fn insert_document(&self, doc: NewDocument) -> Result<Document, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, user_id, title, file_path, status, size_bytes, page_count)
            VALUES ($1, $2, $3, $4, 'uploaded', $5, $6)
            RETURNING id, user_id, title, file_path, status, size_bytes, page_count,
                      error_message, created_at
            "#,
        )
        .bind(doc.id)
        .bind(doc.user_id)
        .bind(&doc.title)
        .bind(&doc.file_path)
        .bind(doc.size_bytes)
        .bind(doc.page_count)
        .fetch_one(&self.pool)
        .await?;

        document_from_row(row)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, user_id, title, file_path, status, size_bytes, page_count,
                   error_message, created_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(document_from_row).transpose()
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, user_id, title, file_path, status, size_bytes, page_count,
                   error_message, created_at
            FROM documents
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(document_from_row).collect()
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = 'processing', error_message = NULL
            WHERE id = $1 AND status IN ('uploaded', 'error', 'ready')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE documents SET status = $2, error_message = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(error_message)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, StoreError> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            INSERT INTO quizzes (id, document_id, user_id, title, questions, difficulty)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, document_id, user_id, title, questions, difficulty, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(quiz.document_id)
        .bind(quiz.user_id)
        .bind(&quiz.title)
        .bind(Json(&quiz.questions))
        .bind(quiz.difficulty.as_str())
        .fetch_one(&self.pool)
        .await?;

        quiz_from_row(row)
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT id, document_id, user_id, title, questions, difficulty, created_at
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(quiz_from_row).transpose()
    }

    async fn list_quizzes_for_document(&self, document_id: Uuid) -> Result<Vec<Quiz>, StoreError> {
        let rows = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT id, document_id, user_id, title, questions, difficulty, created_at
            FROM quizzes
            WHERE document_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(quiz_from_row).collect()
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt, StoreError> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO quiz_attempts (id, user_id, quiz_id, score, total_questions, answers)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, quiz_id, score, total_questions, answers, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(attempt.score)
        .bind(attempt.total_questions)
        .bind(Json(&attempt.answers))
        .fetch_one(&self.pool)
        .await?;

        Ok(attempt_from_row(row))
    }

    async fn list_attempts(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, StoreError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT id, user_id, quiz_id, score, total_questions, answers, completed_at
            FROM quiz_attempts
            WHERE user_id = $1
            ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(attempt_from_row).collect())
    }
}
