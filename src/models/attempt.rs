// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One completed run through a quiz. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    /// Selected option index per question, in question order.
    pub answers: Vec<i32>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Input for recording an attempt. Invariants (`answers.len() ==
/// total_questions`, `0 <= score <= total_questions`) are enforced by the
/// submitting handler; the store is a bare insert.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub answers: Vec<i32>,
}

/// Body of `POST /api/quizzes/{id}/attempts`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(min = 1))]
    pub answers: Vec<i32>,
}
