// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::attempt::{NewAttempt, SubmitAttemptRequest},
    models::quiz::{OPTIONS_PER_QUESTION, QuizQuestion},
    state::AppState,
    utils::jwt::Claims,
};

/// Counts how many selected indices match the stored correct answers.
fn compute_score(questions: &[QuizQuestion], answers: &[i32]) -> i32 {
    questions
        .iter()
        .zip(answers)
        .filter(|&(ref question, &answer)| {
            answer >= 0 && (answer as usize) == question.correct_answer
        })
        .count() as i32
}

/// Records one completed quiz playthrough.
///
/// The score is recomputed from the stored quiz rather than trusted from
/// the client; the attempt row itself is immutable once inserted.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let quiz = state
        .db
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.user_id != user_id {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let total_questions = quiz.questions.len();
    if payload.answers.len() != total_questions {
        return Err(AppError::BadRequest(format!(
            "Expected {} answers, got {}",
            total_questions,
            payload.answers.len()
        )));
    }
    if let Some(&bad) = payload
        .answers
        .iter()
        .find(|&&answer| answer < 0 || answer as usize >= OPTIONS_PER_QUESTION)
    {
        return Err(AppError::BadRequest(format!(
            "Answer index {} is out of range",
            bad
        )));
    }

    let score = compute_score(&quiz.questions, &payload.answers);

    let attempt = state
        .db
        .insert_attempt(NewAttempt {
            user_id,
            quiz_id: quiz.id,
            score,
            total_questions: total_questions as i32,
            answers: payload.answers,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Lists the current user's attempts, newest first.
pub async fn list_my_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempts = state.db.list_attempts(user_id).await?;
    Ok(Json(attempts))
}
