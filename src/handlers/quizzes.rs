// src/handlers/quizzes.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{error::AppError, state::AppState, utils::jwt::Claims};

use super::documents::owned_document;

/// Lists the quizzes generated for a document, newest first.
pub async fn list_document_quizzes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let document = owned_document(&state, user_id, document_id).await?;

    let quizzes = state.db.list_quizzes_for_document(document.id).await?;
    Ok(Json(quizzes))
}

/// Retrieves a single quiz by ID, questions included.
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quiz = state
        .db
        .get_quiz(id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.user_id != user_id {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(Json(quiz))
}
