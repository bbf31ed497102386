// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, models::user::MeResponse, state::AppState, utils::jwt::Claims};

/// Get current user's profile and statistics.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let profile = state.db.get_profile(user_id).await?;
    let stats = state.db.user_stats(user_id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        display_name: profile.as_ref().and_then(|p| p.display_name.clone()),
        avatar_url: profile.as_ref().and_then(|p| p.avatar_url.clone()),
        created_at: user.created_at,
        documents_count: stats.documents_count,
        quizzes_completed: stats.quizzes_completed,
    }))
}
