// src/handlers/documents.rs

use std::path::Path as FsPath;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::document::{Document, NewDocument},
    models::quiz::GenerateQuizRequest,
    processing::{DocumentProcessor, GenerateOptions},
    state::AppState,
    utils::jwt::Claims,
};

/// Fetches a document and enforces ownership. Foreign documents read as
/// not-found rather than forbidden, so ids are not probeable.
pub(crate) async fn owned_document(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
) -> Result<Document, AppError> {
    let document = state
        .db
        .get_document(id)
        .await?
        .ok_or(AppError::NotFound("Document not found".to_string()))?;

    if document.user_id != user_id {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    Ok(document)
}

/// Uploads a PDF document.
///
/// Multipart form with a required `file` part and an optional `title` part.
/// The blob is written to the object store first; if the metadata insert
/// then fails, the blob is deleted again so no orphaned storage remains.
/// Caching the bytes locally is an optimization and never fails the upload.
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut file: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((bytes.to_vec(), filename, content_type));
            }
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read title: {}", e)))?;
                title = Some(text);
            }
            _ => {}
        }
    }

    let (bytes, filename, content_type) =
        file.ok_or(AppError::BadRequest("Missing 'file' field".to_string()))?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > state.config.max_upload_bytes {
        return Err(AppError::BadRequest(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        )));
    }

    let looks_like_pdf = content_type.as_deref() == Some("application/pdf")
        || filename
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"));
    if !looks_like_pdf {
        return Err(AppError::BadRequest(
            "Only PDF uploads are supported".to_string(),
        ));
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            filename.as_deref().and_then(|name| {
                FsPath::new(name)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| "Untitled document".to_string());

    let document_id = Uuid::new_v4();
    let file_path = format!("{}/{}.pdf", user_id, document_id);

    state
        .objects
        .put(&file_path, &bytes, "application/pdf")
        .await?;

    let document = match state
        .db
        .insert_document(NewDocument {
            id: document_id,
            user_id,
            title,
            file_path: file_path.clone(),
            size_bytes: bytes.len() as i64,
            page_count: None,
        })
        .await
    {
        Ok(document) => document,
        Err(e) => {
            // Compensating delete so a failed insert leaves no orphaned blob.
            if let Err(cleanup) = state.objects.delete(&file_path).await {
                tracing::error!(
                    "Failed to clean up blob {} after insert failure: {}",
                    file_path,
                    cleanup
                );
            }
            return Err(e.into());
        }
    };

    if let Err(e) = state.cache.store(document_id, &bytes).await {
        tracing::warn!("Failed to cache document {}: {}", document_id, e);
    }

    Ok((StatusCode::CREATED, Json(document)))
}

/// Lists the current user's documents, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let documents = state.db.list_documents(user_id).await?;
    Ok(Json(documents))
}

/// Retrieves a single document by ID.
pub async fn get_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let document = owned_document(&state, user_id, id).await?;
    Ok(Json(document))
}

/// Deletes a document and everything hanging off it: the blob, the
/// metadata row (quizzes and attempts cascade), and the local cache entry.
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let document = owned_document(&state, user_id, id).await?;

    // Blob first: if this fails the row stays and the delete can be retried.
    state.objects.delete(&document.file_path).await?;
    state.db.delete_document(document.id).await?;
    state.cache.evict(document.id).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Runs the generation pipeline for a document.
///
/// Returns 201 with the new quiz on success. Pipeline failures come back
/// as `{error, kind}` so the client can distinguish a cache miss (prompt
/// re-upload) from a generation failure (offer retry) or a concurrent run.
pub async fn generate_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let document = owned_document(&state, user_id, id).await?;

    let mut options = GenerateOptions::default();
    if let Some(num_questions) = payload.num_questions {
        options.num_questions = num_questions;
    }
    if let Some(difficulty) = payload.difficulty {
        options.difficulty = difficulty;
    }

    let processor =
        DocumentProcessor::new(state.db.clone(), state.cache.clone(), state.ai.clone());
    let quiz = processor.process(&document, options).await?;

    Ok((StatusCode::CREATED, Json(quiz)))
}
