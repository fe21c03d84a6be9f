use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotePayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    #[serde(default)]
    pub q: String,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// GET /api/notes
pub async fn list_notes(
    state: web::Data<AppState>,
    query: web::Query<NotesQuery>,
) -> Result<HttpResponse, AppError> {
    let notes = state
        .notes
        .list(
            &query.q,
            query.sort_by.as_deref().unwrap_or("updated_at"),
            query.order.as_deref() == Some("asc"),
        )
        .await?;
    Ok(HttpResponse::Ok().json(notes))
}

/// POST /api/notes
pub async fn create_note(
    state: web::Data<AppState>,
    body: web::Json<NotePayload>,
) -> Result<HttpResponse, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    let note_id = state.notes.create(&body.title, &body.body).await?;
    let note = state.notes.get(note_id).await?;
    Ok(HttpResponse::Created().json(note.unwrap_or_else(|| json!({"id": note_id}))))
}

/// GET /api/notes/{id}
pub async fn get_note(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    match state.notes.get(path.into_inner()).await? {
        Some(note) => Ok(HttpResponse::Ok().json(note)),
        None => Err(AppError::NotFound("Note not found".to_string())),
    }
}

/// PUT /api/notes/{id}
pub async fn update_note(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<NotePayload>,
) -> Result<HttpResponse, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    let note_id = path.into_inner();
    if !state.notes.update(note_id, &body.title, &body.body).await? {
        return Err(AppError::NotFound("Note not found".to_string()));
    }
    let note = state.notes.get(note_id).await?;
    Ok(HttpResponse::Ok().json(note.unwrap_or_else(|| json!({"id": note_id}))))
}

/// DELETE /api/notes/{id}
pub async fn delete_note(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if !state.notes.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Note not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({"deleted": true})))
}
