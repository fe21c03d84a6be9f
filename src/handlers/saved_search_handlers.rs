use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::db::SavedSearchRepository;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SavedSearchPayload {
    pub name: String,
    /// Opaque client configuration; stored and returned as-is.
    #[serde(default)]
    pub params: Value,
}

async fn create(
    repo: &Arc<SavedSearchRepository>,
    body: &SavedSearchPayload,
) -> Result<HttpResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    let search_id = repo.create(&body.name, &body.params).await?;
    let search = repo.get(search_id).await?;
    Ok(HttpResponse::Created().json(search.unwrap_or_else(|| json!({"id": search_id}))))
}

async fn update(
    repo: &Arc<SavedSearchRepository>,
    search_id: i64,
    body: &SavedSearchPayload,
) -> Result<HttpResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if !repo.update(search_id, &body.name, &body.params).await? {
        return Err(AppError::NotFound("Saved search not found".to_string()));
    }
    let search = repo.get(search_id).await?;
    Ok(HttpResponse::Ok().json(search.unwrap_or_else(|| json!({"id": search_id}))))
}

// ── /api/saved-searches ────────────────────────────────────────

pub async fn list_saved_searches(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.saved_searches.list().await?))
}

pub async fn create_saved_search(
    state: web::Data<AppState>,
    body: web::Json<SavedSearchPayload>,
) -> Result<HttpResponse, AppError> {
    create(&state.saved_searches, &body).await
}

pub async fn get_saved_search(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    match state.saved_searches.get(path.into_inner()).await? {
        Some(search) => Ok(HttpResponse::Ok().json(search)),
        None => Err(AppError::NotFound("Saved search not found".to_string())),
    }
}

pub async fn update_saved_search(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<SavedSearchPayload>,
) -> Result<HttpResponse, AppError> {
    update(&state.saved_searches, path.into_inner(), &body).await
}

pub async fn delete_saved_search(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if !state.saved_searches.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Saved search not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({"deleted": true})))
}

// ── /api/saved-board-searches ──────────────────────────────────

pub async fn list_saved_board_searches(
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.saved_board_searches.list().await?))
}

pub async fn create_saved_board_search(
    state: web::Data<AppState>,
    body: web::Json<SavedSearchPayload>,
) -> Result<HttpResponse, AppError> {
    create(&state.saved_board_searches, &body).await
}

pub async fn get_saved_board_search(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    match state.saved_board_searches.get(path.into_inner()).await? {
        Some(search) => Ok(HttpResponse::Ok().json(search)),
        None => Err(AppError::NotFound("Saved search not found".to_string())),
    }
}

pub async fn update_saved_board_search(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<SavedSearchPayload>,
) -> Result<HttpResponse, AppError> {
    update(&state.saved_board_searches, path.into_inner(), &body).await
}

pub async fn delete_saved_board_search(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if !state.saved_board_searches.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Saved search not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({"deleted": true})))
}
