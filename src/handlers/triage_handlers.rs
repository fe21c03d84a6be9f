use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/favourite/{job_id}
pub async fn add_favourite(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let added = state.triage.add_favourite(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({"added": added})))
}

/// DELETE /api/favourite/{job_id}
pub async fn remove_favourite(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let removed = state.triage.remove_favourite(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({"removed": removed})))
}

/// GET /api/favourites
pub async fn list_favourites(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let favourites = state.triage.get_favourites().await?;
    Ok(HttpResponse::Ok().json(favourites))
}

#[derive(Debug, Deserialize)]
pub struct ApplicationRequest {
    #[serde(default)]
    pub notes: String,
}

/// POST /api/applied/{job_id}
pub async fn add_application(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<ApplicationRequest>>,
) -> Result<HttpResponse, AppError> {
    let notes = body.map(|b| b.notes.clone()).unwrap_or_default();
    let added = state
        .triage
        .add_application(&path.into_inner(), &notes)
        .await?;
    Ok(HttpResponse::Ok().json(json!({"added": added})))
}

/// DELETE /api/applied/{job_id}
pub async fn remove_application(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let removed = state.triage.remove_application(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({"removed": removed})))
}

/// PUT /api/applied/{job_id}/notes
pub async fn update_application_notes(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ApplicationRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = state
        .triage
        .update_application_notes(&path.into_inner(), &body.notes)
        .await?;
    if !updated {
        return Err(AppError::NotFound("Application not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({"updated": true})))
}

/// GET /api/applications
pub async fn list_applications(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let applications = state.triage.get_applications().await?;
    Ok(HttpResponse::Ok().json(applications))
}

/// POST /api/not-interested/{job_id}
pub async fn add_not_interested(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let added = state.triage.add_not_interested(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({"added": added})))
}

/// DELETE /api/not-interested/{job_id}
pub async fn remove_not_interested(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let removed = state
        .triage
        .remove_not_interested(&path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({"removed": removed})))
}
