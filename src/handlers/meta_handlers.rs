use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::error::AppError;
use crate::models::region::region_labels;
use crate::sources;
use crate::state::AppState;

/// GET /api/regions - labels for the region filter dropdown.
pub async fn list_regions() -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(region_labels()))
}

/// GET /api/sources - every registered source with availability.
pub async fn list_sources(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let registry = sources::registry(&state.settings);
    let info: Vec<_> = registry
        .iter()
        .map(|source| {
            json!({
                "name": source.name(),
                "available": source.is_available(),
            })
        })
        .collect();
    Ok(HttpResponse::Ok().json(info))
}

/// GET /api/stats - dashboard summary statistics.
pub async fn stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.jobs.get_stats().await?))
}
