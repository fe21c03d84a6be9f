use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Liveness + database reachability.
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let db_ok = state.jobs.count().await.is_ok();
    Ok(HttpResponse::Ok().json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
    })))
}
