use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::db::JobSearchFilter;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub remote: String,
    #[serde(default)]
    pub job_type: String,
    pub salary_min: Option<f64>,
    pub posted_in_last_days: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub include_not_interested: Option<String>,
    #[serde(default)]
    pub region: String,
}

/// GET /api/jobs - query saved jobs with filters + pagination.
pub async fn list_jobs(
    state: web::Data<AppState>,
    query: web::Query<JobsQuery>,
) -> Result<HttpResponse, AppError> {
    let include_ni = matches!(
        query.include_not_interested.as_deref(),
        Some("1") | Some("true") | Some("yes")
    );

    let filter = JobSearchFilter {
        query: query.q.clone(),
        source: query.source.clone(),
        remote: query.remote.clone(),
        job_type: query.job_type.clone(),
        salary_min: query.salary_min,
        posted_in_last_days: query
            .posted_in_last_days
            .filter(|d| *d > 0)
            .map(|d| d as u32),
        sort_by: query
            .sort_by
            .clone()
            .unwrap_or_else(|| "date_posted".to_string()),
        ascending: query.order.as_deref() == Some("asc"),
        exclude_not_interested: !include_ni,
        region: query.region.clone(),
    };

    let all_jobs = state.jobs.search(&filter).await?;

    let total = all_jobs.len() as i64;
    let per_page = query.per_page.unwrap_or(25).max(1);
    let total_pages = ((total + per_page - 1) / per_page).max(1);
    let page = query.page.unwrap_or(1).clamp(1, total_pages);
    let start = ((page - 1) * per_page) as usize;
    let end = (start + per_page as usize).min(all_jobs.len());

    Ok(HttpResponse::Ok().json(json!({
        "jobs": all_jobs[start..end],
        "pagination": {
            "page": page,
            "per_page": per_page,
            "total": total,
            "total_pages": total_pages,
        },
    })))
}

/// GET /api/jobs/{job_id} - single job with favourite/applied status.
pub async fn get_job(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job_id = path.into_inner();
    match state.jobs.get_job(&job_id).await? {
        Some(job) => Ok(HttpResponse::Ok().json(job)),
        None => Err(AppError::NotFound("Job not found".to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusesRequest {
    #[serde(default)]
    pub job_ids: Vec<String>,
}

/// POST /api/jobs/statuses - bulk favourite/applied/not-interested check.
pub async fn job_statuses(
    state: web::Data<AppState>,
    body: web::Json<StatusesRequest>,
) -> Result<HttpResponse, AppError> {
    let statuses = state.triage.get_job_statuses(&body.job_ids).await?;
    Ok(HttpResponse::Ok().json(statuses))
}

/// GET /api/export - download all jobs as CSV.
pub async fn export_csv(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let csv = state.jobs.export_csv_string().await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=jobs_export.csv",
        ))
        .body(csv))
}
