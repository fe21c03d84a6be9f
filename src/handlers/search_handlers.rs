use actix_web::{HttpResponse, web};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::models::SearchParams;
use crate::state::AppState;

fn default_remote() -> String {
    "Any".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// A comma-separated string or a list of strings.
    #[serde(default)]
    pub keywords: Value,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default)]
    pub job_type: String,
    /// Number or numeric string.
    #[serde(default)]
    pub salary_min: Value,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub max_results_per_source: Option<usize>,
    #[serde(default)]
    pub posted_in_last_days: Option<i64>,
}

fn parse_keywords(raw: &Value) -> Vec<String> {
    match raw {
        Value::String(s) => s
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        Value::Array(list) => list
            .iter()
            .filter_map(Value::as_str)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_salary_min(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| *v > 0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| *v > 0.0),
        _ => None,
    }
}

/// POST /api/search - start a background search across selected sources.
pub async fn start_search(
    state: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, AppError> {
    let keywords = parse_keywords(&body.keywords);
    let posted_in_last_days = body
        .posted_in_last_days
        .filter(|d| *d > 0)
        .map(|d| d as u32);
    let max_results = body
        .max_results_per_source
        .unwrap_or(state.settings.scrape.max_results_per_source);

    let params = SearchParams {
        keywords: keywords.clone(),
        location: body.location.clone(),
        remote: body.remote.clone(),
        job_type: body.job_type.clone(),
        salary_min: parse_salary_min(&body.salary_min),
        experience_level: body.experience_level.clone(),
        sources: body.sources.clone(),
        max_results_per_source: max_results,
        posted_in_last_days,
    };

    let task_id = state.search_manager.start_search(params).await;

    info!(
        "Search started [{}]  keywords={:?}  location={}  remote={}  sources={}  max={}",
        task_id,
        keywords,
        if body.location.is_empty() { "(any)" } else { &body.location },
        body.remote,
        body.sources
            .as_ref()
            .map(|s| s.len().to_string())
            .unwrap_or_else(|| "all".to_string()),
        max_results,
    );

    Ok(HttpResponse::Ok().json(json!({"task_id": task_id, "status": "started"})))
}

/// GET /api/search/{task_id} - poll search progress.
pub async fn search_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let task_id = path.into_inner();
    match state.search_manager.get_task(&task_id).await {
        Some(snapshot) => Ok(HttpResponse::Ok().json(snapshot)),
        None => Err(AppError::NotFound("Task not found".to_string())),
    }
}

/// POST /api/search/{task_id}/cancel - request cancellation of a running
/// search.
pub async fn cancel_search(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let task_id = path.into_inner();
    if !state.search_manager.cancel_search(&task_id).await {
        return Err(AppError::BadRequest(
            "Task not found or not running".to_string(),
        ));
    }
    Ok(HttpResponse::Ok().json(json!({"status": "cancellation requested"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keywords_accept_string_or_list() {
        assert_eq!(
            parse_keywords(&json!("data analyst, rust , ")),
            vec!["data analyst", "rust"]
        );
        assert_eq!(
            parse_keywords(&json!(["python", " go "])),
            vec!["python", "go"]
        );
        assert!(parse_keywords(&json!(null)).is_empty());
    }

    #[test]
    fn salary_min_accepts_number_or_string() {
        assert_eq!(parse_salary_min(&json!(60000)), Some(60000.0));
        assert_eq!(parse_salary_min(&json!("60000")), Some(60000.0));
        assert_eq!(parse_salary_min(&json!("not a number")), None);
        assert_eq!(parse_salary_min(&json!(null)), None);
    }
}
