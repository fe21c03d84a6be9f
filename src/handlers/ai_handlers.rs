use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::config::settings::CLOUD_MODELS;
use crate::db::AnalysisListFilter;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptPayload {
    pub title: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub cv: String,
    #[serde(default)]
    pub about_me: String,
    #[serde(default)]
    pub preferences: String,
    #[serde(default)]
    pub extra_context: String,
    #[serde(default)]
    pub is_active: bool,
}

/// GET /api/ai-prompts
pub async fn list_prompts(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.ai_prompts.list().await?))
}

/// POST /api/ai-prompts
pub async fn create_prompt(
    state: web::Data<AppState>,
    body: web::Json<PromptPayload>,
) -> Result<HttpResponse, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    let prompt_id = state
        .ai_prompts
        .create(
            &body.title,
            &body.model,
            &body.cv,
            &body.about_me,
            &body.preferences,
            &body.extra_context,
            body.is_active,
        )
        .await?;
    let prompt = state.ai_prompts.get(prompt_id).await?;
    Ok(HttpResponse::Created()
        .json(prompt.map(|p| p.into_json()).unwrap_or_else(|| json!({"id": prompt_id}))))
}

/// GET /api/ai-prompts/{id}
pub async fn get_prompt(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    match state.ai_prompts.get(path.into_inner()).await? {
        Some(prompt) => Ok(HttpResponse::Ok().json(prompt.into_json())),
        None => Err(AppError::NotFound("Prompt not found".to_string())),
    }
}

/// PUT /api/ai-prompts/{id}
pub async fn update_prompt(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<PromptPayload>,
) -> Result<HttpResponse, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    let prompt_id = path.into_inner();
    let updated = state
        .ai_prompts
        .update(
            prompt_id,
            &body.title,
            &body.model,
            &body.cv,
            &body.about_me,
            &body.preferences,
            &body.extra_context,
            body.is_active,
        )
        .await?;
    if !updated {
        return Err(AppError::NotFound("Prompt not found".to_string()));
    }
    let prompt = state.ai_prompts.get(prompt_id).await?;
    Ok(HttpResponse::Ok()
        .json(prompt.map(|p| p.into_json()).unwrap_or_else(|| json!({"id": prompt_id}))))
}

/// DELETE /api/ai-prompts/{id}
pub async fn delete_prompt(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if !state.ai_prompts.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Prompt not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({"deleted": true})))
}

/// POST /api/ai-prompts/{id}/activate - atomically make this the only active
/// prompt.
pub async fn activate_prompt(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    if !state.ai_prompts.set_active(path.into_inner()).await? {
        return Err(AppError::NotFound("Prompt not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({"activated": true})))
}

/// GET /api/ollama/models - everything the model picker can offer.
pub async fn list_models(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let (available, local_models) = match state.llm.ollama().list_models().await {
        Ok(models) => (true, models),
        Err(_) => (false, Vec::new()),
    };

    let owui_available = state.llm.openwebui().is_configured();
    let owui_models = if owui_available {
        state.llm.openwebui().list_models().await.unwrap_or_default()
    } else {
        Vec::new()
    };

    let cloud_models: Vec<_> = CLOUD_MODELS
        .iter()
        .map(|(id, label)| json!({"id": id, "label": label}))
        .collect();

    let mut models: Vec<String> = local_models.clone();
    models.extend(owui_models.iter().map(|m| format!("owui:{}", m)));
    models.extend(CLOUD_MODELS.iter().map(|(id, _)| id.to_string()));

    Ok(HttpResponse::Ok().json(json!({
        "available": available,
        "local_models": local_models,
        "owui_models": owui_models,
        "owui_available": owui_available,
        "cloud_models": cloud_models,
        "models": models,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnalyseRequest {
    pub job_id: Option<String>,
    pub prompt_id: Option<i64>,
}

/// POST /api/ai-analyse - run one analysis for (job, prompt).
pub async fn analyse(
    state: web::Data<AppState>,
    body: web::Json<AnalyseRequest>,
) -> Result<HttpResponse, AppError> {
    let job_id = body
        .job_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("job_id is required".to_string()))?;
    let prompt_id = body
        .prompt_id
        .ok_or_else(|| AppError::BadRequest("prompt_id is required".to_string()))?;

    let outcome = state.analysis.analyse(job_id, prompt_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct AnalysesQuery {
    #[serde(default)]
    pub query: String,
    pub min_score: Option<i64>,
    /// Comma-separated subset of {apply, maybe, skip}.
    #[serde(default)]
    pub recommendation: String,
    pub prompt_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/ai-analyses
pub async fn list_analyses(
    state: web::Data<AppState>,
    query: web::Query<AnalysesQuery>,
) -> Result<HttpResponse, AppError> {
    let recommendations: Vec<String> = query
        .recommendation
        .split(',')
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect();

    let filter = AnalysisListFilter {
        query: query.query.clone(),
        min_score: query.min_score.unwrap_or(0),
        recommendations,
        prompt_id: query.prompt_id,
        limit: query.limit.unwrap_or(50),
        offset: query.offset.unwrap_or(0),
    };

    let (analyses, total) = state.ai_analyses.list(&filter).await?;
    Ok(HttpResponse::Ok().json(json!({"analyses": analyses, "total": total})))
}

/// GET /api/ai-analyses/{job_id}
pub async fn analyses_for_job(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let analyses = state.ai_analyses.get_for_job(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(analyses))
}
