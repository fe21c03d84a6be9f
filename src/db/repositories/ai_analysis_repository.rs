use chrono::NaiveDateTime;
use serde_json::{Value, json};
use sqlx::mysql::MySqlPool;
use sqlx::QueryBuilder;

use crate::db::fmt_ts;
use crate::error::{AppError, AppResult};

/// Filters for the analyses list endpoint.
#[derive(Debug, Clone, Default)]
pub struct AnalysisListFilter {
    pub query: String,
    pub min_score: i64,
    pub recommendations: Vec<String>,
    pub prompt_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct AnalysisRow {
    id: i64,
    job_id: String,
    prompt_id: i64,
    model: String,
    result: Value,
    created_at: NaiveDateTime,
    prompt_title: Option<String>,
    prompt_model: Option<String>,
}

impl AnalysisRow {
    fn into_json(self) -> Value {
        json!({
            "id": self.id,
            "job_id": self.job_id,
            "prompt_id": self.prompt_id,
            "model": self.model,
            "result": self.result,
            "created_at": fmt_ts(self.created_at),
            "prompt_title": self.prompt_title.unwrap_or_default(),
            "prompt_model": self.prompt_model.unwrap_or_default(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnalysisListRow {
    analysis_id: i64,
    job_id: String,
    prompt_id: i64,
    analysis_model: String,
    result: Value,
    analysed_at: NaiveDateTime,
    title: String,
    company: String,
    location: String,
    remote: String,
    job_type: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: String,
    url: String,
    source: String,
    company_logo: String,
    is_favourite: i64,
    is_applied: i64,
    is_not_interested: i64,
    prompt_title: Option<String>,
}

impl AnalysisListRow {
    fn into_json(self) -> Value {
        json!({
            "analysis_id": self.analysis_id,
            "job_id": self.job_id,
            "prompt_id": self.prompt_id,
            "analysis_model": self.analysis_model,
            "result": self.result,
            "analysed_at": fmt_ts(self.analysed_at),
            "title": self.title,
            "company": self.company,
            "location": self.location,
            "remote": self.remote,
            "job_type": self.job_type,
            "salary_min": self.salary_min.map(Value::from).unwrap_or(Value::String(String::new())),
            "salary_max": self.salary_max.map(Value::from).unwrap_or(Value::String(String::new())),
            "salary_currency": self.salary_currency,
            "url": self.url,
            "source": self.source,
            "company_logo": self.company_logo,
            "is_favourite": self.is_favourite != 0,
            "is_applied": self.is_applied != 0,
            "is_not_interested": self.is_not_interested != 0,
            "prompt_title": self.prompt_title.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct AiAnalysisRepository {
    pool: MySqlPool,
}

impl AiAnalysisRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Upsert an analysis result for a (job, prompt) pair. Re-running an
    /// analysis overwrites the previous result and refreshes created_at to the
    /// latest run. Returns the row id.
    pub async fn save(
        &self,
        job_id: &str,
        prompt_id: i64,
        model: &str,
        result: &Value,
    ) -> AppResult<i64> {
        sqlx::query(
            "INSERT INTO ai_analyses (job_id, prompt_id, model, result)
             VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                 model      = VALUES(model),
                 result     = VALUES(result),
                 created_at = NOW()",
        )
        .bind(job_id)
        .bind(prompt_id)
        .bind(model)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        // last_insert_id is unreliable across the upsert path; read it back.
        let analysis_id: i64 =
            sqlx::query_scalar("SELECT id FROM ai_analyses WHERE job_id = ? AND prompt_id = ?")
                .bind(job_id)
                .bind(prompt_id)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(analysis_id)
    }

    /// All analyses for a job, newest first, with the prompt title joined in.
    pub async fn get_for_job(&self, job_id: &str) -> AppResult<Vec<Value>> {
        let rows: Vec<AnalysisRow> = sqlx::query_as(
            "SELECT a.id, a.job_id, a.prompt_id, a.model, a.result, a.created_at,
                    p.title AS prompt_title, p.model AS prompt_model
             FROM ai_analyses a
             LEFT JOIN ai_prompts p ON p.id = a.prompt_id
             WHERE a.job_id = ?
             ORDER BY a.created_at DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(AnalysisRow::into_json).collect())
    }

    /// Paginated list of analyses joined with job data, newest first.
    /// Returns (rows, total_count).
    pub async fn list(&self, filter: &AnalysisListFilter) -> AppResult<(Vec<Value>, i64)> {
        fn push_conditions<'a>(
            qb: &mut QueryBuilder<'a, sqlx::MySql>,
            filter: &'a AnalysisListFilter,
        ) {
            qb.push(
                " FROM ai_analyses a
                  JOIN jobs j ON a.job_id = j.job_id
                  LEFT JOIN ai_prompts p ON p.id = a.prompt_id
                  LEFT JOIN favourites fav ON fav.job_id = j.job_id
                  LEFT JOIN applications app ON app.job_id = j.job_id
                  LEFT JOIN not_interested ni ON ni.job_id = j.job_id",
            );
            let mut has_where = false;
            let mut sep = |qb: &mut QueryBuilder<'a, sqlx::MySql>| {
                if has_where {
                    qb.push(" AND ");
                } else {
                    qb.push(" WHERE ");
                    has_where = true;
                }
            };

            if filter.min_score > 0 {
                sep(qb);
                qb.push("CAST(JSON_EXTRACT(a.result, '$.match_score') AS UNSIGNED) >= ");
                qb.push_bind(filter.min_score);
            }
            if !filter.recommendations.is_empty() {
                sep(qb);
                qb.push("JSON_UNQUOTE(JSON_EXTRACT(a.result, '$.recommendation')) IN (");
                for (i, rec) in filter.recommendations.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    qb.push_bind(rec.as_str());
                }
                qb.push(")");
            }
            if let Some(prompt_id) = filter.prompt_id {
                sep(qb);
                qb.push("a.prompt_id = ");
                qb.push_bind(prompt_id);
            }
            if !filter.query.is_empty() {
                let like = format!("%{}%", filter.query);
                sep(qb);
                qb.push("(LOWER(j.title) LIKE LOWER(");
                qb.push_bind(like.clone());
                qb.push(") OR LOWER(j.company) LIKE LOWER(");
                qb.push_bind(like.clone());
                qb.push(") OR LOWER(CONVERT(a.result USING utf8mb4)) LIKE LOWER(");
                qb.push_bind(like);
                qb.push("))");
            }
        }

        let mut count_qb: QueryBuilder<sqlx::MySql> = QueryBuilder::new("SELECT COUNT(*)");
        push_conditions(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        let mut qb: QueryBuilder<sqlx::MySql> = QueryBuilder::new(
            "SELECT
                a.id              AS analysis_id,
                a.job_id,
                a.prompt_id,
                a.model           AS analysis_model,
                a.result,
                a.created_at      AS analysed_at,
                j.title,
                j.company,
                j.location,
                j.remote,
                j.job_type,
                j.salary_min,
                j.salary_max,
                j.salary_currency,
                j.url,
                j.source,
                j.company_logo,
                IF(fav.job_id IS NOT NULL, 1, 0) AS is_favourite,
                IF(app.job_id IS NOT NULL, 1, 0) AS is_applied,
                IF(ni.job_id IS NOT NULL, 1, 0)  AS is_not_interested,
                p.title           AS prompt_title",
        );
        push_conditions(&mut qb, filter);
        qb.push(" ORDER BY a.created_at DESC LIMIT ");
        qb.push_bind(filter.limit.max(1));
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset.max(0));

        let rows: Vec<AnalysisListRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok((
            rows.into_iter().map(AnalysisListRow::into_json).collect(),
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Job;

    #[tokio::test]
    async fn save_upserts_on_job_and_prompt_pair() {
        // Database-backed test; only runs when one is available.
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .connect(&url)
            .await
            .unwrap();
        let repo = AiAnalysisRepository::new(pool.clone());

        let job = Job {
            title: "Upsert Target".to_string(),
            company: "Acme".to_string(),
            url: format!("https://example.com/{}", uuid::Uuid::new_v4()),
            source: "AnalysisTest".to_string(),
            ..Default::default()
        }
        .finalize();
        crate::db::JobRepository::new(pool.clone())
            .save_jobs(std::slice::from_ref(&job))
            .await
            .unwrap();
        let prompt_id = crate::db::AiPromptRepository::new(pool.clone())
            .create("Upsert prompt", "gpt-4o", "", "", "", "", false)
            .await
            .unwrap();

        let first = repo
            .save(&job.job_id, prompt_id, "gpt-4o", &json!({"match_score": 5}))
            .await
            .unwrap();
        let second = repo
            .save(&job.job_id, prompt_id, "gpt-4o-mini", &json!({"match_score": 9}))
            .await
            .unwrap();
        assert_eq!(first, second);

        let rows = repo.get_for_job(&job.job_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["model"], "gpt-4o-mini");
        assert_eq!(rows[0]["result"]["match_score"], 9);

        sqlx::query("DELETE FROM ai_analyses WHERE job_id = ?")
            .bind(&job.job_id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM jobs WHERE job_id = ?")
            .bind(&job.job_id)
            .execute(&pool)
            .await
            .unwrap();
        crate::db::AiPromptRepository::new(pool)
            .delete(prompt_id)
            .await
            .unwrap();
    }
}
