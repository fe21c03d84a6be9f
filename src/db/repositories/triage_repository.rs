use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde_json::{Value, json};
use sqlx::mysql::MySqlPool;

use crate::db::fmt_ts;
use crate::error::{AppError, AppResult};

/// Favourites, applications and not-interested marks. All three are sideband
/// tables keyed by job_id; a job may sit in any subset of them.
#[derive(Clone)]
pub struct TriageRepository {
    pool: MySqlPool,
}

#[derive(Debug, sqlx::FromRow)]
struct TriagedJobRow {
    job_id: String,
    title: String,
    company: String,
    location: String,
    url: String,
    source: String,
    remote: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: String,
    job_type: String,
    date_posted: String,
    date_scraped: NaiveDateTime,
    company_logo: String,
    marked_at: NaiveDateTime,
    notes: Option<String>,
    cross_flag: i64,
}

impl TriagedJobRow {
    fn into_json(self, marked_key: &str, cross_key: &str) -> Value {
        let mut value = json!({
            "job_id": self.job_id,
            "title": self.title,
            "company": self.company,
            "location": self.location,
            "url": self.url,
            "source": self.source,
            "remote": self.remote,
            "salary_min": self.salary_min.map(Value::from).unwrap_or(Value::String(String::new())),
            "salary_max": self.salary_max.map(Value::from).unwrap_or(Value::String(String::new())),
            "salary_currency": self.salary_currency,
            "job_type": self.job_type,
            "date_posted": self.date_posted,
            "date_scraped": fmt_ts(self.date_scraped),
            "company_logo": self.company_logo,
            "application_notes": self.notes.unwrap_or_default(),
        });
        let map = value.as_object_mut().unwrap();
        map.insert(marked_key.to_string(), json!(fmt_ts(self.marked_at)));
        map.insert(cross_key.to_string(), json!(self.cross_flag != 0));
        value
    }
}

impl TriageRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    // ── favourites ─────────────────────────────────────────────

    /// Returns true when the job was newly favourited.
    pub async fn add_favourite(&self, job_id: &str) -> AppResult<bool> {
        let result = sqlx::query("INSERT IGNORE INTO favourites (job_id) VALUES (?)")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_favourite(&self, job_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM favourites WHERE job_id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_favourites(&self) -> AppResult<Vec<Value>> {
        let rows: Vec<TriagedJobRow> = sqlx::query_as(
            "SELECT j.job_id, j.title, j.company, j.location, j.url, j.source,
                    j.remote, j.salary_min, j.salary_max, j.salary_currency,
                    j.job_type, j.date_posted, j.date_scraped, j.company_logo,
                    f.created_at AS marked_at,
                    NULL AS notes,
                    IF(a.job_id IS NOT NULL, 1, 0) AS cross_flag
             FROM favourites f
             JOIN jobs j ON j.job_id = f.job_id
             LEFT JOIN applications a ON a.job_id = j.job_id
             ORDER BY f.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let mut v = r.into_json("favourited_at", "is_applied");
                v.as_object_mut()
                    .unwrap()
                    .insert("is_favourite".into(), json!(true));
                v
            })
            .collect())
    }

    pub async fn get_favourite_job_ids(&self) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT job_id FROM favourites")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(ids.into_iter().collect())
    }

    // ── applications ───────────────────────────────────────────

    /// Returns true when the job was newly marked as applied.
    pub async fn add_application(&self, job_id: &str, notes: &str) -> AppResult<bool> {
        let result = sqlx::query("INSERT IGNORE INTO applications (job_id, notes) VALUES (?, ?)")
            .bind(job_id)
            .bind(notes)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_application(&self, job_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE job_id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_application_notes(&self, job_id: &str, notes: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE applications SET notes = ? WHERE job_id = ?")
            .bind(notes)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_applications(&self) -> AppResult<Vec<Value>> {
        let rows: Vec<TriagedJobRow> = sqlx::query_as(
            "SELECT j.job_id, j.title, j.company, j.location, j.url, j.source,
                    j.remote, j.salary_min, j.salary_max, j.salary_currency,
                    j.job_type, j.date_posted, j.date_scraped, j.company_logo,
                    a.applied_at AS marked_at,
                    a.notes,
                    IF(f.job_id IS NOT NULL, 1, 0) AS cross_flag
             FROM applications a
             JOIN jobs j ON j.job_id = a.job_id
             LEFT JOIN favourites f ON f.job_id = j.job_id
             ORDER BY a.applied_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let mut v = r.into_json("applied_at", "is_favourite");
                v.as_object_mut()
                    .unwrap()
                    .insert("is_applied".into(), json!(true));
                v
            })
            .collect())
    }

    pub async fn get_applied_job_ids(&self) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT job_id FROM applications")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(ids.into_iter().collect())
    }

    // ── not interested ─────────────────────────────────────────

    pub async fn add_not_interested(&self, job_id: &str) -> AppResult<bool> {
        let result = sqlx::query("INSERT IGNORE INTO not_interested (job_id) VALUES (?)")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_not_interested(&self, job_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM not_interested WHERE job_id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_not_interested_job_ids(&self) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT job_id FROM not_interested")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(ids.into_iter().collect())
    }

    // ── bulk status ────────────────────────────────────────────

    /// For a list of job_ids, report which are favourited, applied and/or not
    /// interested; used by the client to decorate listings in one round trip.
    pub async fn get_job_statuses(&self, job_ids: &[String]) -> AppResult<Value> {
        if job_ids.is_empty() {
            return Ok(json!({}));
        }

        let fav_ids = self.get_favourite_job_ids().await?;
        let app_ids = self.get_applied_job_ids().await?;
        let ni_ids = self.get_not_interested_job_ids().await?;

        let mut map = serde_json::Map::new();
        for job_id in job_ids {
            map.insert(
                job_id.clone(),
                json!({
                    "is_favourite": fav_ids.contains(job_id),
                    "is_applied": app_ids.contains(job_id),
                    "is_not_interested": ni_ids.contains(job_id),
                }),
            );
        }
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Job;

    #[tokio::test]
    async fn favourite_add_is_idempotent() {
        // Database-backed test; only runs when one is available.
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .connect(&url)
            .await
            .unwrap();
        let repo = TriageRepository::new(pool.clone());

        let job = Job {
            title: "Favourite Target".to_string(),
            company: "Acme".to_string(),
            url: format!("https://example.com/{}", uuid::Uuid::new_v4()),
            source: "TriageTest".to_string(),
            ..Default::default()
        }
        .finalize();
        crate::db::JobRepository::new(pool.clone())
            .save_jobs(std::slice::from_ref(&job))
            .await
            .unwrap();

        assert!(repo.add_favourite(&job.job_id).await.unwrap());
        assert!(!repo.add_favourite(&job.job_id).await.unwrap());

        let statuses = repo
            .get_job_statuses(std::slice::from_ref(&job.job_id))
            .await
            .unwrap();
        assert_eq!(statuses[&job.job_id]["is_favourite"], true);
        assert_eq!(statuses[&job.job_id]["is_applied"], false);

        assert!(repo.remove_favourite(&job.job_id).await.unwrap());
        assert!(!repo.remove_favourite(&job.job_id).await.unwrap());

        sqlx::query("DELETE FROM jobs WHERE job_id = ?")
            .bind(&job.job_id)
            .execute(&pool)
            .await
            .unwrap();
    }
}
