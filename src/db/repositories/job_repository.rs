use chrono::NaiveDateTime;
use log::{debug, error};
use serde_json::{Value, json};
use sqlx::mysql::MySqlPool;
use sqlx::QueryBuilder;

use crate::db::{fmt_ts, fmt_ts_opt};
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::models::job::CSV_COLUMNS;
use crate::models::region::region_patterns;

/// Filters for the stored-jobs search. Mirrors the query params of
/// `GET /api/jobs`.
#[derive(Debug, Clone)]
pub struct JobSearchFilter {
    pub query: String,
    pub source: String,
    pub remote: String,
    pub job_type: String,
    pub salary_min: Option<f64>,
    pub posted_in_last_days: Option<u32>,
    pub sort_by: String,
    pub ascending: bool,
    pub exclude_not_interested: bool,
    pub region: String,
}

impl Default for JobSearchFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            source: String::new(),
            remote: String::new(),
            job_type: String::new(),
            salary_min: None,
            posted_in_last_days: None,
            sort_by: "date_posted".to_string(),
            ascending: false,
            exclude_not_interested: true,
            region: String::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    job_id: String,
    title: String,
    company: String,
    location: String,
    description: String,
    url: String,
    source: String,
    remote: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: String,
    job_type: String,
    experience_level: String,
    date_posted: String,
    date_scraped: NaiveDateTime,
    tags: String,
    company_logo: String,
}

impl JobRow {
    /// JSON-safe view: NULL becomes "", timestamps are formatted, the
    /// surrogate `id` column never leaves the database layer.
    fn into_json(self) -> Value {
        json!({
            "job_id": self.job_id,
            "title": self.title,
            "company": self.company,
            "location": self.location,
            "description": self.description,
            "url": self.url,
            "source": self.source,
            "remote": self.remote,
            "salary_min": self.salary_min.map(Value::from).unwrap_or(Value::String(String::new())),
            "salary_max": self.salary_max.map(Value::from).unwrap_or(Value::String(String::new())),
            "salary_currency": self.salary_currency,
            "job_type": self.job_type,
            "experience_level": self.experience_level,
            "date_posted": self.date_posted,
            "date_scraped": fmt_ts(self.date_scraped),
            "tags": self.tags,
            "company_logo": self.company_logo,
        })
    }

    fn csv_record(&self) -> [String; 17] {
        [
            self.job_id.clone(),
            self.title.clone(),
            self.company.clone(),
            self.location.clone(),
            self.description.clone(),
            self.url.clone(),
            self.source.clone(),
            self.remote.clone(),
            self.salary_min.map(|v| v.to_string()).unwrap_or_default(),
            self.salary_max.map(|v| v.to_string()).unwrap_or_default(),
            self.salary_currency.clone(),
            self.job_type.clone(),
            self.experience_level.clone(),
            self.date_posted.clone(),
            fmt_ts(self.date_scraped),
            self.tags.clone(),
            self.company_logo.clone(),
        ]
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobDetailRow {
    job_id: String,
    title: String,
    company: String,
    location: String,
    description: String,
    url: String,
    source: String,
    remote: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: String,
    job_type: String,
    experience_level: String,
    date_posted: String,
    date_scraped: NaiveDateTime,
    tags: String,
    company_logo: String,
    is_favourite: i64,
    is_applied: i64,
    is_not_interested: i64,
    applied_at: Option<NaiveDateTime>,
    application_notes: Option<String>,
}

const ALLOWED_SORT: [&str; 7] = [
    "date_scraped",
    "title",
    "company",
    "source",
    "salary_min",
    "salary_max",
    "date_posted",
];

/// Builds the MySQL boolean-mode expression: each whitespace-separated term
/// becomes a required prefix match (`+term*`).
fn boolean_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|t| format!("+{}*", t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[derive(Clone)]
pub struct JobRepository {
    pool: MySqlPool,
}

impl JobRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of jobs. Deduplication is enforced by the unique key on
    /// `job_id`; INSERT IGNORE silently skips rows that would violate it.
    /// Returns the number of rows actually written.
    pub async fn save_jobs(&self, jobs: &[Job]) -> AppResult<u64> {
        if jobs.is_empty() {
            return Ok(0);
        }

        let mut saved = 0u64;
        for job in jobs {
            let result = sqlx::query(
                "INSERT IGNORE INTO jobs
                    (job_id, title, company, location, description, url, source,
                     remote, salary_min, salary_max, salary_currency, job_type,
                     experience_level, date_posted, date_scraped, tags, company_logo)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&job.job_id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.description)
            .bind(&job.url)
            .bind(&job.source)
            .bind(&job.remote)
            .bind(job.salary_min)
            .bind(job.salary_max)
            .bind(&job.salary_currency)
            .bind(&job.job_type)
            .bind(&job.experience_level)
            .bind(&job.date_posted)
            .bind(&job.date_scraped)
            .bind(&job.tags)
            .bind(&job.company_logo)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to insert job {}: {}", job.job_id, e);
                AppError::from(e)
            })?;
            saved += result.rows_affected();
        }
        debug!("save_jobs: {} new of {} submitted", saved, jobs.len());
        Ok(saved)
    }

    /// Filter and sort stored jobs in SQL.
    pub async fn search(&self, filter: &JobSearchFilter) -> AppResult<Vec<Value>> {
        let mut qb: QueryBuilder<sqlx::MySql> = QueryBuilder::new("SELECT j.* FROM jobs j");
        let mut has_where = false;

        macro_rules! sep {
            () => {
                if has_where {
                    qb.push(" AND ");
                } else {
                    qb.push(" WHERE ");
                    has_where = true;
                }
            };
        }

        if let Some(days) = filter.posted_in_last_days.filter(|d| *d > 0) {
            sep!();
            qb.push(
                "(CASE WHEN date_posted REGEXP '^[0-9]{4}-[0-9]{2}-[0-9]{2}' \
                 THEN CAST(date_posted AS DATE) \
                 ELSE DATE(date_scraped) END) >= DATE_SUB(CURDATE(), INTERVAL ",
            );
            qb.push_bind(days);
            qb.push(" DAY)");
        }

        if !filter.query.is_empty() {
            sep!();
            qb.push("MATCH(title, company, description, tags, location) AGAINST(");
            qb.push_bind(boolean_query(&filter.query));
            qb.push(" IN BOOLEAN MODE)");
        }

        if !filter.source.is_empty() {
            sep!();
            qb.push("source = ");
            qb.push_bind(filter.source.clone());
        }

        if !filter.remote.is_empty() && filter.remote != "Any" {
            sep!();
            qb.push("remote = ");
            qb.push_bind(filter.remote.clone());
        }

        if !filter.job_type.is_empty() {
            sep!();
            qb.push("job_type LIKE ");
            qb.push_bind(format!("%{}%", filter.job_type));
        }

        if let Some(salary_min) = filter.salary_min {
            sep!();
            qb.push("(salary_min IS NOT NULL AND salary_min >= ");
            qb.push_bind(salary_min);
            qb.push(")");
        }

        if filter.exclude_not_interested {
            sep!();
            qb.push("j.job_id NOT IN (SELECT ni.job_id FROM not_interested ni)");
        }

        if !filter.region.is_empty() {
            if let Some(patterns) = region_patterns(&filter.region) {
                sep!();
                qb.push("(");
                for (i, pattern) in patterns.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("LOWER(j.location) LIKE ");
                    qb.push_bind(*pattern);
                }
                qb.push(")");
            }
        }

        let sort_by = if ALLOWED_SORT.contains(&filter.sort_by.as_str()) {
            filter.sort_by.as_str()
        } else {
            "date_posted"
        };
        let direction = if filter.ascending { "ASC" } else { "DESC" };

        // date_posted is VARCHAR: valid ISO dates sort correctly, everything
        // else sinks to a floor with date_scraped as tiebreaker.
        qb.push(" ORDER BY ");
        if sort_by == "date_posted" {
            qb.push(format!(
                "CASE WHEN date_posted REGEXP '^[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}' \
                 THEN date_posted ELSE '0000-00-00' END {dir}, date_scraped {dir}",
                dir = direction
            ));
        } else {
            qb.push(format!("{} {}", sort_by, direction));
        }

        let rows: Vec<JobRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(rows.into_iter().map(JobRow::into_json).collect())
    }

    pub async fn load_all(&self) -> AppResult<Vec<Value>> {
        let rows: Vec<JobRow> =
            sqlx::query_as("SELECT * FROM jobs ORDER BY date_scraped DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(rows.into_iter().map(JobRow::into_json).collect())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }

    /// Single job with favourite/applied/not-interested status and application
    /// metadata.
    pub async fn get_job(&self, job_id: &str) -> AppResult<Option<Value>> {
        let row: Option<JobDetailRow> = sqlx::query_as(
            "SELECT j.*,
                    IF(f.job_id IS NOT NULL, 1, 0) AS is_favourite,
                    IF(a.job_id IS NOT NULL, 1, 0) AS is_applied,
                    IF(ni.job_id IS NOT NULL, 1, 0) AS is_not_interested,
                    a.applied_at,
                    a.notes AS application_notes
             FROM jobs j
             LEFT JOIN favourites f ON f.job_id = j.job_id
             LEFT JOIN applications a ON a.job_id = j.job_id
             LEFT JOIN not_interested ni ON ni.job_id = j.job_id
             WHERE j.job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|r| {
            let mut value = JobRow {
                job_id: r.job_id,
                title: r.title,
                company: r.company,
                location: r.location,
                description: r.description,
                url: r.url,
                source: r.source,
                remote: r.remote,
                salary_min: r.salary_min,
                salary_max: r.salary_max,
                salary_currency: r.salary_currency,
                job_type: r.job_type,
                experience_level: r.experience_level,
                date_posted: r.date_posted,
                date_scraped: r.date_scraped,
                tags: r.tags,
                company_logo: r.company_logo,
            }
            .into_json();
            let map = value.as_object_mut().unwrap();
            map.insert("is_favourite".into(), json!(r.is_favourite != 0));
            map.insert("is_applied".into(), json!(r.is_applied != 0));
            map.insert("is_not_interested".into(), json!(r.is_not_interested != 0));
            map.insert("applied_at".into(), json!(fmt_ts_opt(r.applied_at)));
            map.insert(
                "application_notes".into(),
                json!(r.application_notes.unwrap_or_default()),
            );
            value
        }))
    }

    pub async fn get_sources(&self) -> AppResult<Vec<String>> {
        let sources: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT source FROM jobs ORDER BY source")
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(sources)
    }

    /// Summary statistics for the dashboard.
    pub async fn get_stats(&self) -> AppResult<Value> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        let notes_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        let ai_prompts_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_prompts")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        if total == 0 {
            return Ok(json!({
                "total": 0, "sources": {}, "remote_count": 0,
                "job_types": {}, "favourite_count": 0, "applied_count": 0,
                "notes_count": notes_count, "ai_prompts_count": ai_prompts_count,
            }));
        }

        let source_rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM jobs GROUP BY source")
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::from)?;
        let sources: serde_json::Map<String, Value> = source_rows
            .into_iter()
            .map(|(name, cnt)| (name, json!(cnt)))
            .collect();

        let remote_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE LOWER(remote) = 'remote'")
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)?;

        let job_type_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT job_type, COUNT(*) FROM jobs WHERE job_type != '' GROUP BY job_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        let job_types: serde_json::Map<String, Value> = job_type_rows
            .into_iter()
            .map(|(name, cnt)| (name, json!(cnt)))
            .collect();

        let favourite_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favourites")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        let applied_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(json!({
            "total": total,
            "sources": sources,
            "remote_count": remote_count,
            "job_types": job_types,
            "favourite_count": favourite_count,
            "applied_count": applied_count,
            "notes_count": notes_count,
            "ai_prompts_count": ai_prompts_count,
        }))
    }

    /// All jobs as a CSV document with the fixed column order.
    pub async fn export_csv_string(&self) -> AppResult<String> {
        let rows: Vec<JobRow> =
            sqlx::query_as("SELECT * FROM jobs ORDER BY date_scraped DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::from)?;

        let mut out = String::new();
        out.push_str(&CSV_COLUMNS.join(","));
        out.push('\n');
        for row in &rows {
            let record = row.csv_record();
            let line: Vec<String> = record.iter().map(|f| csv_escape(f)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn boolean_query_requires_prefix_terms() {
        assert_eq!(boolean_query("data analyst"), "+data* +analyst*");
        assert_eq!(boolean_query("  rust  "), "+rust*");
    }

    #[test]
    fn csv_escape_quotes_fields_with_separators() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn sort_allowlist_rejects_unknown_columns() {
        assert!(ALLOWED_SORT.contains(&"date_scraped"));
        assert!(!ALLOWED_SORT.contains(&"job_id; DROP TABLE jobs"));
    }

    async fn test_pool() -> Option<MySqlPool> {
        // Database-backed tests only run when one is available.
        let url = std::env::var("DATABASE_URL").ok()?;
        sqlx::mysql::MySqlPoolOptions::new().connect(&url).await.ok()
    }

    fn sample_job(url: &str) -> Job {
        Job {
            title: "Data Analyst".to_string(),
            company: "Acme".to_string(),
            location: "London, UK".to_string(),
            description: "Analyse data".to_string(),
            url: url.to_string(),
            source: "RepositoryTest".to_string(),
            remote: "Remote".to_string(),
            ..Default::default()
        }
        .finalize()
    }

    #[tokio::test]
    async fn save_jobs_dedups_on_job_id() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = JobRepository::new(pool.clone());
        let url = format!("https://example.com/{}", uuid::Uuid::new_v4());
        let batch = vec![sample_job(&url), sample_job(&url)];

        let first = repo.save_jobs(&batch).await.unwrap();
        assert_eq!(first, 1);
        // A rerun of the same batch writes nothing new.
        let second = repo.save_jobs(&batch).await.unwrap();
        assert_eq!(second, 0);

        let job_id = &batch[0].job_id;
        sqlx::query("DELETE FROM jobs WHERE job_id = ?")
            .bind(job_id)
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn region_filter_matches_location_patterns() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = JobRepository::new(pool.clone());
        let london = sample_job(&format!("https://example.com/{}", uuid::Uuid::new_v4()));
        let mut berlin = sample_job(&format!("https://example.com/{}", uuid::Uuid::new_v4()));
        berlin.location = "Berlin, Germany".to_string();
        repo.save_jobs(&[london.clone(), berlin.clone()]).await.unwrap();

        let filter = JobSearchFilter {
            source: "RepositoryTest".to_string(),
            region: "united kingdom".to_string(),
            ..Default::default()
        };
        let rows = repo.search(&filter).await.unwrap();
        assert!(rows.iter().all(|r| {
            r["location"]
                .as_str()
                .unwrap_or("")
                .to_lowercase()
                .contains("london")
        }));
        assert!(rows.iter().any(|r| r["job_id"] == london.job_id.as_str()));

        for job in [&london, &berlin] {
            sqlx::query("DELETE FROM jobs WHERE job_id = ?")
                .bind(&job.job_id)
                .execute(&pool)
                .await
                .unwrap();
        }
    }
}
