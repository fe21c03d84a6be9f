use async_trait::async_trait;
use log::{error, info};
use serde_json::{Value, json};

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::utils::html::{sanitize_html, strip_html};
use crate::utils::salary::parse_salary_range;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_str, normalize_keywords,
    passes_salary_floor, remote_excluded,
};

/// Jooble - aggregator with a POST search API keyed into the URL.
pub struct JoobleSource {
    client: SourceClient,
    base_url: String,
    api_key: Option<String>,
}

impl JoobleSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://jooble.org/api".to_string(),
            api_key: settings.api_keys.jooble_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for JoobleSource {
    fn name(&self) -> &'static str {
        "Jooble"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let Some(api_key) = &self.api_key else {
            info!("[{}] Skipped - API key not configured", self.name());
            return Ok(Vec::new());
        };

        let mut jobs: Vec<Job> = Vec::new();
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();

            let mut payload = json!({
                "keywords": keyword,
                "page": 1,
                "resultonpage": 50.min(query.max_results),
            });
            if !query.location.is_empty() {
                payload["location"] = json!(query.location);
            }

            let url = format!("{}/{}", self.base_url, api_key);
            self.client.throttle().await;
            let data: Value = match self
                .client
                .inner()
                .post(&url)
                .json(&payload)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| AppError::External(format!("Jooble request failed: {}", e)))
            {
                Ok(resp) => match resp.json().await {
                    Ok(json) => json,
                    Err(e) => {
                        error!("[{}] Invalid JSON for '{}': {}", self.name(), keyword, e);
                        continue;
                    }
                },
                Err(e) => {
                    error!("[{}] Search for '{}' failed: {}", self.name(), keyword, e);
                    continue;
                }
            };

            let listings = data
                .get("jobs")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let mut batch: Vec<Job> = Vec::new();
            for item in &listings {
                if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "title");
                let description = json_str(item, "snippet");
                let loc = json_str(item, "location");

                let is_remote = format!("{} {} {}", title, description, loc)
                    .to_lowercase()
                    .contains("remote");
                if remote_excluded(&query.remote, is_remote) {
                    continue;
                }

                let (salary_min, salary_max) = parse_salary_range(&json_str(item, "salary"));
                if !passes_salary_floor(salary_max, query.salary_min) {
                    continue;
                }

                let job_type = {
                    let t = json_str(item, "type");
                    if t.is_empty() { query.job_type.clone() } else { t }
                };

                batch.push(
                    Job {
                        title: strip_html(&title),
                        company: json_str(item, "company"),
                        location: loc,
                        description: sanitize_html(&description),
                        url: json_str(item, "link"),
                        source: self.name().to_string(),
                        remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                        salary_min,
                        salary_max,
                        job_type,
                        date_posted: json_str(item, "updated"),
                        ..Default::default()
                    }
                    .finalize(),
                );
            }

            if !batch.is_empty() {
                sink.flush(&batch).await;
                jobs.extend(batch);
            }
        }

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}
