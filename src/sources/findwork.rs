use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, normalize_keywords,
    passes_salary_floor, remote_excluded,
};

/// Findwork.dev - token-authenticated API with cursor-style `next` pagination.
pub struct FindworkSource {
    client: SourceClient,
    base_url: String,
    api_key: Option<String>,
}

impl FindworkSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://findwork.dev/api/jobs/".to_string(),
            api_key: settings.api_keys.findwork_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for FindworkSource {
    fn name(&self) -> &'static str {
        "Findwork"
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

            let mut params: Vec<(&str, String)> = vec![
                ("search", keyword.clone()),
                ("sort_by", "relevance".to_string()),
            ];
            if !query.location.is_empty() {
                params.push(("location", query.location.clone()));
            }
            if query.remote == "Remote" {
                params.push(("remote", "true".to_string()));
            }

            let mut page_url = self.base_url.clone();
            let mut page_count = 0;

            while !page_url.is_empty()
                && jobs.len() - jobs_before_keyword < query.max_results
                && page_count < 50
            {
                self.client.throttle().await;
                let mut request = self
                    .client
                    .inner()
                    .get(&page_url)
                    .header("Authorization", format!("Token {}", api_key));
                if page_count == 0 {
                    // Follow-up pages come as fully-formed `next` URLs.
                    request = request.query(&params);
                }

                let data: Value = match request
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| AppError::External(format!("Findwork request failed: {}", e)))
                {
                    Ok(resp) => match resp.json().await {
                        Ok(json) => json,
                        Err(e) => {
                            error!("[{}] Invalid JSON for '{}': {}", self.name(), keyword, e);
                            break;
                        }
                    },
                    Err(e) => {
                        error!("[{}] Search for '{}' failed: {}", self.name(), keyword, e);
                        break;
                    }
                };

                let results = data
                    .get("results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if results.is_empty() {
                    break;
                }

                let mut batch: Vec<Job> = Vec::new();
                for item in &results {
                    if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                        break;
                    }

                    let title = json_str(item, "role");
                    let company = json_str(item, "company_name");
                    let loc = json_str(item, "location");
                    let description = {
                        let text = json_str(item, "text");
                        if text.is_empty() { json_str(item, "description") } else { text }
                    };
                    let is_remote = item
                        .get("remote")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);

                    if remote_excluded(&query.remote, is_remote) {
                        continue;
                    }

                    let salary_min = json_f64(item, "salary_min");
                    let salary_max = json_f64(item, "salary_max");
                    if !passes_salary_floor(salary_max, query.salary_min) {
                        continue;
                    }

                    let tags = item
                        .get("keywords")
                        .and_then(Value::as_array)
                        .map(|list| {
                            list.iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join(", ")
                        })
                        .unwrap_or_default();

                    batch.push(
                        Job {
                            title,
                            company,
                            location: if loc.is_empty() && is_remote {
                                "Remote".to_string()
                            } else {
                                loc
                            },
                            description: sanitize_html(&description),
                            url: json_str(item, "url"),
                            source: self.name().to_string(),
                            remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                            salary_min,
                            salary_max,
                            job_type: json_str(item, "employment_type"),
                            date_posted: json_str(item, "date_posted"),
                            tags,
                            company_logo: json_str(item, "company_logo"),
                            ..Default::default()
                        }
                        .finalize(),
                    );
                }

                if !batch.is_empty() {
                    sink.flush(&batch).await;
                    jobs.extend(batch);
                }

                page_url = json_str(&data, "next");
                page_count += 1;
            }
        }

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}
