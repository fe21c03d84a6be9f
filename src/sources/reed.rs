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

/// Reed.co.uk - free API key, Basic auth with the key as username.
pub struct ReedSource {
    client: SourceClient,
    base_url: String,
    api_key: Option<String>,
}

impl ReedSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://www.reed.co.uk/api/1.0/search".to_string(),
            api_key: settings.api_keys.reed_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for ReedSource {
    fn name(&self) -> &'static str {
        "Reed"
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
        let results_per_request = 100usize;
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            let mut skip = 0usize;

            loop {
                let found_for_keyword = jobs.len() - jobs_before_keyword;
                if found_for_keyword >= query.max_results {
                    break;
                }
                let remaining = query.max_results - found_for_keyword;

                let mut params: Vec<(&str, String)> = vec![
                    ("keywords", keyword.clone()),
                    (
                        "resultsToTake",
                        results_per_request.min(remaining).to_string(),
                    ),
                    ("resultsToSkip", skip.to_string()),
                ];
                if !query.location.is_empty() {
                    params.push(("locationName", query.location.clone()));
                }
                if let Some(salary_min) = query.salary_min {
                    params.push(("minimumSalary", (salary_min as i64).to_string()));
                }
                let jt_lower = query.job_type.to_lowercase();
                if jt_lower.contains("full") {
                    params.push(("fullTime", "true".to_string()));
                } else if jt_lower.contains("part") {
                    params.push(("partTime", "true".to_string()));
                } else if jt_lower.contains("contract") {
                    params.push(("contract", "true".to_string()));
                }

                self.client.throttle().await;
                let response = self
                    .client
                    .inner()
                    .get(&self.base_url)
                    .query(&params)
                    .basic_auth(api_key, Some(""))
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| AppError::External(format!("Reed request failed: {}", e)));

                let payload: Value = match response {
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

                let results = payload
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

                    let title = json_str(item, "jobTitle");
                    let description = json_str(item, "jobDescription");

                    let is_remote =
                        format!("{} {}", title, description).to_lowercase().contains("remote");
                    if remote_excluded(&query.remote, is_remote) {
                        continue;
                    }

                    let salary_min = json_f64(item, "minimumSalary");
                    let salary_max = json_f64(item, "maximumSalary");
                    if !passes_salary_floor(salary_max, query.salary_min) {
                        continue;
                    }

                    batch.push(
                        Job {
                            title,
                            company: json_str(item, "employerName"),
                            location: json_str(item, "locationName"),
                            description: sanitize_html(&description),
                            url: json_str(item, "jobUrl"),
                            source: self.name().to_string(),
                            remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                            salary_min,
                            salary_max,
                            salary_currency: "GBP".to_string(),
                            job_type: query.job_type.clone(),
                            date_posted: json_str(item, "date"),
                            ..Default::default()
                        }
                        .finalize(),
                    );
                }

                let page_len = results.len();
                if !batch.is_empty() {
                    sink.flush(&batch).await;
                    jobs.extend(batch);
                }

                skip += page_len;
                if page_len < results_per_request {
                    break;
                }
            }
        }

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}
