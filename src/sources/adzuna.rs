use std::collections::HashSet;

use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::{sanitize_html, strip_html};

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, normalize_keywords,
    remote_excluded,
};

/// Adzuna - aggregator REST API, free key required.
pub struct AdzunaSource {
    client: SourceClient,
    base_url: String,
    app_id: Option<String>,
    app_key: Option<String>,
    country: String,
}

impl AdzunaSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://api.adzuna.com/v1/api/jobs".to_string(),
            app_id: settings.api_keys.adzuna_app_id.clone(),
            app_key: settings.api_keys.adzuna_app_key.clone(),
            country: "gb".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for AdzunaSource {
    fn name(&self) -> &'static str {
        "Adzuna"
    }

    fn is_available(&self) -> bool {
        self.app_id.is_some() && self.app_key.is_some()
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let (Some(app_id), Some(app_key)) = (&self.app_id, &self.app_key) else {
            info!("[{}] Skipped - API keys not configured", self.name());
            return Ok(Vec::new());
        };

        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let keywords = normalize_keywords(&query.keywords, &[]);
        let results_per_page = 50usize;
        let max_pages_per_keyword = (query.max_results / results_per_page).max(1);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();

            'pages: for page in 1..=max_pages_per_keyword {
                if jobs.len() - jobs_before_keyword >= query.max_results {
                    break;
                }

                let mut params: Vec<(&str, String)> = vec![
                    ("app_id", app_id.clone()),
                    ("app_key", app_key.clone()),
                    ("what", keyword.clone()),
                    ("results_per_page", results_per_page.to_string()),
                    ("content-type", "application/json".to_string()),
                ];
                if !query.location.is_empty() {
                    params.push(("where", query.location.clone()));
                }
                if let Some(salary_min) = query.salary_min {
                    params.push(("salary_min", (salary_min as i64).to_string()));
                }
                if let Some(days) = query.posted_in_last_days {
                    params.push(("max_days_old", days.to_string()));
                }

                let url = format!("{}/{}/search/{}", self.base_url, self.country, page);
                let payload = match self.client.get_json(&url, &params).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("[{}] '{}' page {} failed: {}", self.name(), keyword, page, e);
                        break 'pages;
                    }
                };

                let results = payload
                    .get("results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if results.is_empty() {
                    break 'pages;
                }

                let mut batch: Vec<Job> = Vec::new();
                for item in &results {
                    if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                        break;
                    }

                    let job_url = json_str(item, "redirect_url");
                    if !job_url.is_empty() && !seen_urls.insert(job_url.clone()) {
                        continue;
                    }

                    let title = json_str(item, "title");
                    let company = item
                        .get("company")
                        .map(|c| json_str(c, "display_name"))
                        .unwrap_or_default();
                    let loc_display = item
                        .get("location")
                        .map(|loc| {
                            let areas = loc
                                .get("area")
                                .and_then(Value::as_array)
                                .map(|a| {
                                    a.iter()
                                        .filter_map(Value::as_str)
                                        .collect::<Vec<_>>()
                                        .join(", ")
                                })
                                .unwrap_or_default();
                            if areas.is_empty() { json_str(loc, "display_name") } else { areas }
                        })
                        .unwrap_or_default();

                    let description = json_str(item, "description");
                    let salary_min = json_f64(item, "salary_min");
                    let salary_max = json_f64(item, "salary_max");

                    let category = item
                        .get("category")
                        .map(|c| json_str(c, "label"))
                        .unwrap_or_default();
                    let contract_time = json_str(item, "contract_time");

                    let is_remote =
                        format!("{} {}", title, description).to_lowercase().contains("remote");
                    if remote_excluded(&query.remote, is_remote) {
                        continue;
                    }

                    let job_type = if contract_time.is_empty() {
                        String::new()
                    } else {
                        // "full_time" -> "Full Time"
                        contract_time
                            .split('_')
                            .map(|w| {
                                let mut chars = w.chars();
                                match chars.next() {
                                    Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
                                    None => String::new(),
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(" ")
                    };

                    batch.push(
                        Job {
                            title: strip_html(&title),
                            company,
                            location: loc_display,
                            description: sanitize_html(&description),
                            url: job_url,
                            source: self.name().to_string(),
                            remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                            salary_min,
                            salary_max,
                            salary_currency: if self.country == "gb" { "GBP" } else { "USD" }
                                .to_string(),
                            job_type,
                            date_posted: json_str(item, "created"),
                            tags: category,
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
        }

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}
