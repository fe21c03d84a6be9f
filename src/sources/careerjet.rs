use std::collections::HashSet;

use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_str, normalize_keywords,
};

/// CareerJet - public API keyed on a partner affiliate id.
pub struct CareerJetSource {
    client: SourceClient,
    base_url: String,
    affid: Option<String>,
}

impl CareerJetSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "http://public.api.careerjet.net/search".to_string(),
            affid: settings.api_keys.careerjet_affid.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for CareerJetSource {
    fn name(&self) -> &'static str {
        "CareerJet"
    }

    fn is_available(&self) -> bool {
        self.affid.is_some()
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let Some(affid) = &self.affid else {
            return Ok(Vec::new());
        };

        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let keywords = normalize_keywords(&query.keywords, &[]);
        let page_size = 100usize;
        let max_pages_per_keyword = query.max_results.div_ceil(page_size).max(1);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            let mut page = 1usize;

            while jobs.len() - jobs_before_keyword < query.max_results
                && page <= max_pages_per_keyword
            {
                let remaining = query.max_results - (jobs.len() - jobs_before_keyword);
                let mut params: Vec<(&str, String)> = vec![
                    ("locale_code", "en_GB".to_string()),
                    ("keywords", keyword.clone()),
                    ("affid", affid.clone()),
                    ("format", "json".to_string()),
                    ("pagesize", page_size.min(remaining).to_string()),
                    ("page", page.to_string()),
                ];
                if !query.location.is_empty() {
                    params.push(("location", query.location.clone()));
                }

                let data = match self.client.get_json(&self.base_url, &params).await {
                    Ok(data) => data,
                    Err(e) => {
                        error!("[{}] Failed for '{}': {}", self.name(), keyword, e);
                        break;
                    }
                };

                let hits = data
                    .get("hits")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if hits.is_empty() {
                    break;
                }

                let mut batch: Vec<Job> = Vec::new();
                for item in &hits {
                    if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                        break;
                    }
                    let url = json_str(item, "url");
                    if !url.is_empty() && !seen_urls.insert(url.clone()) {
                        continue;
                    }

                    let locations = match item.get("locations") {
                        Some(Value::Array(list)) => list
                            .iter()
                            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                            .collect::<Vec<_>>()
                            .join(", "),
                        Some(Value::String(s)) => s.clone(),
                        _ => String::new(),
                    };
                    let description = {
                        let d = json_str(item, "description");
                        if d.is_empty() { json_str(item, "snippet") } else { d }
                    };

                    batch.push(
                        Job {
                            title: json_str(item, "title"),
                            company: json_str(item, "company"),
                            location: locations.clone(),
                            description: sanitize_html(&description),
                            url,
                            source: self.name().to_string(),
                            remote: if locations.to_lowercase().contains("remote") {
                                "Remote"
                            } else {
                                "Unknown"
                            }
                            .to_string(),
                            date_posted: json_str(item, "date"),
                            ..Default::default()
                        }
                        .finalize(),
                    );
                }

                if !batch.is_empty() {
                    sink.flush(&batch).await;
                    jobs.extend(batch);
                }
                page += 1;
            }
        }

        info!("[{}] Found {} jobs", self.name(), jobs.len());
        Ok(jobs)
    }
}
