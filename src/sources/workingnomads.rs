use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, json_str, matches_keywords};

/// Working Nomads - free remote-jobs API, one payload, client-side filtering.
pub struct WorkingNomadsSource {
    client: SourceClient,
    base_url: String,
}

impl WorkingNomadsSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://www.workingnomads.com/api/exposed_jobs".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for WorkingNomadsSource {
    fn name(&self) -> &'static str {
        "WorkingNomads"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        if query.wants_on_site_only() {
            return Ok(Vec::new());
        }

        let data = match self.client.get_json(&self.base_url, &[]).await {
            Ok(data) => data,
            Err(e) => {
                error!("[{}] Failed to fetch: {}", self.name(), e);
                return Err(e);
            }
        };

        let Some(listings) = data.as_array() else {
            return Ok(Vec::new());
        };

        let mut jobs: Vec<Job> = Vec::new();
        for item in listings {
            if jobs.len() >= query.max_results {
                break;
            }

            let title = json_str(item, "title");
            let company = json_str(item, "company_name");
            let description = json_str(item, "description");
            let tags = match item.get("tags") {
                Some(Value::Array(list)) => list
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
            let category = json_str(item, "category_name");

            let searchable =
                format!("{} {} {} {} {}", title, company, description, tags, category);
            if !matches_keywords(&searchable, &query.keywords) {
                continue;
            }

            let location = {
                let loc = json_str(item, "location");
                if loc.is_empty() { "Remote".to_string() } else { loc }
            };

            jobs.push(
                Job {
                    title,
                    company,
                    location,
                    description: sanitize_html(&description),
                    url: json_str(item, "url"),
                    source: self.name().to_string(),
                    remote: "Remote".to_string(),
                    date_posted: json_str(item, "pub_date"),
                    tags: if tags.is_empty() { category } else { tags },
                    ..Default::default()
                }
                .finalize(),
            );
        }

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        if !jobs.is_empty() {
            sink.flush(&jobs).await;
        }
        Ok(jobs)
    }
}
