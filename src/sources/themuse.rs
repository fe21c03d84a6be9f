use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_str, matches_keywords, remote_excluded,
};

/// The Muse - free public API. Level filtering is server-side, keyword
/// matching client-side.
pub struct TheMuseSource {
    client: SourceClient,
    base_url: String,
}

fn muse_level(experience_level: &str) -> Option<&'static str> {
    match experience_level.to_lowercase().as_str() {
        "entry" => Some("Entry Level"),
        "mid" => Some("Mid Level"),
        "senior" | "lead" | "executive" => Some("Senior Level"),
        _ => None,
    }
}

fn names_of(list: Option<&Value>) -> Vec<String> {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| json_str(v, "name"))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl TheMuseSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://www.themuse.com/api/public/jobs".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for TheMuseSource {
    fn name(&self) -> &'static str {
        "The Muse"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut page = 0;
        let max_pages = 5;

        while jobs.len() < query.max_results && page < max_pages {
            let mut params: Vec<(&str, String)> = vec![("page", page.to_string())];
            if let Some(level) = muse_level(&query.experience_level) {
                params.push(("level", level.to_string()));
            }
            if !query.location.is_empty() {
                params.push(("location", query.location.clone()));
            }

            let payload = match self.client.get_json(&self.base_url, &params).await {
                Ok(payload) => payload,
                Err(e) => {
                    error!("[{}] Page {} failed: {}", self.name(), page, e);
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
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "name");
                let company = item
                    .get("company")
                    .map(|c| json_str(c, "name"))
                    .unwrap_or_default();
                let locations = names_of(item.get("locations"));
                let location_str = locations.join("; ");

                let lowered = location_str.to_lowercase();
                let is_remote = lowered.contains("flexible") || lowered.contains("remote");
                if remote_excluded(&query.remote, is_remote) {
                    continue;
                }

                let description = sanitize_html(&json_str(item, "contents"));
                let categories = names_of(item.get("categories"));
                let levels = names_of(item.get("levels"));

                let searchable = format!(
                    "{} {} {} {}",
                    title,
                    company,
                    description,
                    categories.join(" ")
                );
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let url = item
                    .get("refs")
                    .map(|r| json_str(r, "landing_page"))
                    .unwrap_or_default();

                batch.push(
                    Job {
                        title,
                        company,
                        location: location_str,
                        description,
                        url,
                        source: self.name().to_string(),
                        remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                        experience_level: levels.join(", "),
                        tags: categories.join(", "),
                        date_posted: json_str(item, "publication_date"),
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

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_levels_map_to_muse_levels() {
        assert_eq!(muse_level("entry"), Some("Entry Level"));
        assert_eq!(muse_level("Senior"), Some("Senior Level"));
        assert_eq!(muse_level("lead"), Some("Senior Level"));
        assert_eq!(muse_level(""), None);
    }
}
