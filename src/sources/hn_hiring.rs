use async_trait::async_trait;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, json_str};

static THREAD_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)who\s+is\s+hiring\?\s*\([^)]+\)").unwrap());

/// Hacker News "Who is hiring?" - surfaces the monthly threads via the Algolia
/// search API so the user can open them.
pub struct HackerNewsHiringSource {
    client: SourceClient,
    base_url: String,
}

impl HackerNewsHiringSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://hn.algolia.com/api/v1/search_by_date".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for HackerNewsHiringSource {
    fn name(&self) -> &'static str {
        "HN Who is hiring"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let params = [
            ("query", "Who is hiring".to_string()),
            ("tags", "story".to_string()),
            ("hitsPerPage", "50".to_string()),
        ];
        let data = match self.client.get_json(&self.base_url, &params).await {
            Ok(data) => data,
            Err(e) => {
                error!("[{}] Failed to fetch: {}", self.name(), e);
                return Err(e);
            }
        };

        let hits = data
            .get("hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut jobs: Vec<Job> = Vec::new();
        for hit in &hits {
            if jobs.len() >= query.max_results {
                break;
            }
            let title = json_str(hit, "title");
            let lowered = title.to_lowercase();
            if !THREAD_TITLE_RE.is_match(&title) && !lowered.contains("who is hiring") {
                continue;
            }
            if !lowered.contains("who is hiring?") {
                continue;
            }

            // story_id is numeric in Algolia responses, objectID a string.
            let story_id = hit
                .get("story_id")
                .and_then(Value::as_i64)
                .map(|id| id.to_string())
                .unwrap_or_else(|| json_str(hit, "objectID"));
            let created = json_str(hit, "created_at");

            jobs.push(
                Job {
                    title,
                    company: "Hacker News".to_string(),
                    description: "Monthly Hacker News 'Who is hiring?' thread. Click to open \
                                  the thread and browse job postings in the comments."
                        .to_string(),
                    url: format!("https://news.ycombinator.com/item?id={}", story_id),
                    source: self.name().to_string(),
                    remote: "Unknown".to_string(),
                    date_posted: created.chars().take(10).collect(),
                    tags: "hn, who is hiring, remote, tech".to_string(),
                    ..Default::default()
                }
                .finalize(),
            );
        }

        info!("[{}] Found {} threads", self.name(), jobs.len());
        if !jobs.is_empty() {
            sink.flush(&jobs).await;
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_thread_titles_match() {
        assert!(THREAD_TITLE_RE.is_match("Ask HN: Who is hiring? (March 2025)"));
        assert!(!THREAD_TITLE_RE.is_match("Ask HN: Who wants to be hired?"));
    }
}
