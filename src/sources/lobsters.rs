use async_trait::async_trait;
use log::{error, info};

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, matches_keywords};
use super::feed::parse_feed;

/// Lobste.rs job-tag RSS feed. Community postings, sparse metadata.
pub struct LobstersSource {
    client: SourceClient,
    base_url: String,
}

impl LobstersSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://lobste.rs".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for LobstersSource {
    fn name(&self) -> &'static str {
        "Lobsters"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let url = format!("{}/t/job.rss", self.base_url);
        let xml = match self.client.get_text(&url, &[]).await {
            Ok(xml) => xml,
            Err(e) => {
                error!("[{}] Failed to fetch RSS: {}", self.name(), e);
                return Err(e);
            }
        };

        let mut jobs: Vec<Job> = Vec::new();
        for entry in parse_feed(&xml) {
            if jobs.len() >= query.max_results {
                break;
            }

            let searchable = format!("{} {}", entry.title, entry.description);
            if !matches_keywords(&searchable, &query.keywords) {
                continue;
            }

            jobs.push(
                Job {
                    title: entry.title,
                    description: sanitize_html(&entry.description),
                    url: entry.link,
                    source: self.name().to_string(),
                    remote: "Unknown".to_string(),
                    date_posted: entry.published,
                    tags: "lobsters, job".to_string(),
                    ..Default::default()
                }
                .finalize(),
            );
        }

        info!("[{}] Found {} jobs", self.name(), jobs.len());
        if !jobs.is_empty() {
            sink.flush(&jobs).await;
        }
        Ok(jobs)
    }
}
