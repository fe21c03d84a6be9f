use std::collections::HashSet;

use async_trait::async_trait;
use log::{error, info};

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, matches_keywords, normalize_keywords,
};
use super::feed::parse_feed;

/// Totaljobs UK - per-keyword RSS search feed.
pub struct TotaljobsSource {
    client: SourceClient,
    base_url: String,
}

impl TotaljobsSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://www.totaljobs.com/JobSearch/RSSLink.aspx".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for TotaljobsSource {
    fn name(&self) -> &'static str {
        "Totaljobs"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_links: HashSet<String> = HashSet::new();
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            let mut params: Vec<(&str, String)> = vec![("keywords", keyword.clone())];
            if !query.location.is_empty() {
                params.push(("location", query.location.clone()));
            }

            let xml = match self.client.get_text(&self.base_url, &params).await {
                Ok(xml) => xml,
                Err(e) => {
                    error!("[{}] Failed for '{}': {}", self.name(), keyword, e);
                    continue;
                }
            };

            let mut batch: Vec<Job> = Vec::new();
            for entry in parse_feed(&xml) {
                if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                    break;
                }
                if !entry.link.is_empty() && !seen_links.insert(entry.link.clone()) {
                    continue;
                }

                let searchable = format!("{} {}", entry.title, entry.description);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                batch.push(
                    Job {
                        title: entry.title,
                        location: query.location.clone(),
                        description: sanitize_html(&entry.description),
                        url: entry.link,
                        source: self.name().to_string(),
                        remote: "Unknown".to_string(),
                        date_posted: entry.published,
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

        info!("[{}] Found {} jobs", self.name(), jobs.len());
        Ok(jobs)
    }
}
