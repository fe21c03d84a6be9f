use std::collections::HashSet;

use async_trait::async_trait;
use log::{error, info};
use scraper::{Html, Selector};

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, matches_keywords, normalize_keywords,
};

fn element_text(el: &scraper::ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remote.co - scrapes the public search page. Brittle by nature; the
/// selectors are broad with fallbacks so markup drift degrades gracefully.
pub struct RemoteCoSource {
    client: SourceClient,
    base_url: String,
}

impl RemoteCoSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://remote.co".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Card extraction is synchronous: the parsed document is not Send and
    /// must not be held across an await.
    fn extract_cards(
        &self,
        html: &str,
        query: &SearchQuery,
        budget: usize,
        seen_urls: &mut HashSet<String>,
    ) -> Vec<Job> {
        let card_sel = Selector::parse(
            ".job_listing, .job-listing, article.job, .job-listings .job, [class*='job-card']",
        )
        .unwrap();
        let link_sel = Selector::parse("a[href*='/job/'], a[href*='remote.co']").unwrap();
        let title_sel = Selector::parse("h2, h3, .title, .job-title, [class*='title']").unwrap();
        let company_sel = Selector::parse(".company, .employer, [class*='company']").unwrap();
        let desc_sel = Selector::parse(".description, .excerpt, [class*='description']").unwrap();

        let document = Html::parse_document(html);
        let mut batch: Vec<Job> = Vec::new();

        for card in document.select(&card_sel) {
            if batch.len() >= budget {
                break;
            }

            let link_el = card.select(&link_sel).next();
            let title = card
                .select(&title_sel)
                .next()
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty())
                .or_else(|| link_el.map(|el| element_text(&el)))
                .unwrap_or_default();
            let company = card
                .select(&company_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            let description = card
                .select(&desc_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();

            let mut job_url = link_el
                .and_then(|el| el.value().attr("href"))
                .unwrap_or_default()
                .to_string();
            if job_url.starts_with('/') {
                job_url = format!("{}{}", self.base_url, job_url);
            }

            if title.is_empty() && job_url.is_empty() {
                continue;
            }
            if !job_url.is_empty() && !seen_urls.insert(job_url.clone()) {
                continue;
            }

            let searchable = format!("{} {} {}", title, company, description);
            if !matches_keywords(&searchable, &query.keywords) {
                continue;
            }

            batch.push(
                Job {
                    title: if title.is_empty() { "Remote job".to_string() } else { title },
                    company,
                    location: "Remote".to_string(),
                    description,
                    url: if job_url.is_empty() { self.base_url.clone() } else { job_url },
                    source: self.name().to_string(),
                    remote: "Remote".to_string(),
                    ..Default::default()
                }
                .finalize(),
            );
        }

        batch
    }
}

#[async_trait]
impl JobSource for RemoteCoSource {
    fn name(&self) -> &'static str {
        "Remote.co"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        if query.wants_on_site_only() {
            return Ok(Vec::new());
        }

        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            let url = format!("{}/remote-jobs/search/", self.base_url);
            let html = match self
                .client
                .get_text(&url, &[("search_keywords", keyword.clone())])
                .await
            {
                Ok(html) => html,
                Err(e) => {
                    error!("[{}] Failed for '{}': {}", self.name(), keyword, e);
                    continue;
                }
            };

            let budget = query.max_results - (jobs.len() - jobs_before_keyword);
            let batch = self.extract_cards(&html, query, budget, &mut seen_urls);

            if !batch.is_empty() {
                sink.flush(&batch).await;
                jobs.extend(batch);
            }
        }

        info!("[{}] Found {} jobs", self.name(), jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::base::NoopSink;

    fn settings() -> AppSettings {
        let mut s = AppSettings::from_env().unwrap();
        s.scrape.rate_limit_delay_secs = 0.0;
        s
    }

    #[tokio::test]
    async fn cards_are_scraped_with_fallback_selectors() {
        let mut server = mockito::Server::new_async().await;
        let html = r#"<html><body>
            <div class="job_listing">
              <h3 class="title">Rust Developer</h3>
              <span class="company">Acme</span>
              <p class="description">Build remote systems in Rust</p>
              <a href="/job/rust-developer">view</a>
            </div>
            <div class="job_listing">
              <h3 class="title">Baker</h3>
              <a href="/job/baker">view</a>
            </div>
        </body></html>"#;
        server
            .mock("GET", "/remote-jobs/search/")
            .match_query(mockito::Matcher::Any)
            .with_body(html)
            .create_async()
            .await;

        let source = RemoteCoSource::new(&settings()).with_base_url(server.url());
        let query = SearchQuery {
            keywords: vec!["rust".to_string()],
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Rust Developer");
        assert_eq!(jobs[0].company, "Acme");
        assert!(jobs[0].url.ends_with("/job/rust-developer"));
    }
}
