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

/// GOV.UK Find a Job - scrapes the DWP search results (semantic HTML, no API).
pub struct GovUkFindAJobSource {
    client: SourceClient,
    base_url: String,
}

impl GovUkFindAJobSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://findajob.dwp.gov.uk".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Synchronous extraction; the parsed document must not cross an await.
    fn extract_blocks(
        &self,
        html: &str,
        query: &SearchQuery,
        budget: usize,
        seen_urls: &mut HashSet<String>,
    ) -> Vec<Job> {
        let block_sel = Selector::parse(
            "article, [class*='SearchResult'], [class*='job-card'], .govuk-summary-card",
        )
        .unwrap();
        let link_sel = Selector::parse("a[href*='/job/']").unwrap();
        let heading_sel = Selector::parse("h2, h3, .govuk-heading-s").unwrap();
        let dt_sel = Selector::parse("dt, [class*='location'], [class*='employer']").unwrap();
        let body_sel = Selector::parse("p, li, .govuk-body").unwrap();

        let document = Html::parse_document(html);
        let mut batch: Vec<Job> = Vec::new();

        for block in document.select(&block_sel) {
            if batch.len() >= budget {
                break;
            }

            let Some(link) = block.select(&link_sel).next() else {
                continue;
            };
            let Some(href_raw) = link.value().attr("href") else {
                continue;
            };
            let href = if href_raw.starts_with('/') {
                format!("{}{}", self.base_url, href_raw)
            } else {
                href_raw.to_string()
            };
            if !seen_urls.insert(href.clone()) {
                continue;
            }

            let mut title = element_text(&link)
                .replace("Save ", "")
                .replace(" job to favourites", "")
                .trim()
                .to_string();
            if title.is_empty() {
                if let Some(heading) = block.select(&heading_sel).next() {
                    title = element_text(&heading);
                }
            }

            let mut loc_text = String::new();
            let mut company = String::new();
            for dt in block.select(&dt_sel) {
                let label = element_text(&dt).to_lowercase();
                let value = dt
                    .next_siblings()
                    .filter_map(scraper::ElementRef::wrap)
                    .next()
                    .map(|el| element_text(&el))
                    .unwrap_or_default();
                if label.contains("location") || label.contains("where") {
                    loc_text = value.clone();
                }
                if label.contains("employer")
                    || label.contains("company")
                    || label.contains("organisation")
                {
                    company = value;
                }
            }
            if loc_text.is_empty() && company.is_empty() {
                if let Some(p) = block.select(&body_sel).next() {
                    loc_text = element_text(&p).chars().take(200).collect();
                }
            }

            let searchable = format!("{} {} {}", title, company, loc_text);
            if !matches_keywords(&searchable, &query.keywords) {
                continue;
            }

            batch.push(
                Job {
                    title: if title.is_empty() { "Job".to_string() } else { title },
                    company,
                    location: loc_text,
                    url: href,
                    source: self.name().to_string(),
                    remote: "Unknown".to_string(),
                    tags: "UK, government".to_string(),
                    ..Default::default()
                }
                .finalize(),
            );
        }

        batch
    }
}

#[async_trait]
impl JobSource for GovUkFindAJobSource {
    fn name(&self) -> &'static str {
        "GOV.UK Find a Job"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            let mut params: Vec<(&str, String)> = vec![("q", keyword.clone())];
            if !query.location.is_empty() {
                // UK-wide location code; refine per-location if ever needed.
                params.push(("loc", "86383".to_string()));
            }

            let url = format!("{}/search", self.base_url);
            let html = match self.client.get_text(&url, &params).await {
                Ok(html) => html,
                Err(e) => {
                    error!("[{}] Failed for '{}': {}", self.name(), keyword, e);
                    continue;
                }
            };

            let budget = query.max_results - (jobs.len() - jobs_before_keyword);
            let batch = self.extract_blocks(&html, query, budget, &mut seen_urls);

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
    async fn summary_cards_parse_title_employer_and_location() {
        let mut server = mockito::Server::new_async().await;
        let html = r#"<html><body>
          <div class="govuk-summary-card">
            <a href="/job/123">Data Engineer</a>
            <dl>
              <dt>Location</dt><dd>Leeds, West Yorkshire</dd>
              <dt>Employer</dt><dd>HM Revenue and Customs</dd>
            </dl>
          </div>
        </body></html>"#;
        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_body(html)
            .create_async()
            .await;

        let source = GovUkFindAJobSource::new(&settings()).with_base_url(server.url());
        let query = SearchQuery {
            keywords: vec!["data engineer".to_string()],
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Data Engineer");
        assert_eq!(jobs[0].company, "HM Revenue and Customs");
        assert_eq!(jobs[0].location, "Leeds, West Yorkshire");
    }
}
