use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, matches_keywords,
    passes_salary_floor,
};

/// RemoteOK - free API, no key required. Returns all remote jobs in one
/// payload; filtering is client-side.
pub struct RemoteOkSource {
    client: SourceClient,
    base_url: String,
}

impl RemoteOkSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://remoteok.com/api".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for RemoteOkSource {
    fn name(&self) -> &'static str {
        "RemoteOK"
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

        // First element is a legal notice, not a listing.
        let listings = match data.as_array() {
            Some(arr) if arr.len() > 1 => &arr[1..],
            _ => &[],
        };

        let mut jobs: Vec<Job> = Vec::new();
        for item in listings {
            if jobs.len() >= query.max_results {
                break;
            }

            let title = json_str(item, "position");
            let company = json_str(item, "company");
            let description = json_str(item, "description");
            let tags_str = item
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();

            let searchable = format!("{} {} {} {}", title, company, description, tags_str);
            if !matches_keywords(&searchable, &query.keywords) {
                continue;
            }

            let salary_min = json_f64(item, "salary_min");
            let salary_max = json_f64(item, "salary_max");
            if !passes_salary_floor(salary_max, query.salary_min) {
                continue;
            }

            let mut url = json_str(item, "apply_url");
            if url.is_empty() {
                url = json_str(item, "url");
            }
            if !url.is_empty() && !url.starts_with("http") {
                url = format!("https://remoteok.com{}", url);
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
                    url,
                    source: self.name().to_string(),
                    remote: "Remote".to_string(),
                    salary_min,
                    salary_max,
                    salary_currency: "USD".to_string(),
                    job_type: if query.job_type.is_empty() {
                        "Full-time".to_string()
                    } else {
                        query.job_type.clone()
                    },
                    date_posted: json_str(item, "date"),
                    tags: tags_str,
                    company_logo: json_str(item, "company_logo"),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::base::NoopSink;
    use serde_json::json;

    fn settings() -> AppSettings {
        let mut s = AppSettings::from_env().unwrap();
        s.scrape.rate_limit_delay_secs = 0.0;
        s
    }

    #[tokio::test]
    async fn parses_listings_and_skips_legal_notice() {
        let mut server = mockito::Server::new_async().await;
        let body = json!([
            {"legal": "notice"},
            {"position": "Rust Engineer", "company": "Acme", "description": "systems work",
             "url": "/remote-jobs/1", "tags": ["rust"], "salary_min": 90000, "salary_max": 120000},
            {"position": "Gardener", "company": "Green", "description": "plants",
             "url": "/remote-jobs/2", "tags": []}
        ]);
        let mock = server
            .mock("GET", "/api")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let source =
            RemoteOkSource::new(&settings()).with_base_url(format!("{}/api", server.url()));
        let query = SearchQuery {
            keywords: vec!["rust".to_string()],
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();

        mock.assert_async().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Rust Engineer");
        assert_eq!(jobs[0].remote, "Remote");
        assert!(jobs[0].url.starts_with("https://remoteok.com/"));
        assert!(!jobs[0].job_id.is_empty());
    }

    #[tokio::test]
    async fn on_site_request_short_circuits() {
        let source = RemoteOkSource::new(&settings());
        let query = SearchQuery {
            remote: "On-site".to_string(),
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn salary_floor_keeps_unknown_salaries() {
        let mut server = mockito::Server::new_async().await;
        let body = json!([
            {"legal": "notice"},
            {"position": "Rust Dev A", "company": "A", "description": "", "url": "/a",
             "salary_min": 40000, "salary_max": 50000},
            {"position": "Rust Dev B", "company": "B", "description": "", "url": "/b"}
        ]);
        server
            .mock("GET", "/api")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let source =
            RemoteOkSource::new(&settings()).with_base_url(format!("{}/api", server.url()));
        let query = SearchQuery {
            keywords: vec!["rust".to_string()],
            salary_min: Some(80000.0),
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();
        // Known-too-low salary excluded; unknown salary included.
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Rust Dev B");
    }
}
