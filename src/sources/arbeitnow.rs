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

/// Arbeitnow - free paginated API, no key required.
pub struct ArbeitnowSource {
    client: SourceClient,
    base_url: String,
}

impl ArbeitnowSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://www.arbeitnow.com/api/job-board-api".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for ArbeitnowSource {
    fn name(&self) -> &'static str {
        "Arbeitnow"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut page = 1;
        let max_pages = 5;

        while jobs.len() < query.max_results && page <= max_pages {
            let payload = match self
                .client
                .get_json(&self.base_url, &[("page", page.to_string())])
                .await
            {
                Ok(payload) => payload,
                Err(e) => {
                    error!("[{}] Page {} failed: {}", self.name(), page, e);
                    break;
                }
            };

            let listings = payload
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if listings.is_empty() {
                break;
            }

            let mut batch: Vec<Job> = Vec::new();
            for item in &listings {
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "title");
                let company = json_str(item, "company_name");
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
                let is_remote = item
                    .get("remote")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                if remote_excluded(&query.remote, is_remote) {
                    continue;
                }

                let searchable = format!("{} {} {} {}", title, company, description, tags_str);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let mut url = json_str(item, "url");
                if url.is_empty() {
                    url = format!("https://www.arbeitnow.com/view/{}", json_str(item, "slug"));
                }

                let job_types = item
                    .get("job_types")
                    .and_then(Value::as_array)
                    .map(|types| {
                        types
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();

                batch.push(
                    Job {
                        title,
                        company,
                        location: json_str(item, "location"),
                        description: sanitize_html(&description),
                        url,
                        source: self.name().to_string(),
                        remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                        job_type: if job_types.is_empty() {
                            query.job_type.clone()
                        } else {
                            job_types
                        },
                        date_posted: json_str(item, "created_at"),
                        tags: tags_str,
                        ..Default::default()
                    }
                    .finalize(),
                );
            }

            if !batch.is_empty() {
                sink.flush(&batch).await;
                jobs.extend(batch);
            }

            let has_next = payload
                .get("links")
                .and_then(|l| l.get("next"))
                .map(|n| !n.is_null())
                .unwrap_or(false);
            if !has_next {
                break;
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
    use crate::sources::base::NoopSink;
    use serde_json::json;

    fn settings() -> AppSettings {
        let mut s = AppSettings::from_env().unwrap();
        s.scrape.rate_limit_delay_secs = 0.0;
        s
    }

    #[tokio::test]
    async fn paginates_until_next_is_null() {
        let mut server = mockito::Server::new_async().await;
        let page1 = json!({
            "data": [{"title": "Backend Engineer", "company_name": "Acme", "description": "apis",
                      "url": "https://a/1", "remote": true, "tags": ["backend"]}],
            "links": {"next": "https://a/?page=2"}
        });
        let page2 = json!({
            "data": [{"title": "Backend Engineer II", "company_name": "Acme", "description": "apis",
                      "url": "https://a/2", "remote": false, "tags": []}],
            "links": {"next": null}
        });
        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "1".into()))
            .with_body(page1.to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(page2.to_string())
            .create_async()
            .await;

        let source = ArbeitnowSource::new(&settings()).with_base_url(format!("{}/", server.url()));
        let query = SearchQuery {
            keywords: vec!["backend".to_string()],
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].remote, "Remote");
        assert_eq!(jobs[1].remote, "On-site");
    }
}
