use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, matches_keywords,
    normalize_keywords, passes_salary_floor,
};

/// Jobicy - free remote-jobs API; one request per keyword via the tag param.
pub struct JobicySource {
    client: SourceClient,
    base_url: String,
}

impl JobicySource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://jobicy.com/api/v2/remote-jobs".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for JobicySource {
    fn name(&self) -> &'static str {
        "Jobicy"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        if query.wants_on_site_only() {
            return Ok(Vec::new());
        }

        let mut jobs: Vec<Job> = Vec::new();
        let keywords = normalize_keywords(&query.keywords, &[""]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            let mut params: Vec<(&str, String)> =
                vec![("count", query.max_results.min(50).to_string())];
            if !query.location.is_empty() {
                params.push(("geo", query.location.clone()));
            }
            if !keyword.is_empty() {
                params.push(("tag", keyword.clone()));
            }

            let payload = match self.client.get_json(&self.base_url, &params).await {
                Ok(payload) => payload,
                Err(e) => {
                    error!(
                        "[{}] Failed to fetch for '{}': {}",
                        self.name(),
                        if keyword.is_empty() { "(all)" } else { keyword },
                        e
                    );
                    continue;
                }
            };

            let listings = payload
                .get("jobs")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let mut batch: Vec<Job> = Vec::new();
            for item in &listings {
                if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "jobTitle");
                let company = json_str(item, "companyName");
                let description = json_str(item, "jobDescription");
                let geo = {
                    let g = json_str(item, "jobGeo");
                    if g.is_empty() { "Remote".to_string() } else { g }
                };
                let job_type = json_str(item, "jobType");

                let salary_min = json_f64(item, "annualSalaryMin");
                let salary_max = json_f64(item, "annualSalaryMax");
                if !passes_salary_floor(salary_max, query.salary_min) {
                    continue;
                }

                let searchable =
                    format!("{} {} {} {} {}", title, company, description, geo, job_type);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let industry = item
                    .get("jobIndustry")
                    .and_then(Value::as_array)
                    .map(|list| {
                        list.iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();

                let salary_currency = {
                    let c = json_str(item, "salaryCurrency");
                    if c.is_empty() { "USD".to_string() } else { c }
                };

                batch.push(
                    Job {
                        title,
                        company,
                        location: geo,
                        description: sanitize_html(&description),
                        url: json_str(item, "url"),
                        source: self.name().to_string(),
                        remote: "Remote".to_string(),
                        salary_min,
                        salary_max,
                        salary_currency,
                        job_type,
                        date_posted: json_str(item, "pubDate"),
                        tags: industry,
                        company_logo: json_str(item, "companyLogo"),
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

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}
