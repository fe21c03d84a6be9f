use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, normalize_keywords,
    remote_excluded,
};

/// USAJobs - US federal listings, free key + registered email in headers.
pub struct UsaJobsSource {
    client: SourceClient,
    base_url: String,
    api_key: Option<String>,
    email: Option<String>,
}

impl UsaJobsSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://data.usajobs.gov/api/Search".to_string(),
            api_key: settings.api_keys.usajobs_api_key.clone(),
            email: settings.api_keys.usajobs_email.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for UsaJobsSource {
    fn name(&self) -> &'static str {
        "USAJobs"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() && self.email.is_some()
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let (Some(api_key), Some(email)) = (&self.api_key, &self.email) else {
            info!("[{}] Skipped - API key not configured", self.name());
            return Ok(Vec::new());
        };

        let mut jobs: Vec<Job> = Vec::new();
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();

            let mut params: Vec<(&str, String)> = vec![
                ("Keyword", keyword.clone()),
                ("ResultsPerPage", "50".to_string()),
            ];
            if !query.location.is_empty() {
                params.push(("LocationName", query.location.clone()));
            }
            if let Some(salary_min) = query.salary_min {
                params.push(("RemunerationMinimumAmount", (salary_min as i64).to_string()));
            }
            if query.remote == "Remote" {
                params.push(("RemoteIndicator", "True".to_string()));
            }

            self.client.throttle().await;
            let payload: Value = match self
                .client
                .inner()
                .get(&self.base_url)
                .query(&params)
                .header("Authorization-Key", api_key)
                .header("User-Agent", email)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| AppError::External(format!("USAJobs request failed: {}", e)))
            {
                Ok(resp) => match resp.json().await {
                    Ok(json) => json,
                    Err(e) => {
                        error!("[{}] Invalid JSON for '{}': {}", self.name(), keyword, e);
                        continue;
                    }
                },
                Err(e) => {
                    error!("[{}] Search for '{}' failed: {}", self.name(), keyword, e);
                    continue;
                }
            };

            let items = payload
                .get("SearchResult")
                .and_then(|r| r.get("SearchResultItems"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let mut batch: Vec<Job> = Vec::new();
            for entry in &items {
                if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                    break;
                }

                let item = entry
                    .get("MatchedObjectDescriptor")
                    .cloned()
                    .unwrap_or(Value::Null);
                let title = json_str(&item, "PositionTitle");
                let org = json_str(&item, "OrganizationName");
                let department = json_str(&item, "DepartmentName");

                let location_str = item
                    .get("PositionLocation")
                    .and_then(Value::as_array)
                    .map(|locs| {
                        locs.iter()
                            .map(|pl| json_str(pl, "LocationName"))
                            .filter(|s| !s.is_empty())
                            .take(3)
                            .collect::<Vec<_>>()
                            .join("; ")
                    })
                    .unwrap_or_default();

                let details = item
                    .get("UserArea")
                    .and_then(|ua| ua.get("Details"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let description = format!(
                    "{} {}",
                    json_str(&item, "QualificationSummary"),
                    json_str(&details, "MajorDuties")
                )
                .trim()
                .to_string();

                let url = item
                    .get("ApplyURI")
                    .and_then(Value::as_array)
                    .and_then(|uris| uris.first())
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| json_str(&item, "PositionURI"));

                let remuneration = item
                    .get("PositionRemuneration")
                    .and_then(Value::as_array)
                    .and_then(|r| r.first())
                    .cloned()
                    .unwrap_or(Value::Null);
                let salary_min = json_f64(&remuneration, "MinimumRange");
                let salary_max = json_f64(&remuneration, "MaximumRange");

                let schedule = item
                    .get("PositionSchedule")
                    .and_then(Value::as_array)
                    .and_then(|s| s.first())
                    .map(|s| json_str(s, "Name"))
                    .unwrap_or_default();

                let is_remote = json_str(&details, "TeleworkEligible") == "True";
                if remote_excluded(&query.remote, is_remote) {
                    continue;
                }

                let tags = item
                    .get("JobCategory")
                    .and_then(Value::as_array)
                    .and_then(|c| c.first())
                    .map(|c| json_str(c, "Name"))
                    .unwrap_or_default();

                batch.push(
                    Job {
                        title,
                        company: if department.is_empty() {
                            org
                        } else {
                            format!("{} - {}", org, department)
                        },
                        location: location_str,
                        description: sanitize_html(&description),
                        url,
                        source: self.name().to_string(),
                        remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                        salary_min,
                        salary_max,
                        salary_currency: "USD".to_string(),
                        job_type: schedule,
                        date_posted: json_str(&item, "PublicationStartDate"),
                        tags,
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
