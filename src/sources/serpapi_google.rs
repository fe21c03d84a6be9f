use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::salary::parse_salary_range;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_str, normalize_keywords,
    passes_salary_floor, remote_excluded,
};

/// Google Jobs via SerpAPI - paginated with a start token, ~10 results per
/// page.
pub struct SerpApiGoogleJobsSource {
    client: SourceClient,
    base_url: String,
    api_key: Option<String>,
}

impl SerpApiGoogleJobsSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://serpapi.com/search".to_string(),
            api_key: settings.api_keys.serpapi_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

fn employment_chip(job_type: &str) -> Option<&'static str> {
    let jt = job_type.to_lowercase();
    if jt.contains("full") {
        Some("employment_type:FULLTIME")
    } else if jt.contains("part") {
        Some("employment_type:PARTTIME")
    } else if jt.contains("contract") {
        Some("employment_type:CONTRACTOR")
    } else if jt.contains("intern") {
        Some("employment_type:INTERN")
    } else {
        None
    }
}

#[async_trait]
impl JobSource for SerpApiGoogleJobsSource {
    fn name(&self) -> &'static str {
        "Google Jobs"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let Some(api_key) = &self.api_key else {
            info!("[{}] Skipped - SERPAPI_KEY not configured", self.name());
            return Ok(Vec::new());
        };

        let mut jobs: Vec<Job> = Vec::new();
        let keywords = normalize_keywords(&query.keywords, &[]);

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();

            let mut q = keyword.clone();
            if !query.location.is_empty() {
                q.push_str(&format!(" in {}", query.location));
            }
            if query.remote == "Remote" {
                q.push_str(" remote");
            }

            let mut chips: Vec<&str> = Vec::new();
            if query.remote == "Remote" {
                chips.push("city:Anywhere");
            }
            if let Some(chip) = employment_chip(&query.job_type) {
                chips.push(chip);
            }

            let mut start = 0usize;
            loop {
                let found_for_keyword = jobs.len() - jobs_before_keyword;
                if found_for_keyword >= query.max_results {
                    break;
                }

                let mut params: Vec<(&str, String)> = vec![
                    ("engine", "google_jobs".to_string()),
                    ("q", q.clone()),
                    ("api_key", api_key.clone()),
                    (
                        "num",
                        10.min(query.max_results - found_for_keyword).to_string(),
                    ),
                ];
                if !chips.is_empty() {
                    params.push(("chips", chips.join(",")));
                }
                if start > 0 {
                    params.push(("start", start.to_string()));
                }

                let data = match self.client.get_json(&self.base_url, &params).await {
                    Ok(data) => data,
                    Err(e) => {
                        error!("[{}] Search for '{}' failed: {}", self.name(), keyword, e);
                        break;
                    }
                };

                let results = data
                    .get("jobs_results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if results.is_empty() {
                    break;
                }

                let mut batch: Vec<Job> = Vec::new();
                for item in &results {
                    if jobs.len() - jobs_before_keyword + batch.len() >= query.max_results {
                        break;
                    }

                    let title = json_str(item, "title");
                    let company = json_str(item, "company_name");
                    let loc = json_str(item, "location");
                    let description = json_str(item, "description");

                    let extensions = item
                        .get("detected_extensions")
                        .cloned()
                        .unwrap_or(Value::Null);
                    let posted_at = json_str(&extensions, "posted_at");
                    let schedule_type = json_str(&extensions, "schedule_type");
                    let work_from_home = extensions
                        .get("work_from_home")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);

                    let (salary_min, salary_max) =
                        parse_salary_range(&json_str(&extensions, "salary"));
                    if !passes_salary_floor(salary_max, query.salary_min) {
                        continue;
                    }

                    let is_remote = work_from_home || loc.to_lowercase().contains("remote");
                    if remote_excluded(&query.remote, is_remote) {
                        continue;
                    }

                    let apply_url = item
                        .get("apply_options")
                        .and_then(Value::as_array)
                        .and_then(|opts| opts.first())
                        .map(|opt| json_str(opt, "link"))
                        .filter(|link| !link.is_empty())
                        .unwrap_or_else(|| json_str(item, "share_link"));

                    let via = json_str(item, "via");

                    batch.push(
                        Job {
                            title,
                            company,
                            location: loc,
                            description,
                            url: apply_url,
                            source: self.name().to_string(),
                            remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                            salary_min,
                            salary_max,
                            job_type: schedule_type,
                            date_posted: posted_at,
                            tags: via,
                            ..Default::default()
                        }
                        .finalize(),
                    );
                }

                let page_len = results.len();
                if !batch.is_empty() {
                    sink.flush(&batch).await;
                    jobs.extend(batch);
                }

                if page_len < 10 {
                    break;
                }
                start += page_len;
            }
        }

        info!("[{}] Found {} jobs matching criteria", self.name(), jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_types_map_to_chips() {
        assert_eq!(employment_chip("Full-time"), Some("employment_type:FULLTIME"));
        assert_eq!(employment_chip("Internship"), Some("employment_type:INTERN"));
        assert_eq!(employment_chip(""), None);
    }
}
