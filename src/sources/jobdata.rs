use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use serde_json::{Value, json};

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::models::Job;

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str};

const ANON_MAX_PER_HOUR: usize = 10;

/// Consume one unit of the anonymous hourly request budget, persisted across
/// restarts in a small JSON ledger. The read-modify-write is deliberately
/// unsynchronised: the ledger is a best-effort rate hint, not a correctness
/// mechanism.
fn consume_anon_budget(path: &Path) -> bool {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let now = Utc::now().timestamp() as f64;
    let window = 3600.0;

    let mut timestamps: Vec<f64> = std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(&text).ok())
        .and_then(|data| {
            data.get("timestamps").and_then(Value::as_array).map(|a| {
                a.iter()
                    .filter_map(Value::as_f64)
                    .filter(|t| now - t < window)
                    .collect()
            })
        })
        .unwrap_or_default();

    if timestamps.len() >= ANON_MAX_PER_HOUR {
        warn!(
            "[JobData] Anonymous limit reached ({} requests in the last hour). \
             Set JOBDATA_API_KEY for more.",
            timestamps.len()
        );
        return false;
    }

    timestamps.push(now);
    if let Err(e) = std::fs::write(path, json!({ "timestamps": timestamps }).to_string()) {
        warn!("[JobData] Could not write rate-limit file: {}", e);
    }
    true
}

fn experience_code(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "entry" => Some("EN"),
        "mid" => Some("MI"),
        "senior" | "lead" => Some("SE"),
        "executive" => Some("EX"),
        _ => None,
    }
}

fn experience_label(code: &str) -> String {
    match code.to_uppercase().as_str() {
        "EN" => "Entry".to_string(),
        "MI" => "Mid".to_string(),
        "SE" => "Senior".to_string(),
        "EX" => "Executive".to_string(),
        _ => code.to_string(),
    }
}

/// JobData API - works without a key at ~10 anonymous requests per hour,
/// tracked in a file ledger so the limit survives restarts.
pub struct JobDataSource {
    client: SourceClient,
    base_url: String,
    api_key: Option<String>,
    countries: Vec<String>,
    ratelimit_file: PathBuf,
}

impl JobDataSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://jobdataapi.com/api/jobs/".to_string(),
            api_key: settings.api_keys.jobdata_api_key.clone(),
            countries: settings.scrape.jobdata_countries.clone(),
            ratelimit_file: settings.paths.jobdata_ratelimit_file(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn item_to_job(&self, item: &Value) -> Option<Job> {
        let title = json_str(item, "title").trim().to_string();
        if title.is_empty() {
            return None;
        }
        let company_obj = item.get("company").cloned().unwrap_or(Value::Null);
        let company = json_str(&company_obj, "name").trim().to_string();

        let mut url = json_str(item, "application_url").trim().to_string();
        if url.is_empty() {
            let id = item
                .get("id")
                .map(|v| match v {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    _ => String::new(),
                })
                .unwrap_or_default();
            url = format!("https://jobdataapi.com/api/jobs/{}/", id);
        }

        let mut description = {
            let d = json_str(item, "description_string");
            if d.is_empty() { json_str(item, "description") } else { d }
        }
        .trim()
        .to_string();
        if description.len() > 5000 {
            description = description.chars().take(5000).collect();
        }

        let published = json_str(item, "published");
        let date_posted = published.get(..10).unwrap_or("").to_string();

        let has_remote = item
            .get("has_remote")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let salary_currency = {
            let c = json_str(item, "salary_currency").trim().to_string();
            if c.is_empty() { "USD".to_string() } else { c }
        };

        Some(
            Job {
                title,
                company: if company.is_empty() { "Unknown".to_string() } else { company },
                location: json_str(item, "location").trim().to_string(),
                description,
                url,
                source: self.name().to_string(),
                remote: if has_remote { "Remote" } else { "On-site" }.to_string(),
                salary_min: json_f64(item, "salary_min"),
                salary_max: json_f64(item, "salary_max"),
                salary_currency,
                experience_level: experience_label(&json_str(item, "experience_level")),
                date_posted,
                company_logo: json_str(&company_obj, "logo").trim().to_string(),
                ..Default::default()
            }
            .finalize(),
        )
    }
}

#[async_trait]
impl JobSource for JobDataSource {
    fn name(&self) -> &'static str {
        "JobData"
    }

    // Works without a key, rate-limited.
    fn is_available(&self) -> bool {
        true
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let keywords = super::base::normalize_keywords(&query.keywords, &["developer"]);

        let mut base_params: Vec<(&str, String)> = vec![("description_str", "true".to_string())];
        if query.location.trim().len() >= 3 {
            base_params.push(("location", query.location.trim().to_string()));
        }
        if query.remote == "Remote" {
            base_params.push(("has_remote", "true".to_string()));
        }
        if let Some(salary_min) = query.salary_min {
            base_params.push(("min_salary", (salary_min as i64).to_string()));
        }
        if let Some(days) = query.posted_in_last_days.filter(|d| *d > 0) {
            base_params.push(("max_age", days.min(999).to_string()));
        }
        if let Some(code) = experience_code(&query.experience_level) {
            base_params.push(("experience_level", code.to_string()));
        }
        for country in &self.countries {
            base_params.push(("country_code", country.clone()));
        }
        if self.api_key.is_some() {
            base_params.push(("page_size", query.max_results.clamp(1, 5000).to_string()));
        }

        let max_pages_per_keyword = 20;
        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();
            if self.api_key.is_none() && !consume_anon_budget(&self.ratelimit_file) {
                break;
            }

            let title_param = if keyword.len() >= 3 {
                keyword.clone()
            } else {
                "developer".to_string()
            };

            let mut page = 1usize;
            let mut pages_this_keyword = 0;
            loop {
                if jobs.len() - jobs_before_keyword >= query.max_results
                    || pages_this_keyword >= max_pages_per_keyword
                {
                    break;
                }

                let mut params = base_params.clone();
                params.push(("title", title_param.clone()));
                if self.api_key.is_some() {
                    params.push(("page", page.to_string()));
                }

                self.client.throttle().await;
                let mut request = self.client.inner().get(&self.base_url).query(&params);
                if let Some(api_key) = &self.api_key {
                    request = request.header("Authorization", format!("Api-Key {}", api_key));
                }

                let data: Value = match request
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| AppError::External(format!("JobData request failed: {}", e)))
                {
                    Ok(resp) => match resp.json().await {
                        Ok(json) => json,
                        Err(e) => {
                            error!("[{}] Invalid JSON: {}", self.name(), e);
                            break;
                        }
                    },
                    Err(e) => {
                        error!("[{}] Request failed: {}", self.name(), e);
                        break;
                    }
                };

                let results = data
                    .get("results")
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
                    if let Some(job) = self.item_to_job(item) {
                        if !job.url.is_empty() && seen_urls.insert(job.url.clone()) {
                            batch.push(job);
                        }
                    }
                }
                if !batch.is_empty() {
                    sink.flush(&batch).await;
                    jobs.extend(batch);
                }

                if self.api_key.is_none() {
                    break;
                }
                let has_next = data.get("next").map(|n| !n.is_null()).unwrap_or(false);
                if !has_next {
                    break;
                }
                page += 1;
                pages_this_keyword += 1;
            }
        }

        // The API has no sort parameter; newest first, undated rows last.
        jobs.sort_by(|a, b| {
            let key = |j: &Job| {
                let d = j.date_posted.trim().get(..10).unwrap_or("");
                let valid = d.len() == 10
                    && d.replace('-', "").chars().all(|c| c.is_ascii_digit());
                (valid, if valid { d.to_string() } else { String::new() })
            };
            key(b).cmp(&key(a))
        });

        info!("[{}] Fetched {} jobs (newest first)", self.name(), jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_budget_caps_at_ten_per_hour() {
        let dir = std::env::temp_dir().join("jobsearch-jobdata-ledger-test");
        let path = dir.join("ratelimit.json");
        let _ = std::fs::remove_file(&path);

        for _ in 0..ANON_MAX_PER_HOUR {
            assert!(consume_anon_budget(&path));
        }
        assert!(!consume_anon_budget(&path));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn experience_levels_round_trip() {
        assert_eq!(experience_code("Senior"), Some("SE"));
        assert_eq!(experience_code("unknown"), None);
        assert_eq!(experience_label("EN"), "Entry");
        assert_eq!(experience_label("odd"), "odd");
    }
}
