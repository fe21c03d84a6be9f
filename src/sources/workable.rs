use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_str, matches_keywords, remote_excluded,
};
use super::greenhouse::titlecase_board;

/// Well-known Workable account subdomains (apply.workable.com/<subdomain>);
/// extend via WORKABLE_BOARD_TOKENS.
const DEFAULT_BOARDS: [&str; 36] = [
    "commvault", "toggl", "hotjar", "mimecast",
    "dataiku", "typeform", "contentful", "algolia",
    "zapier", "automattic", "buffer", "doist",
    "pleo", "tide", "monzo",
    "deepl", "synthesia",
    "detectify", "immunefi", "hackerone",
    "docplanner", "recruitee", "personio", "factorial",
    "preply", "busuu", "babbel",
    "vinted", "catawiki",
    "wise", "revolut", "n26", "mollie",
    "omnipresent", "blablacar", "veriff",
];

fn parse_job_type(type_str: &str) -> String {
    if type_str.is_empty() {
        return String::new();
    }
    let tl = type_str.to_lowercase();
    if tl.contains("full") {
        "Full-time".to_string()
    } else if tl.contains("part") {
        "Part-time".to_string()
    } else if tl.contains("contract") || tl.contains("freelance") || tl.contains("temporary") {
        "Contract".to_string()
    } else if tl.contains("intern") {
        "Internship".to_string()
    } else {
        type_str.to_string()
    }
}

fn parse_location(item: &Value) -> String {
    match item.get("location") {
        Some(Value::Object(loc)) => {
            let parts: Vec<String> = ["city", "region", "country"]
                .iter()
                .filter_map(|key| loc.get(*key).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            if parts.is_empty() {
                loc.get("location_str")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            } else {
                parts.join(", ")
            }
        }
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Workable ATS - public widget API, one request per account subdomain.
pub struct WorkableSource {
    client: SourceClient,
    base_url: String,
    boards: Vec<String>,
}

impl WorkableSource {
    pub fn new(settings: &AppSettings) -> Self {
        let boards = if settings.scrape.workable_board_tokens.is_empty() {
            DEFAULT_BOARDS.iter().map(|s| s.to_string()).collect()
        } else {
            settings.scrape.workable_board_tokens.clone()
        };
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://apply.workable.com/api/v1/widget/accounts".to_string(),
            boards,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for WorkableSource {
    fn name(&self) -> &'static str {
        "Workable"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = Vec::new();

        for board in &self.boards {
            if jobs.len() >= query.max_results {
                break;
            }

            let url = format!("{}/{}", self.base_url, board);
            let data = match self.client.get_json(&url, &[]).await {
                Ok(data) => data,
                Err(e) => {
                    debug!("[{}] Skip board {}: {}", self.name(), board, e);
                    continue;
                }
            };

            // The widget returns { "jobs": [...] } or a bare list.
            let listing = match &data {
                Value::Object(_) => data
                    .get("jobs")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                Value::Array(arr) => arr.clone(),
                _ => continue,
            };

            let mut batch: Vec<Job> = Vec::new();
            for item in &listing {
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "title");
                let department = json_str(item, "department");
                let loc_name = parse_location(item);

                let searchable = format!("{} {} {} {}", title, board, loc_name, department);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let is_remote = item
                    .get("telecommuting")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                    || loc_name.to_lowercase().contains("remote");
                if remote_excluded(&query.remote, is_remote) {
                    continue;
                }

                let shortcode = {
                    let sc = json_str(item, "shortcode");
                    if sc.is_empty() { json_str(item, "id") } else { sc }
                };
                let mut job_url = json_str(item, "url");
                if job_url.is_empty() && !shortcode.is_empty() {
                    job_url = format!("https://apply.workable.com/{}/j/{}/", board, shortcode);
                }

                let mut date_posted = {
                    let p = json_str(item, "published_on");
                    if p.is_empty() { json_str(item, "created_at") } else { p }
                };
                if let Some(idx) = date_posted.find('T') {
                    date_posted.truncate(idx);
                }

                let job_type = {
                    let t = json_str(item, "employment_type");
                    if t.is_empty() { json_str(item, "type") } else { t }
                };

                batch.push(
                    Job {
                        title,
                        company: titlecase_board(board),
                        location: loc_name,
                        description: sanitize_html(&json_str(item, "description")),
                        url: job_url,
                        source: self.name().to_string(),
                        remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                        job_type: parse_job_type(&job_type),
                        date_posted,
                        tags: [department, board.clone()]
                            .into_iter()
                            .filter(|s| !s.is_empty())
                            .collect::<Vec<_>>()
                            .join(", "),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn location_objects_join_city_region_country() {
        let item = json!({"location": {"city": "Berlin", "country": "Germany"}});
        assert_eq!(parse_location(&item), "Berlin, Germany");
        let item = json!({"location": {"location_str": "Anywhere"}});
        assert_eq!(parse_location(&item), "Anywhere");
        let item = json!({"location": "Lisbon"});
        assert_eq!(parse_location(&item), "Lisbon");
    }
}
