use std::collections::HashSet;

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

/// Keyword trigger -> JobsCollider category slug.
const CATEGORY_MAP: [(&str, &str); 20] = [
    ("software", "software-development"),
    ("developer", "software-development"),
    ("engineer", "software-development"),
    ("data", "data"),
    ("devops", "devops-sysadmin"),
    ("sysadmin", "devops-sysadmin"),
    ("design", "design"),
    ("marketing", "marketing"),
    ("sales", "sales"),
    ("product", "product"),
    ("qa", "qa"),
    ("security", "cybersecurity"),
    ("cyber", "cybersecurity"),
    ("finance", "finance-legal"),
    ("legal", "finance-legal"),
    ("hr", "human-resources"),
    ("writing", "writing"),
    ("customer", "customer-service"),
    ("project", "project-management"),
    ("business", "business"),
];

fn guess_category(term: &str) -> Option<&'static str> {
    let kw = term.to_lowercase();
    CATEGORY_MAP
        .iter()
        .find(|(word, _)| kw.contains(word))
        .map(|(_, cat)| *cat)
}

/// Fall back across a list of alternative vendor field names.
fn first_str(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| json_str(item, k))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// JobsCollider - free remote-jobs search API.
pub struct JobsColliderSource {
    client: SourceClient,
    base_url: String,
}

impl JobsColliderSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://jobscollider.com/api/search-jobs".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for JobsColliderSource {
    fn name(&self) -> &'static str {
        "JobsCollider"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        if query.wants_on_site_only() {
            return Ok(Vec::new());
        }

        let search_terms = normalize_keywords(&query.keywords, &[]);
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut jobs: Vec<Job> = Vec::new();

        for term in &search_terms {
            if jobs.len() >= query.max_results {
                break;
            }

            let mut params: Vec<(&str, String)> = vec![("query", term.clone())];
            if let Some(category) = guess_category(term) {
                params.push(("category", category.to_string()));
            }

            let data = match self.client.get_json(&self.base_url, &params).await {
                Ok(data) => data,
                Err(e) => {
                    error!("[{}] Failed to fetch for '{}': {}", self.name(), term, e);
                    continue;
                }
            };

            let listings = match &data {
                Value::Array(arr) => arr.clone(),
                Value::Object(_) => data
                    .get("jobs")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                _ => Vec::new(),
            };

            let mut batch: Vec<Job> = Vec::new();
            for item in &listings {
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                let title = first_str(item, &["title", "name"]);
                let company = first_str(item, &["company", "companyName"]);
                let job_url = first_str(item, &["url", "link"]);
                let loc_name = {
                    let l = json_str(item, "location");
                    if l.is_empty() { "Remote".to_string() } else { l }
                };

                if !seen_urls.insert(job_url.clone()) {
                    continue;
                }

                let searchable = format!("{} {} {}", title, company, loc_name);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let salary_min =
                    json_f64(item, "salary_min").or_else(|| json_f64(item, "salaryMin"));
                let salary_max =
                    json_f64(item, "salary_max").or_else(|| json_f64(item, "salaryMax"));
                if !passes_salary_floor(salary_max, query.salary_min) {
                    continue;
                }

                let mut date_posted = first_str(item, &["date", "publishedAt", "pubDate"]);
                if let Some(idx) = date_posted.find('T') {
                    date_posted.truncate(idx);
                }

                let tags = match item.get("tags").or_else(|| item.get("categories")) {
                    Some(Value::Array(list)) => list
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                };

                batch.push(
                    Job {
                        title,
                        company,
                        location: loc_name,
                        description: sanitize_html(&json_str(item, "description")),
                        url: job_url,
                        source: self.name().to_string(),
                        remote: "Remote".to_string(),
                        salary_min,
                        salary_max,
                        salary_currency: first_str(item, &["salary_currency", "salaryCurrency"]),
                        job_type: first_str(item, &["type", "jobType"]),
                        date_posted,
                        tags,
                        company_logo: first_str(item, &["logo", "companyLogo"]),
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

    #[test]
    fn categories_are_guessed_from_terms() {
        assert_eq!(guess_category("software engineer"), Some("software-development"));
        assert_eq!(guess_category("security analyst"), Some("cybersecurity"));
        assert_eq!(guess_category("zookeeper"), None);
    }
}
