use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;
use crate::utils::salary::parse_salary_range;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_str, matches_keywords,
    normalize_keywords, passes_salary_floor,
};

/// Keyword trigger -> Remotive category slug, for smarter server-side queries.
const CATEGORY_MAP: [(&str, &str); 16] = [
    ("software", "software-dev"),
    ("engineer", "software-dev"),
    ("developer", "software-dev"),
    ("data", "data"),
    ("analyst", "data"),
    ("machine learning", "data"),
    ("design", "design"),
    ("marketing", "marketing"),
    ("product", "product"),
    ("customer", "customer-support"),
    ("sales", "sales"),
    ("devops", "devops-sysadmin"),
    ("finance", "finance-legal"),
    ("hr", "hr"),
    ("writing", "writing"),
    ("qa", "qa"),
];

fn category_for(keyword: &str) -> Option<&'static str> {
    let kw = keyword.to_lowercase();
    CATEGORY_MAP
        .iter()
        .find(|(trigger, _)| kw.contains(trigger))
        .map(|(_, cat)| *cat)
}

/// Remotive - free API for remote jobs worldwide; category + search filtering.
pub struct RemotiveSource {
    client: SourceClient,
    base_url: String,
}

impl RemotiveSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://remotive.com/api/remote-jobs".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for RemotiveSource {
    fn name(&self) -> &'static str {
        "Remotive"
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
                vec![("limit", query.max_results.min(1000).to_string())];
            if !keyword.is_empty() {
                if let Some(category) = category_for(keyword) {
                    params.push(("category", category.to_string()));
                }
                params.push(("search", keyword.clone()));
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
                let location = {
                    let loc = json_str(item, "candidate_required_location");
                    if loc.is_empty() { "Worldwide".to_string() } else { loc }
                };

                let (salary_min, salary_max) = parse_salary_range(&json_str(item, "salary"));
                if !passes_salary_floor(salary_max, query.salary_min) {
                    continue;
                }

                let searchable = format!("{} {} {} {}", title, company, description, tags_str);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let job_type = json_str(item, "job_type").replace('_', " ");

                batch.push(
                    Job {
                        title,
                        company,
                        location,
                        description: sanitize_html(&description),
                        url: json_str(item, "url"),
                        source: self.name().to_string(),
                        remote: "Remote".to_string(),
                        salary_min,
                        salary_max,
                        salary_currency: "USD".to_string(),
                        job_type,
                        date_posted: json_str(item, "publication_date"),
                        tags: tags_str,
                        company_logo: json_str(item, "company_logo"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_map_to_categories() {
        assert_eq!(category_for("software engineer"), Some("software-dev"));
        assert_eq!(category_for("Data Analyst"), Some("data"));
        assert_eq!(category_for("gardening"), None);
    }
}
