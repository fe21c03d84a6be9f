use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, matches_keywords,
    passes_salary_floor, remote_excluded,
};

/// Well-known Ashby board names (jobs.ashbyhq.com/<name>); extend via
/// ASHBY_BOARD_TOKENS.
const DEFAULT_BOARDS: [&str; 40] = [
    "Anthropic", "Perplexity", "Cohere", "ElevenLabs",
    "Linear", "Vercel", "Railway", "Fly", "Resend",
    "Neon", "Convex", "Inngest",
    "Ramp", "Brex", "Mercury",
    "Wiz", "Huntress", "Materialize",
    "Fivetran", "Census", "Hightouch", "Hex",
    "Alma", "Headway",
    "Deel", "Ashby", "Gusto", "Rippling",
    "Faire", "Whatnot",
    "Loom", "Pitch", "Rows",
    "Anduril", "Flexport", "Verkada", "Samsara",
    "Plaid", "Retool", "Notion",
];

fn parse_employment_type(emp_type: &str) -> String {
    if emp_type.is_empty() {
        return String::new();
    }
    let el = emp_type.to_lowercase();
    if el.contains("full") {
        "Full-time".to_string()
    } else if el.contains("part") {
        "Part-time".to_string()
    } else if el.contains("contract") || el.contains("freelance") {
        "Contract".to_string()
    } else if el.contains("intern") {
        "Internship".to_string()
    } else {
        emp_type.to_string()
    }
}

fn parse_compensation(item: &Value) -> (Option<f64>, Option<f64>, String) {
    let Some(comp) = item.get("compensation").filter(|c| c.is_object()) else {
        return (None, None, String::new());
    };
    let tiers = comp
        .get("compensationTierSummary")
        .or_else(|| comp.get("tiers"))
        .and_then(Value::as_array);
    if let Some(tier) = tiers.and_then(|t| t.first()).filter(|t| t.is_object()) {
        let currency = {
            let c = json_str(tier, "currency");
            if c.is_empty() { json_str(comp, "currency") } else { c }
        };
        return (json_f64(tier, "min"), json_f64(tier, "max"), currency);
    }
    (
        json_f64(comp, "min"),
        json_f64(comp, "max"),
        json_str(comp, "currency"),
    )
}

/// Ashby ATS - public job-board API, one request per board name.
pub struct AshbySource {
    client: SourceClient,
    base_url: String,
    boards: Vec<String>,
}

impl AshbySource {
    pub fn new(settings: &AppSettings) -> Self {
        let boards = if settings.scrape.ashby_board_tokens.is_empty() {
            DEFAULT_BOARDS.iter().map(|s| s.to_string()).collect()
        } else {
            settings.scrape.ashby_board_tokens.clone()
        };
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://api.ashbyhq.com/posting-api/job-board".to_string(),
            boards,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for AshbySource {
    fn name(&self) -> &'static str {
        "Ashby"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = Vec::new();

        for board in &self.boards {
            if jobs.len() >= query.max_results {
                break;
            }

            let url = format!("{}/{}", self.base_url, board);
            let data = match self
                .client
                .get_json(&url, &[("includeCompensation", "true".to_string())])
                .await
            {
                Ok(data) => data,
                Err(e) => {
                    debug!("[{}] Skip board {}: {}", self.name(), board, e);
                    continue;
                }
            };

            let listing = data
                .get("jobs")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let mut batch: Vec<Job> = Vec::new();
            for item in &listing {
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "title");
                let department = json_str(item, "department");
                let loc_name = match item.get("location") {
                    Some(Value::Object(_)) => item
                        .get("location")
                        .map(|l| json_str(l, "name"))
                        .unwrap_or_default(),
                    _ => json_str(item, "location"),
                };
                let emp_type = json_str(item, "employmentType");

                let searchable = format!("{} {} {} {}", title, board, loc_name, department);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let is_remote = item
                    .get("isRemote")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                    || loc_name.to_lowercase().contains("remote");
                if remote_excluded(&query.remote, is_remote) {
                    continue;
                }

                let (salary_min, salary_max, salary_currency) = parse_compensation(item);
                if !passes_salary_floor(salary_max, query.salary_min) {
                    continue;
                }

                let mut job_url = json_str(item, "jobUrl");
                if job_url.is_empty() {
                    job_url = json_str(item, "applyUrl");
                }
                if job_url.is_empty() {
                    let posting_id = json_str(item, "id");
                    if !posting_id.is_empty() {
                        job_url = format!("https://jobs.ashbyhq.com/{}/{}", board, posting_id);
                    }
                }

                let date_posted = {
                    let published = json_str(item, "publishedAt");
                    published.chars().take(10).collect::<String>()
                };

                batch.push(
                    Job {
                        title,
                        company: board.clone(),
                        location: loc_name,
                        description: sanitize_html(&json_str(item, "descriptionHtml")),
                        url: job_url,
                        source: self.name().to_string(),
                        remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                        salary_min,
                        salary_max,
                        salary_currency,
                        job_type: parse_employment_type(&emp_type),
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
    fn compensation_tiers_take_priority() {
        let item = json!({"compensation": {
            "compensationTierSummary": [{"min": 100000, "max": 150000, "currency": "USD"}],
            "min": 1, "max": 2, "currency": "EUR"
        }});
        assert_eq!(
            parse_compensation(&item),
            (Some(100000.0), Some(150000.0), "USD".to_string())
        );
    }

    #[test]
    fn flat_compensation_is_a_fallback() {
        let item = json!({"compensation": {"min": 90000, "max": 120000, "currency": "GBP"}});
        assert_eq!(
            parse_compensation(&item),
            (Some(90000.0), Some(120000.0), "GBP".to_string())
        );
        assert_eq!(parse_compensation(&json!({})), (None, None, String::new()));
    }

    #[test]
    fn employment_types_normalise() {
        assert_eq!(parse_employment_type("FullTime"), "Full-time");
        assert_eq!(parse_employment_type("Intern"), "Internship");
        assert_eq!(parse_employment_type(""), "");
    }
}
