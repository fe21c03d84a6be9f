use async_trait::async_trait;
use chrono::DateTime;
use log::{debug, info};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, json_f64, json_str, matches_keywords,
    passes_salary_floor,
};
use super::greenhouse::titlecase_board;

/// Well-known Lever company slugs (jobs.lever.co/<slug>); extend via
/// LEVER_BOARD_TOKENS.
const DEFAULT_BOARDS: [&str; 48] = [
    "netflix", "atlassian", "shopify", "twitch",
    "plaid", "payoneer",
    "grafana", "postman", "snyk", "sentry", "supabase", "render",
    "sourcegraph", "temporal", "hasura", "prisma",
    "openai", "cohere", "weights-and-biases", "replicate", "huggingface",
    "tailscale", "teleport",
    "canva", "miro", "notion", "coda",
    "faire", "whatnot", "goat",
    "deel", "oysterhr", "remotecom", "lattice",
    "tempus", "color", "ro", "hims",
    "ramp", "brex", "mercury", "moderntreasury",
    "dbt-labs", "metabase",
    "loom", "calendly",
    "anduril", "benchling",
];

fn parse_remote(item: &Value, loc_name: &str) -> &'static str {
    match json_str(item, "workplaceType").as_str() {
        "remote" => "Remote",
        "hybrid" => "Hybrid",
        "on-site" => "On-site",
        _ if loc_name.to_lowercase().contains("remote") => "Remote",
        _ => "Unknown",
    }
}

fn parse_job_type(item: &Value) -> String {
    let commitment = item
        .get("categories")
        .map(|c| json_str(c, "commitment"))
        .unwrap_or_default();
    if commitment.is_empty() {
        return String::new();
    }
    let cl = commitment.to_lowercase();
    if cl.contains("full") {
        "Full-time".to_string()
    } else if cl.contains("part") {
        "Part-time".to_string()
    } else if cl.contains("contract") || cl.contains("freelance") {
        "Contract".to_string()
    } else if cl.contains("intern") {
        "Internship".to_string()
    } else {
        commitment
    }
}

/// Lever ATS - public Postings API, one request per company slug.
pub struct LeverSource {
    client: SourceClient,
    base_url: String,
    boards: Vec<String>,
}

impl LeverSource {
    pub fn new(settings: &AppSettings) -> Self {
        let boards = if settings.scrape.lever_board_tokens.is_empty() {
            DEFAULT_BOARDS.iter().map(|s| s.to_string()).collect()
        } else {
            settings.scrape.lever_board_tokens.clone()
        };
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://api.lever.co/v0/postings".to_string(),
            boards,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for LeverSource {
    fn name(&self) -> &'static str {
        "Lever"
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
                .get_json(&url, &[("mode", "json".to_string())])
                .await
            {
                Ok(data) => data,
                Err(e) => {
                    debug!("[{}] Skip board {}: {}", self.name(), board, e);
                    continue;
                }
            };

            let Some(listing) = data.as_array() else {
                continue;
            };

            let mut batch: Vec<Job> = Vec::new();
            for item in listing {
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                let title = json_str(item, "text");
                let cats = item.get("categories").cloned().unwrap_or(Value::Null);
                let loc_name = {
                    let loc = json_str(&cats, "location");
                    if !loc.is_empty() {
                        loc
                    } else {
                        cats.get("allLocations")
                            .and_then(Value::as_array)
                            .map(|l| {
                                l.iter()
                                    .filter_map(Value::as_str)
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            })
                            .unwrap_or_default()
                    }
                };
                let team = json_str(&cats, "team");
                let department = json_str(&cats, "department");

                let searchable =
                    format!("{} {} {} {} {}", title, board, loc_name, team, department);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let remote_status = parse_remote(item, &loc_name);
                if query.remote == "On-site" && remote_status == "Remote" {
                    continue;
                }
                if query.remote == "Remote"
                    && remote_status != "Remote"
                    && remote_status != "Unknown"
                {
                    continue;
                }

                let salary_range = item.get("salaryRange").cloned().unwrap_or(Value::Null);
                let salary_min = json_f64(&salary_range, "min");
                let salary_max = json_f64(&salary_range, "max");
                if !passes_salary_floor(salary_max, query.salary_min) {
                    continue;
                }

                let date_posted = item
                    .get("createdAt")
                    .and_then(Value::as_i64)
                    .and_then(|ms| DateTime::from_timestamp_millis(ms))
                    .map(|dt| dt.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();

                let description = {
                    let plain = json_str(item, "descriptionPlain");
                    if !plain.is_empty() { plain } else { json_str(item, "description") }
                };

                let tags: Vec<String> = [team, department, board.clone()]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect();

                batch.push(
                    Job {
                        title,
                        company: titlecase_board(board),
                        location: loc_name,
                        description: sanitize_html(&description),
                        url: json_str(item, "hostedUrl"),
                        source: self.name().to_string(),
                        remote: remote_status.to_string(),
                        salary_min,
                        salary_max,
                        salary_currency: json_str(&salary_range, "currency"),
                        job_type: parse_job_type(item),
                        date_posted,
                        tags: tags.join(", "),
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

        info!(
            "[{}] Found {} jobs from {} boards",
            self.name(),
            jobs.len(),
            self.boards.len()
        );
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workplace_type_wins_over_location_text() {
        let item = json!({"workplaceType": "hybrid"});
        assert_eq!(parse_remote(&item, "Remote - EU"), "Hybrid");
        let item = json!({});
        assert_eq!(parse_remote(&item, "Remote - EU"), "Remote");
        assert_eq!(parse_remote(&item, "London"), "Unknown");
    }

    #[test]
    fn commitments_map_to_standard_job_types() {
        assert_eq!(parse_job_type(&json!({"categories": {"commitment": "Full-time"}})), "Full-time");
        assert_eq!(parse_job_type(&json!({"categories": {"commitment": "Intern"}})), "Internship");
        assert_eq!(parse_job_type(&json!({})), "");
    }
}
