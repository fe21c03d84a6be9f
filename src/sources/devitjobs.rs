use async_trait::async_trait;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{
    BatchSink, JobSource, SearchQuery, SourceClient, matches_keywords, passes_salary_floor,
    remote_excluded,
};
use super::feed::parse_feed;

static SALARY_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[£$€]\s*([\d,]+)\s*(?:-|–|to)+\s*[£$€]?\s*([\d,]+)").unwrap());

fn feed_salary(text: &str) -> (Option<f64>, Option<f64>, &'static str) {
    if let Some(caps) = SALARY_RANGE_RE.captures(text) {
        let parse = |s: &str| s.replace(',', "").parse::<f64>().ok().filter(|v| *v > 0.0);
        let currency = if text.contains('€') {
            "EUR"
        } else if text.contains('$') {
            "USD"
        } else {
            "GBP"
        };
        return (parse(&caps[1]), parse(&caps[2]), currency);
    }
    (None, None, "GBP")
}

/// DevITjobs UK - whole-board RSS feed with salary ranges embedded in titles.
pub struct DevItJobsSource {
    client: SourceClient,
    base_url: String,
}

impl DevItJobsSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://devitjobs.uk/job_feed.xml".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for DevItJobsSource {
    fn name(&self) -> &'static str {
        "DevITjobs"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let xml = match self.client.get_text(&self.base_url, &[]).await {
            Ok(xml) => xml,
            Err(e) => {
                error!("[{}] Failed to fetch RSS: {}", self.name(), e);
                return Err(e);
            }
        };

        let mut jobs: Vec<Job> = Vec::new();
        for entry in parse_feed(&xml) {
            if jobs.len() >= query.max_results {
                break;
            }

            let tags = entry.categories.join(", ");
            let searchable = format!("{} {} {}", entry.title, entry.description, tags);
            if !matches_keywords(&searchable, &query.keywords) {
                continue;
            }

            let is_remote = searchable.to_lowercase().contains("remote");
            if remote_excluded(&query.remote, is_remote) {
                continue;
            }

            let salary_text = format!("{} {}", entry.title, entry.description);
            let (salary_min, salary_max, currency) = feed_salary(&salary_text);
            if !passes_salary_floor(salary_max, query.salary_min) {
                continue;
            }

            let date_posted = match entry.published.find('T') {
                Some(idx) => entry.published[..idx].to_string(),
                None => entry.published.clone(),
            };

            jobs.push(
                Job {
                    title: entry.title,
                    location: "United Kingdom".to_string(),
                    description: sanitize_html(&entry.description),
                    url: entry.link,
                    source: self.name().to_string(),
                    remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                    salary_min,
                    salary_max,
                    salary_currency: if salary_min.is_some() || salary_max.is_some() {
                        currency.to_string()
                    } else {
                        String::new()
                    },
                    date_posted,
                    tags,
                    ..Default::default()
                }
                .finalize(),
            );
        }

        if !jobs.is_empty() {
            sink.flush(&jobs).await;
        }
        info!("[{}] Found {} jobs from RSS feed", self.name(), jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_ranges_parse_with_currency() {
        assert_eq!(
            feed_salary("Rust Dev £60,000 - £80,000"),
            (Some(60000.0), Some(80000.0), "GBP")
        );
        assert_eq!(
            feed_salary("Dev €50,000 to €70,000"),
            (Some(50000.0), Some(70000.0), "EUR")
        );
        assert_eq!(feed_salary("no salary here"), (None, None, "GBP"));
    }
}
