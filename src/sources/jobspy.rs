use std::collections::HashSet;

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::prelude::IndexedRandom;

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::models::Job;

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, normalize_keywords};
use super::linkedin_direct::{SEARCH_API_PATH, parse_guest_cards, time_bucket};

/// Rotating user agents to reduce fingerprinting and 429/CAPTCHA blocks.
const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Map a configured country name to the location string the board search
/// understands.
fn country_location(country: &str) -> &str {
    match country.trim().to_uppercase().as_str() {
        "USA" | "US" => "United States",
        "UK" | "GB" => "United Kingdom",
        other if other.is_empty() => "United States",
        _ => country.trim(),
    }
}

/// Multi-board scraper ("JobSpy") - iterates (keyword, country) pairs with an
/// enforced delay between scrape calls. Board back-ends are pluggable; this
/// build ships the LinkedIn guest back-end, and configured sites without a
/// back-end are skipped with a log line.
pub struct JobSpySource {
    client: SourceClient,
    base_url: String,
    countries: Vec<String>,
    sites: Vec<String>,
    source_name: &'static str,
}

impl JobSpySource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::with_delay(&settings.scrape, settings.scrape.jobspy_delay_secs),
            base_url: "https://www.linkedin.com".to_string(),
            countries: settings.scrape.jobspy_countries.clone(),
            sites: settings.scrape.jobspy_sites.clone(),
            source_name: "JobSpy",
        }
    }

    /// The "LinkedIn" source is this scraper restricted to a single site.
    pub fn linkedin_only(settings: &AppSettings) -> Self {
        let mut source = Self::new(settings);
        source.sites = vec!["linkedin".to_string()];
        source.source_name = "LinkedIn";
        source
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn supported_sites(&self) -> Vec<&str> {
        self.sites
            .iter()
            .filter_map(|site| {
                let site = site.trim().to_lowercase();
                if site == "linkedin" {
                    Some("linkedin")
                } else {
                    debug!(
                        "[{}] No back-end for site '{}' in this build; skipping",
                        self.source_name, site
                    );
                    None
                }
            })
            .collect()
    }

    async fn scrape_linkedin(
        &self,
        keyword: &str,
        location: &str,
        query: &SearchQuery,
        budget: usize,
        seen_urls: &mut HashSet<String>,
    ) -> AppResult<Vec<Job>> {
        let mut params: Vec<(&str, String)> = vec![
            ("keywords", keyword.to_string()),
            ("location", location.to_string()),
            ("start", "0".to_string()),
        ];
        if query.remote == "Remote" {
            params.push(("f_WT", "2".to_string()));
        }
        if let Some(bucket) = time_bucket(query.posted_in_last_days) {
            params.push(("f_TPR", bucket.to_string()));
        }

        let user_agent = *USER_AGENTS.choose(&mut rand::rng()).unwrap_or(&USER_AGENTS[0]);

        let url = format!("{}{}", self.base_url, SEARCH_API_PATH);
        let html = self
            .client
            .inner()
            .get(&url)
            .query(&params)
            .header("User-Agent", user_agent)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::External(format!("Scrape failed: {}", e)))?
            .text()
            .await
            .map_err(|e| AppError::External(format!("Failed to read body: {}", e)))?;

        let cards = parse_guest_cards(&html, self.source_name, keyword, &query.remote);
        Ok(cards
            .jobs
            .into_iter()
            .filter(|job| seen_urls.insert(job.url.clone()))
            .take(budget)
            .collect())
    }
}

#[async_trait]
impl JobSource for JobSpySource {
    fn name(&self) -> &'static str {
        self.source_name
    }

    fn is_available(&self) -> bool {
        !self.supported_sites().is_empty()
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let sites = self.supported_sites();
        if sites.is_empty() {
            info!("[{}] Skipped - no supported sites configured", self.name());
            return Ok(Vec::new());
        }

        let countries: Vec<String> = if self.countries.is_empty() {
            vec!["USA".to_string()]
        } else {
            self.countries.clone()
        };

        let keywords = normalize_keywords(&query.keywords, &[]);
        let per_combo = (query.max_results / countries.len().max(1)).max(5);

        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut first_request = true;

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();

            for country in &countries {
                if jobs.len() - jobs_before_keyword >= query.max_results {
                    break;
                }
                if !first_request {
                    info!(
                        "[{}] Rate limit delay {:.1}s before next request ...",
                        self.name(),
                        self.client.delay().as_secs_f64()
                    );
                    self.client.throttle().await;
                }
                first_request = false;

                let location = if query.location.is_empty() {
                    country_location(country).to_string()
                } else {
                    query.location.clone()
                };
                let remaining = query.max_results - (jobs.len() - jobs_before_keyword);
                let budget = per_combo.min(remaining);

                match self
                    .scrape_linkedin(keyword, &location, query, budget, &mut seen_urls)
                    .await
                {
                    Ok(batch) => {
                        if !batch.is_empty() {
                            sink.flush(&batch).await;
                            jobs.extend(batch);
                        }
                    }
                    Err(e) => {
                        warn!("[{}] '{}' @ {} failed: {}", self.name(), keyword, country, e);
                    }
                }
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
    fn country_names_map_to_board_locations() {
        assert_eq!(country_location("USA"), "United States");
        assert_eq!(country_location("uk"), "United Kingdom");
        assert_eq!(country_location("Germany"), "Germany");
    }

    #[test]
    fn unsupported_sites_are_filtered() {
        let mut settings = AppSettings::from_env().unwrap();
        settings.scrape.jobspy_sites =
            vec!["indeed".to_string(), "linkedin".to_string(), "glassdoor".to_string()];
        let source = JobSpySource::new(&settings);
        assert_eq!(source.supported_sites(), vec!["linkedin"]);
        assert!(source.is_available());

        settings.scrape.jobspy_sites = vec!["indeed".to_string()];
        let source = JobSpySource::new(&settings);
        assert!(!source.is_available());
    }

    #[test]
    fn linkedin_alias_restricts_sites() {
        let settings = AppSettings::from_env().unwrap();
        let source = JobSpySource::linkedin_only(&settings);
        assert_eq!(source.name(), "LinkedIn");
        assert_eq!(source.supported_sites(), vec!["linkedin"]);
    }
}
