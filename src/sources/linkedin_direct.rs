use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Local;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::utils::http_client::SCRAPE_USER_AGENT;
use crate::utils::salary::{parse_salary_amount, resolve_relative_date};

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, normalize_keywords};

const BASE_URL: &str = "https://www.linkedin.com";
/// Guest API returning HTML job cards without JavaScript; the /jobs/search/
/// webpage is JS-rendered and returns no cards to a plain HTTP client.
pub(super) const SEARCH_API_PATH: &str = "/jobs-guest/jobs/api/seeMoreJobPostings/search";

static REMOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(remote|wfh|work from home)").unwrap());
static ISO_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

/// f_TPR time buckets accepted by both the guest API and the website.
pub(super) fn time_bucket(posted_in_last_days: Option<u32>) -> Option<&'static str> {
    match posted_in_last_days? {
        0 => None,
        1 => Some("r86400"),
        2..=7 => Some("r604800"),
        _ => Some("r2592000"),
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse exact doubled titles ("TitleTitle" -> "Title"); the cards repeat
/// the visible text in screen-reader spans.
fn dedupe_title(title: &str) -> String {
    let title = title.trim();
    let chars: Vec<char> = title.chars().collect();
    if chars.len() >= 2 && chars.len() % 2 == 0 {
        let half = chars.len() / 2;
        if chars[..half] == chars[half..] {
            return chars[..half].iter().collect();
        }
    }
    title.to_string()
}

pub(super) struct GuestCards {
    pub jobs: Vec<Job>,
    pub card_count: usize,
}

/// Parse the guest API's HTML cards. Selector order prefers the guest DOM and
/// degrades through the logged-in layouts. Synchronous: the parsed document is
/// not Send and must not cross an await.
pub(super) fn parse_guest_cards(
    html: &str,
    source_name: &str,
    fallback_title: &str,
    remote_filter: &str,
) -> GuestCards {
    let card_sel = Selector::parse(
        "div.job-search-card, div.base-card, li div.base-card, a.base-card__full-link",
    )
    .unwrap();
    let title_sel = Selector::parse(
        ".base-search-card__title, h3.base-search-card__title, \
         .job-card-list__title, .artdeco-entity-lockup__title",
    )
    .unwrap();
    let link_sel = Selector::parse(
        "a.base-card__full-link, a.job-card-container__link, a[href*='/jobs/view/']",
    )
    .unwrap();
    let company_sel = Selector::parse(
        ".base-search-card__subtitle, h4.base-search-card__subtitle, \
         .job-card-container__primary-description, .artdeco-entity-lockup__subtitle",
    )
    .unwrap();
    let location_sel = Selector::parse(
        ".job-search-card__location, .job-card-container__metadata-item, \
         .artdeco-entity-lockup__caption",
    )
    .unwrap();
    let salary_sel = Selector::parse(".job-search-card__salary-info").unwrap();
    let time_sel = Selector::parse("time").unwrap();

    let document = Html::parse_document(html);
    let cards: Vec<ElementRef> = document.select(&card_sel).collect();
    let card_count = cards.len();

    let mut jobs: Vec<Job> = Vec::new();
    for card in &cards {
        let title = card
            .select(&title_sel)
            .next()
            .map(|el| dedupe_title(&element_text(&el)))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title.to_string());

        let mut href = card
            .select(&link_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if href.is_empty() && card.value().name() == "a" {
            href = card.value().attr("href").unwrap_or_default().trim().to_string();
        }
        if !href.is_empty() && !href.starts_with("http") {
            href = format!("{}{}", BASE_URL, href);
        }
        if href.is_empty() || !href.contains("/jobs/") || href.contains("premium/products") {
            continue;
        }

        let company = card
            .select(&company_sel)
            .next()
            .map(|el| element_text(&el))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let location = card
            .select(&location_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        let is_remote = REMOTE_RE.is_match(&location) || REMOTE_RE.is_match(&title);
        if remote_filter == "Remote" && !is_remote {
            continue;
        }

        let mut date_posted = String::new();
        if let Some(time_el) = card.select(&time_sel).next() {
            let dt_attr = time_el.value().attr("datetime").unwrap_or_default().trim();
            if ISO_PREFIX_RE.is_match(dt_attr) {
                date_posted = dt_attr[..10].to_string();
            } else {
                date_posted = resolve_relative_date(&element_text(&time_el));
            }
        }
        if date_posted.is_empty() {
            date_posted = Local::now().format("%Y-%m-%d").to_string();
        }

        // Salary badge like "$70K/yr - $90K/yr" when present.
        let (salary_min, salary_max) = card
            .select(&salary_sel)
            .next()
            .map(|el| {
                let text = element_text(&el);
                let mut amounts = text.split(['-', '–']).filter_map(|part| {
                    parse_salary_amount(part.trim().trim_start_matches(['$', '£', '€']))
                });
                let min = amounts.next();
                let max = amounts.next().or(min);
                (min, max)
            })
            .unwrap_or((None, None));

        jobs.push(
            Job {
                title,
                company,
                location,
                url: href,
                source: source_name.to_string(),
                remote: if is_remote { "Remote" } else { "On-site" }.to_string(),
                salary_min,
                salary_max,
                date_posted,
                ..Default::default()
            }
            .finalize(),
        );
    }

    GuestCards { jobs, card_count }
}

/// LinkedIn (Direct) - in-house scraper driving the jobs-guest API. Runs
/// alongside the multi-board scraper to catch listings it may miss. Each page
/// is flushed through the batch sink so a crash loses at most one page.
pub struct LinkedInDirectSource {
    client: SourceClient,
    base_url: String,
    locations: Vec<String>,
}

impl LinkedInDirectSource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::with_delay(&settings.scrape, settings.scrape.linkedin_delay_secs),
            base_url: BASE_URL.to_string(),
            locations: settings.scrape.linkedin_locations.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for LinkedInDirectSource {
    fn name(&self) -> &'static str {
        "LinkedIn (Direct)"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        let keywords = normalize_keywords(&query.keywords, &[]);
        let locations: Vec<String> = if query.location.trim().is_empty() {
            self.locations.clone()
        } else {
            vec![query.location.clone()]
        };

        let page_size = 25usize;
        let min_cards_to_continue = 20usize;
        let max_pages_per_combo =
            (query.max_results.div_ceil(page_size) / locations.len().max(1)).clamp(5, 50);

        let mut jobs: Vec<Job> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for keyword in &keywords {
            let jobs_before_keyword = jobs.len();

            for search_location in &locations {
                if jobs.len() - jobs_before_keyword >= query.max_results {
                    break;
                }

                let mut start = 0usize;
                for page in 0..max_pages_per_combo {
                    if jobs.len() - jobs_before_keyword >= query.max_results {
                        break;
                    }

                    let mut params: Vec<(&str, String)> = vec![
                        ("keywords", keyword.clone()),
                        ("location", search_location.clone()),
                        ("start", start.to_string()),
                    ];
                    if query.remote == "Remote" {
                        params.push(("f_WT", "2".to_string()));
                    }
                    if let Some(bucket) = time_bucket(query.posted_in_last_days) {
                        params.push(("f_TPR", bucket.to_string()));
                    }

                    self.client.throttle().await;
                    let url = format!("{}{}", self.base_url, SEARCH_API_PATH);
                    let response = self
                        .client
                        .inner()
                        .get(&url)
                        .query(&params)
                        .header("User-Agent", SCRAPE_USER_AGENT)
                        .header("Accept-Language", "en-US,en;q=0.9")
                        .send()
                        .await
                        .and_then(|r| r.error_for_status())
                        .map_err(|e| AppError::External(format!("LinkedIn request failed: {}", e)));

                    let html = match response {
                        Ok(resp) => match resp.text().await {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("[{}] Failed to read body: {}", self.name(), e);
                                break;
                            }
                        },
                        Err(e) => {
                            warn!("[{}] Request failed (start={}): {}", self.name(), start, e);
                            break;
                        }
                    };

                    let cards = parse_guest_cards(&html, self.name(), keyword, &query.remote);
                    if cards.card_count == 0 {
                        if page == 0 {
                            warn!(
                                "[{}] No job cards found for '{}' @ {}; API may have changed.",
                                self.name(),
                                keyword,
                                search_location
                            );
                        }
                        break;
                    }

                    let budget = query.max_results - (jobs.len() - jobs_before_keyword);
                    let page_batch: Vec<Job> = cards
                        .jobs
                        .into_iter()
                        .filter(|job| seen_urls.insert(job.url.clone()))
                        .take(budget)
                        .collect();

                    let added = page_batch.len();
                    info!(
                        "[{}] '{}' @ {} | Page {} (start={}): {} cards, {} new (total {})",
                        self.name(),
                        keyword,
                        search_location,
                        page + 1,
                        start,
                        cards.card_count,
                        added,
                        jobs.len() + added
                    );

                    if !page_batch.is_empty() {
                        sink.flush(&page_batch).await;
                        jobs.extend(page_batch);
                    }

                    if added == 0 && cards.card_count > 0 {
                        break;
                    }
                    if cards.card_count < min_cards_to_continue {
                        break;
                    }
                    start += page_size;
                }
            }
        }

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::base::NoopSink;

    fn settings() -> AppSettings {
        let mut s = AppSettings::from_env().unwrap();
        s.scrape.rate_limit_delay_secs = 0.0;
        s.scrape.linkedin_delay_secs = 0.0;
        s.scrape.linkedin_locations = vec!["United States".to_string()];
        s
    }

    #[test]
    fn posted_in_last_days_maps_to_time_buckets() {
        assert_eq!(time_bucket(Some(1)), Some("r86400"));
        assert_eq!(time_bucket(Some(7)), Some("r604800"));
        assert_eq!(time_bucket(Some(30)), Some("r2592000"));
        assert_eq!(time_bucket(None), None);
    }

    #[test]
    fn doubled_titles_collapse() {
        assert_eq!(dedupe_title("Data AnalystData Analyst"), "Data Analyst");
        assert_eq!(dedupe_title("Data Analyst"), "Data Analyst");
    }

    #[test]
    fn salary_badges_and_dates_parse_from_cards() {
        let html = r#"
            <div class="base-card">
              <h3 class="base-search-card__title">Platform Engineer</h3>
              <h4 class="base-search-card__subtitle">Acme</h4>
              <span class="job-search-card__location">Remote, United States</span>
              <span class="job-search-card__salary-info">$70K/yr - $90K/yr</span>
              <a class="base-card__full-link" href="/jobs/view/555">link</a>
              <time>2 days ago</time>
            </div>"#;
        let cards = parse_guest_cards(html, "LinkedIn (Direct)", "platform", "Any");
        assert_eq!(cards.card_count, 1);
        let job = &cards.jobs[0];
        assert_eq!(job.salary_min, Some(70000.0));
        assert_eq!(job.salary_max, Some(90000.0));
        assert_eq!(job.remote, "Remote");
        assert!(!job.date_posted.is_empty());
    }

    #[tokio::test]
    async fn guest_cards_parse_and_flush_per_page() {
        let mut server = mockito::Server::new_async().await;
        let html = r#"
          <ul>
            <div class="base-card">
              <h3 class="base-search-card__title">Rust Engineer</h3>
              <h4 class="base-search-card__subtitle">Acme</h4>
              <span class="job-search-card__location">Remote, United States</span>
              <a class="base-card__full-link" href="/jobs/view/12345">link</a>
              <time datetime="2025-04-01">3 days ago</time>
            </div>
            <div class="base-card">
              <h3 class="base-search-card__title">Office Clerk</h3>
              <h4 class="base-search-card__subtitle">PaperCo</h4>
              <span class="job-search-card__location">New York, NY</span>
              <a class="base-card__full-link" href="/jobs/view/67890">link</a>
            </div>
          </ul>"#;
        server
            .mock("GET", SEARCH_API_PATH)
            .match_query(mockito::Matcher::Any)
            .with_body(html)
            .create_async()
            .await;

        let source = LinkedInDirectSource::new(&settings()).with_base_url(server.url());
        let query = SearchQuery {
            keywords: vec!["rust".to_string()],
            remote: "Remote".to_string(),
            ..Default::default()
        };
        let jobs = source.fetch_jobs(&query, &NoopSink).await.unwrap();
        // Remote filter keeps only the remote card.
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Rust Engineer");
        assert_eq!(jobs[0].date_posted, "2025-04-01");
        assert!(jobs[0].url.contains("/jobs/view/12345"));
    }
}
