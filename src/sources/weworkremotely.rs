use async_trait::async_trait;
use log::{error, info};

use crate::config::AppSettings;
use crate::error::AppResult;
use crate::models::Job;
use crate::utils::html::sanitize_html;

use super::base::{BatchSink, JobSource, SearchQuery, SourceClient, matches_keywords};
use super::feed::parse_feed;

const FEEDS: [(&str, &str); 7] = [
    ("programming", "/categories/remote-programming-jobs.rss"),
    ("design", "/categories/remote-design-jobs.rss"),
    ("devops", "/categories/remote-devops-sysadmin-jobs.rss"),
    ("management", "/categories/remote-management-and-finance-jobs.rss"),
    ("customer_support", "/categories/remote-customer-support-jobs.rss"),
    ("sales_marketing", "/categories/remote-sales-and-marketing-jobs.rss"),
    ("all_others", "/categories/remote-jobs.rss"),
];

/// Pick relevant category feeds from keyword content; everything when the
/// search is broad.
fn select_feeds(keywords: &[String]) -> Vec<(&'static str, &'static str)> {
    if keywords.is_empty() {
        return FEEDS.to_vec();
    }
    let combined = keywords.join(" ").to_lowercase();

    let triggers: [(&str, &[&str]); 6] = [
        (
            "programming",
            &[
                "developer", "engineer", "software", "python", "java", "react", "backend",
                "frontend", "full stack", "web dev", "mobile",
            ],
        ),
        ("design", &["design", "ux", "ui", "graphic", "creative"]),
        (
            "devops",
            &["devops", "sysadmin", "infrastructure", "cloud", "aws", "azure", "kubernetes"],
        ),
        (
            "management",
            &["manager", "management", "finance", "accounting", "project"],
        ),
        ("customer_support", &["customer", "support", "service"]),
        (
            "sales_marketing",
            &["sales", "marketing", "growth", "seo", "content"],
        ),
    ];

    let mut selected: Vec<(&'static str, &'static str)> = Vec::new();
    for (feed_key, words) in triggers {
        if words.iter().any(|w| combined.contains(w)) {
            if let Some(feed) = FEEDS.iter().find(|(k, _)| *k == feed_key) {
                selected.push(*feed);
            }
        }
    }

    if selected.is_empty() {
        selected.push(FEEDS[0]);
        selected.push(FEEDS[6]);
    }
    selected
}

/// We Work Remotely - remote-only board, consumed via category RSS feeds.
pub struct WeWorkRemotelySource {
    client: SourceClient,
    base_url: String,
}

impl WeWorkRemotelySource {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: SourceClient::new(&settings.scrape),
            base_url: "https://weworkremotely.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl JobSource for WeWorkRemotelySource {
    fn name(&self) -> &'static str {
        "WeWorkRemotely"
    }

    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>> {
        if query.wants_on_site_only() {
            return Ok(Vec::new());
        }

        let mut jobs: Vec<Job> = Vec::new();
        for (feed_name, feed_path) in select_feeds(&query.keywords) {
            if jobs.len() >= query.max_results {
                break;
            }

            let url = format!("{}{}", self.base_url, feed_path);
            let xml = match self.client.get_text(&url, &[]).await {
                Ok(xml) => xml,
                Err(e) => {
                    error!("[{}] Failed to fetch {}: {}", self.name(), feed_name, e);
                    continue;
                }
            };

            let mut batch: Vec<Job> = Vec::new();
            for entry in parse_feed(&xml) {
                if jobs.len() + batch.len() >= query.max_results {
                    break;
                }

                // WWR titles carry the company: "Company Name: Job Title".
                let (company, clean_title) = match entry.title.split_once(':') {
                    Some((company, title)) => {
                        (company.trim().to_string(), title.trim().to_string())
                    }
                    None => (String::new(), entry.title.clone()),
                };

                let searchable =
                    format!("{} {} {}", entry.title, entry.description, feed_name);
                if !matches_keywords(&searchable, &query.keywords) {
                    continue;
                }

                let tags = if entry.categories.is_empty() {
                    feed_name.to_string()
                } else {
                    entry.categories.join(", ")
                };

                batch.push(
                    Job {
                        title: clean_title,
                        company,
                        location: "Remote".to_string(),
                        description: sanitize_html(&entry.description),
                        url: entry.link,
                        source: self.name().to_string(),
                        remote: "Remote".to_string(),
                        job_type: if query.job_type.is_empty() {
                            "Full-time".to_string()
                        } else {
                            query.job_type.clone()
                        },
                        date_posted: entry.published,
                        tags,
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

    fn kws(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keyword_content_selects_feeds() {
        let feeds = select_feeds(&kws(&["python developer"]));
        assert!(feeds.iter().any(|(k, _)| *k == "programming"));

        let feeds = select_feeds(&kws(&["ux designer"]));
        assert!(feeds.iter().any(|(k, _)| *k == "design"));
    }

    #[test]
    fn unmatched_keywords_fall_back_to_defaults() {
        let feeds = select_feeds(&kws(&["astronaut"]));
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].0, "programming");
        assert_eq!(feeds[1].0, "all_others");
    }

    #[test]
    fn empty_keywords_select_everything() {
        assert_eq!(select_feeds(&[]).len(), FEEDS.len());
    }
}
