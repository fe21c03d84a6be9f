use reqwest::Client;
use std::time::Duration;

/// Browser-plausible user agent sent by source adapters that scrape HTML.
pub const SCRAPE_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Client for source adapters: short timeout, identifying user agent.
pub fn new_source_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent("JobSearchTool/1.0 (github.com/jobsearch)")
        .build()
        .expect("Failed to build HTTP client")
}

/// Client for LLM provider calls: generous timeout to allow slow local models.
pub fn new_llm_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
}
