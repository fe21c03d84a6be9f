use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::settings::ScrapeConfig;
use crate::error::{AppError, AppResult};
use crate::models::Job;
use crate::utils::http_client::new_source_client;

/// Search criteria handed to every source adapter.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    pub location: String,
    /// "Any" | "Remote" | "On-site" | "Hybrid". "Any" disables filtering.
    pub remote: String,
    pub job_type: String,
    pub salary_min: Option<f64>,
    pub experience_level: String,
    pub max_results: usize,
    pub posted_in_last_days: Option<u32>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            location: String::new(),
            remote: "Any".to_string(),
            job_type: String::new(),
            salary_min: None,
            experience_level: String::new(),
            max_results: 100,
            posted_in_last_days: None,
        }
    }
}

impl SearchQuery {
    /// Remote-only boards short-circuit to empty when the user wants on-site.
    pub fn wants_on_site_only(&self) -> bool {
        self.remote == "On-site"
    }
}

/// Receives incremental batches mid-fetch so the orchestrator can flush each
/// page/board to storage; a crash then loses at most one unit of work.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn flush(&self, batch: &[Job]);
}

/// Sink for direct calls and tests.
pub struct NoopSink;

#[async_trait]
impl BatchSink for NoopSink {
    async fn flush(&self, _batch: &[Job]) {}
}

/// Interface every job source adapter implements.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this source can be used (e.g. API keys present).
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch jobs matching the query. Adapters SHOULD flush each page/board/
    /// keyword batch through `sink` and MUST still return the aggregate list.
    async fn fetch_jobs(&self, query: &SearchQuery, sink: &dyn BatchSink) -> AppResult<Vec<Job>>;
}

/// Non-empty stripped keywords; `default` (or "job") when nothing remains.
/// Every source searches one term at a time instead of a concatenated string.
pub fn normalize_keywords(keywords: &[String], default: &[&str]) -> Vec<String> {
    let result: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if !result.is_empty() {
        result
    } else if !default.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        vec!["job".to_string()]
    }
}

/// Case-insensitive match: the full keyword phrase, or any contiguous prefix
/// of at least two words ("machine learning" matches a search for
/// "machine learning engineer"). An empty keyword list matches everything.
pub fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let text_lower = text.to_lowercase();

    for kw in keywords {
        let kw_clean = kw.trim();
        if kw_clean.is_empty() {
            continue;
        }
        let kw_lower = kw_clean.to_lowercase();
        if text_lower.contains(&kw_lower) {
            return true;
        }
        let words: Vec<&str> = kw_lower.split_whitespace().collect();
        for n in 2..=words.len() {
            let phrase = words[..n].join(" ");
            if text_lower.contains(&phrase) {
                return true;
            }
        }
    }
    false
}

/// Salary floor semantics: only exclude when the job's *known* maximum is
/// below the user's minimum. Jobs with unknown salary pass.
pub fn passes_salary_floor(salary_max: Option<f64>, floor: Option<f64>) -> bool {
    match (floor, salary_max) {
        (Some(min), Some(max)) => max >= min,
        _ => true,
    }
}

/// True when the remote filter excludes a job with the given remote status.
pub fn remote_excluded(filter: &str, is_remote: bool) -> bool {
    (filter == "Remote" && !is_remote) || (filter == "On-site" && is_remote)
}

/// String field from a JSON object, "" when missing or not a string.
pub fn json_str(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Positive number from a JSON object; accepts numbers and numeric strings.
pub fn json_f64(item: &Value, key: &str) -> Option<f64> {
    let value = item.get(key)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.is_empty() => s.parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed > 0.0).then_some(parsed)
}

/// Shared HTTP session for one adapter: enforces the per-source delay between
/// successive requests and carries the configured timeout.
pub struct SourceClient {
    client: Client,
    delay: Duration,
}

impl SourceClient {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            client: new_source_client(config.request_timeout_secs),
            delay: Duration::from_secs_f64(config.rate_limit_delay_secs),
        }
    }

    /// For sources that need a longer back-off than the global default.
    pub fn with_delay(config: &ScrapeConfig, delay_secs: f64) -> Self {
        Self {
            client: new_source_client(config.request_timeout_secs),
            delay: Duration::from_secs_f64(delay_secs),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep the inter-request delay. Call before each outbound request.
    pub async fn throttle(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Raw client for requests that need custom headers or auth.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Throttled GET returning parsed JSON; non-2xx is an error.
    pub async fn get_json(&self, url: &str, params: &[(&str, String)]) -> AppResult<Value> {
        let response = self.get(url, params).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::External(format!("Invalid JSON from {}: {}", url, e)))
    }

    /// Throttled GET returning the response body as text.
    pub async fn get_text(&self, url: &str, params: &[(&str, String)]) -> AppResult<String> {
        let response = self.get(url, params).await?;
        response
            .text()
            .await
            .map_err(|e| AppError::External(format!("Failed to read body from {}: {}", url, e)))
    }

    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> AppResult<reqwest::Response> {
        self.throttle().await;
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Request failed: {} - {}", url, e)))?;
        response
            .error_for_status()
            .map_err(|e| AppError::External(format!("Request failed: {} - {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kws(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_keywords_normalise_to_job() {
        assert_eq!(normalize_keywords(&[], &[]), vec!["job"]);
        assert_eq!(normalize_keywords(&kws(&["  ", ""]), &[]), vec!["job"]);
    }

    #[test]
    fn keywords_are_trimmed_and_kept() {
        assert_eq!(
            normalize_keywords(&kws(&[" rust ", "python"]), &[]),
            vec!["rust", "python"]
        );
    }

    #[test]
    fn adapter_default_wins_over_job() {
        assert_eq!(normalize_keywords(&[], &["developer"]), vec!["developer"]);
    }

    #[test]
    fn full_phrase_matches() {
        assert!(matches_keywords("Senior Rust Engineer", &kws(&["rust"])));
        assert!(!matches_keywords("Senior Go Engineer", &kws(&["rust"])));
    }

    #[test]
    fn multi_word_prefix_matches() {
        // "machine learning" appears in the text; search was broader.
        assert!(matches_keywords(
            "machine learning engineer wanted",
            &kws(&["machine learning engineer iii"])
        ));
        // Single-word prefixes do not count.
        assert!(!matches_keywords("machine shop", &kws(&["machine learning"])));
    }

    #[test]
    fn case_is_ignored() {
        assert!(matches_keywords("DATA ANALYST", &kws(&["data analyst"])));
    }

    #[test]
    fn empty_keyword_list_matches_all() {
        assert!(matches_keywords("anything", &[]));
    }

    #[test]
    fn unknown_salary_passes_the_floor() {
        assert!(passes_salary_floor(None, Some(50000.0)));
        assert!(passes_salary_floor(Some(60000.0), Some(50000.0)));
        assert!(!passes_salary_floor(Some(40000.0), Some(50000.0)));
        assert!(passes_salary_floor(Some(40000.0), None));
    }

    #[test]
    fn remote_filter_excludes_both_ways() {
        assert!(remote_excluded("Remote", false));
        assert!(remote_excluded("On-site", true));
        assert!(!remote_excluded("Any", true));
        assert!(!remote_excluded("Any", false));
        assert!(!remote_excluded("Remote", true));
    }

    #[test]
    fn json_helpers_handle_missing_and_stringly_values() {
        let item = json!({"a": "text", "b": 42.5, "c": "99", "d": 0, "e": null});
        assert_eq!(json_str(&item, "a"), "text");
        assert_eq!(json_str(&item, "missing"), "");
        assert_eq!(json_f64(&item, "b"), Some(42.5));
        assert_eq!(json_f64(&item, "c"), Some(99.0));
        assert_eq!(json_f64(&item, "d"), None);
        assert_eq!(json_f64(&item, "e"), None);
    }
}
