use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::{RwLock, Semaphore, mpsc};
use uuid::Uuid;

use crate::config::AppSettings;
use crate::db::JobRepository;
use crate::models::{Job, SearchParams, SearchTask, TaskStatus};
use crate::sources::{self, BatchSink, JobSource, SearchQuery};

/// Number of source adapters fetched concurrently per search.
const MAX_CONCURRENT_SOURCES: usize = 4;

/// Sink handed to each adapter: counts what was found, flushes the batch to
/// storage, and remembers that this source used incremental mode so the
/// completion path skips the bulk save.
struct StorageSink {
    task: Arc<SearchTask>,
    storage: Arc<JobRepository>,
    used: AtomicBool,
}

#[async_trait]
impl BatchSink for StorageSink {
    async fn flush(&self, batch: &[Job]) {
        if batch.is_empty() {
            return;
        }
        self.used.store(true, Ordering::SeqCst);
        self.task.add_jobs_found(batch.len());
        match self.storage.save_jobs(batch).await {
            Ok(saved) => self.task.add_new_jobs_saved(saved as usize),
            Err(e) => self.task.add_error(format!("Storage error (batch): {}", e)),
        }
    }
}

/// Dedupe requested source names preserving order, dropping LinkedIn when
/// JobSpy is also requested (JobSpy already covers it).
fn select_source_names(requested: &[String]) -> Vec<String> {
    let has_jobspy = requested.iter().any(|n| n == "JobSpy");
    let mut seen: HashSet<&str> = HashSet::new();
    let mut names: Vec<String> = Vec::new();
    for name in requested {
        if name.is_empty() || seen.contains(name.as_str()) {
            continue;
        }
        if name == "LinkedIn" && has_jobspy {
            continue;
        }
        seen.insert(name.as_str());
        names.push(name.clone());
    }
    names
}

/// Central coordinator for job searches: owns the in-memory task registry and
/// fans each search across the source adapters in a bounded worker pool.
pub struct SearchManager {
    storage: Arc<JobRepository>,
    settings: AppSettings,
    tasks: Arc<RwLock<HashMap<String, Arc<SearchTask>>>>,
}

impl SearchManager {
    pub fn new(storage: Arc<JobRepository>, settings: AppSettings) -> Self {
        Self {
            storage,
            settings,
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Kick off a background search. Returns a task_id for polling.
    pub async fn start_search(&self, mut params: SearchParams) -> String {
        let task_id = Uuid::new_v4().simple().to_string()[..12].to_string();
        let task = Arc::new(SearchTask::new(task_id.clone()));
        self.tasks.write().await.insert(task_id.clone(), task.clone());

        // Empty keywords = "search all" with a broad fallback term.
        params.keywords = sources::base::normalize_keywords(&params.keywords, &[]);
        if params.max_results_per_source == 0 {
            params.max_results_per_source = self.settings.scrape.max_results_per_source;
        }

        let storage = self.storage.clone();
        let settings = self.settings.clone();
        tokio::spawn(async move {
            run_search(task, storage, settings, params).await;
        });

        task_id
    }

    /// Live snapshot of a task, or None if unknown.
    pub async fn get_task(&self, task_id: &str) -> Option<Value> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).map(|task| task.snapshot())
    }

    /// Request cancellation of a running search. Returns false when the task
    /// is missing or not running; a finished task is never mutated.
    pub async fn cancel_search(&self, task_id: &str) -> bool {
        let tasks = self.tasks.read().await;
        match tasks.get(task_id) {
            Some(task) if task.status() == TaskStatus::Running => {
                task.cancel.cancel();
                true
            }
            _ => false,
        }
    }
}

async fn run_search(
    task: Arc<SearchTask>,
    storage: Arc<JobRepository>,
    settings: AppSettings,
    params: SearchParams,
) {
    task.mark_running();

    let registry = sources::registry(&settings);
    let all_names: Vec<String> = registry.iter().map(|s| s.name().to_string()).collect();
    let requested = match &params.sources {
        Some(names) if !names.is_empty() => names.clone(),
        _ => all_names,
    };
    let source_names = select_source_names(&requested);

    let mut active: Vec<Arc<dyn JobSource>> = Vec::new();
    for name in &source_names {
        let Some(source) = registry.iter().find(|s| s.name() == name) else {
            continue;
        };
        if source.is_available() {
            active.push(source.clone());
        } else {
            info!("Source '{}' skipped (not available / no API key)", name);
        }
    }

    task.set_total_sources(active.len());

    if active.is_empty() {
        task.add_error("No sources available. Check API key configuration.".to_string());
        task.finish(TaskStatus::Failed);
        return;
    }

    for source in &active {
        task.init_source(source.name());
    }

    let query = SearchQuery {
        keywords: params.keywords.clone(),
        location: params.location.clone(),
        remote: if params.remote.is_empty() {
            "Any".to_string()
        } else {
            params.remote.clone()
        },
        job_type: params.job_type.clone(),
        salary_min: params.salary_min,
        experience_level: params.experience_level.clone(),
        max_results: params.max_results_per_source,
        posted_in_last_days: params.posted_in_last_days,
    };

    // One detached task per adapter, gated by a semaphore so at most
    // MAX_CONCURRENT_SOURCES fetches run at once. Detaching matters for
    // cancellation: returning early from the harvest loop below must not
    // abort an in-flight fetch, so completion accounting (including the
    // bulk-save fallback) lives inside each worker and still runs for
    // sources that finish after the search stopped reporting progress.
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SOURCES));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();

    for source in active {
        let task = task.clone();
        let storage = storage.clone();
        let semaphore = semaphore.clone();
        let done_tx = done_tx.clone();
        let query = query.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let outcome = run_source(task.clone(), storage.clone(), source, query).await;

            task.increment_completed_sources();
            if let Some(err) = outcome.error {
                task.add_error(format!("{}: {}", outcome.name, err));
            } else if !outcome.used_batch {
                task.add_jobs_found(outcome.results.len());
                match storage.save_jobs(&outcome.results).await {
                    Ok(saved) => task.add_new_jobs_saved(saved as usize),
                    Err(e) => {
                        task.add_error(format!("Storage error ({}): {}", outcome.name, e))
                    }
                }
            }

            // The harvester may be gone after a cancel; that is fine.
            let _ = done_tx.send(());
        });
    }
    drop(done_tx);

    // Harvest completions. Cancellation is cooperative: the flag is checked
    // between completions, so latency is bounded by the slowest in-flight
    // adapter call. Workers themselves never observe the flag; they complete
    // their current fetch and their batches are still saved.
    while done_rx.recv().await.is_some() {
        if task.is_cancelled() {
            task.finish(TaskStatus::Cancelled);
            info!("Search cancelled by user");
            return;
        }
    }

    if task.is_cancelled() {
        task.finish(TaskStatus::Cancelled);
        return;
    }

    // Adapter failures are reported in the errors list, not the terminal
    // status.
    task.finish(TaskStatus::Completed);

    info!(
        "Search complete: {} jobs found, {} new saved to database",
        task.jobs_found(),
        task.new_jobs_saved()
    );
    let errors = task.errors();
    if !errors.is_empty() {
        warn!("Errors ({}):", errors.len());
        for err in &errors {
            warn!("  - {}", err);
        }
    }
}

struct SourceOutcome {
    name: String,
    results: Vec<Job>,
    error: Option<String>,
    used_batch: bool,
}

async fn run_source(
    task: Arc<SearchTask>,
    storage: Arc<JobRepository>,
    source: Arc<dyn JobSource>,
    query: SearchQuery,
) -> SourceOutcome {
    let name = source.name().to_string();
    task.source_running(&name);
    info!("-- [{}] STARTED --", name);

    let sink = StorageSink {
        task: task.clone(),
        storage,
        used: AtomicBool::new(false),
    };

    match source.fetch_jobs(&query, &sink).await {
        Ok(results) => {
            task.source_completed(&name, results.len());
            info!("-- [{}] FINISHED -- {} jobs", name, results.len());
            SourceOutcome {
                name,
                results,
                error: None,
                used_batch: sink.used.load(Ordering::SeqCst),
            }
        }
        Err(e) => {
            let message = e.to_string();
            task.source_failed(&name, message.clone());
            error!("-- [{}] FAILED -- {}", name, message);
            SourceOutcome {
                name,
                results: Vec::new(),
                error: Some(message),
                used_batch: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::mysql::MySqlPoolOptions;

    fn lazy_storage() -> Arc<JobRepository> {
        // connect_lazy never touches the network; fine for paths that do not
        // reach the database.
        let pool = MySqlPoolOptions::new()
            .connect_lazy("mysql://root@localhost:3306/job_search_test")
            .unwrap();
        Arc::new(JobRepository::new(pool))
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn source_names_dedupe_preserving_order() {
        let names = select_source_names(&strings(&["Reed", "Adzuna", "Reed", "Jooble"]));
        assert_eq!(names, strings(&["Reed", "Adzuna", "Jooble"]));
    }

    #[test]
    fn linkedin_is_dropped_when_jobspy_requested() {
        let names = select_source_names(&strings(&["JobSpy", "LinkedIn", "RemoteOK"]));
        assert_eq!(names, strings(&["JobSpy", "RemoteOK"]));

        // Without JobSpy the LinkedIn source runs on its own.
        let names = select_source_names(&strings(&["LinkedIn", "RemoteOK"]));
        assert_eq!(names, strings(&["LinkedIn", "RemoteOK"]));
    }

    #[tokio::test]
    async fn search_with_no_available_sources_fails() {
        let settings = AppSettings::from_env().unwrap();
        let manager = SearchManager::new(lazy_storage(), settings);

        // Adzuna requires keys that are not configured in the test env.
        let task_id = manager
            .start_search(SearchParams {
                keywords: vec!["data".to_string()],
                sources: Some(vec!["Adzuna".to_string()]),
                max_results_per_source: 10,
                ..Default::default()
            })
            .await;

        let mut status = String::new();
        for _ in 0..50 {
            if let Some(snapshot) = manager.get_task(&task_id).await {
                status = snapshot["status"].as_str().unwrap_or("").to_string();
                if status == "failed" {
                    assert_eq!(
                        snapshot["errors"][0],
                        "No sources available. Check API key configuration."
                    );
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(status, "failed");
    }

    #[tokio::test]
    async fn cancel_returns_false_for_unknown_or_finished_tasks() {
        let settings = AppSettings::from_env().unwrap();
        let manager = SearchManager::new(lazy_storage(), settings);
        assert!(!manager.cancel_search("nope").await);

        // Drive a task to a terminal state, then try to cancel it.
        let task_id = manager
            .start_search(SearchParams {
                sources: Some(vec!["Adzuna".to_string()]),
                max_results_per_source: 10,
                ..Default::default()
            })
            .await;
        for _ in 0..50 {
            if let Some(snapshot) = manager.get_task(&task_id).await {
                if snapshot["status"] == "failed" {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!manager.cancel_search(&task_id).await);
        // The terminal state did not change.
        let snapshot = manager.get_task(&task_id).await.unwrap();
        assert_eq!(snapshot["status"], "failed");
    }

    #[tokio::test]
    async fn unknown_task_snapshot_is_none() {
        let settings = AppSettings::from_env().unwrap();
        let manager = SearchManager::new(lazy_storage(), settings);
        assert!(manager.get_task("missing").await.is_none());
    }
}
