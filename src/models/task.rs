use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Parameters accepted by `POST /api/search`, handed to the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub keywords: Vec<String>,
    pub location: String,
    pub remote: String,
    pub job_type: String,
    pub salary_min: Option<f64>,
    pub experience_level: String,
    pub sources: Option<Vec<String>>,
    pub max_results_per_source: usize,
    pub posted_in_last_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
    Pending,
    Running,
    Completed,
    Error,
}

impl SourcePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePhase::Pending => "pending",
            SourcePhase::Running => "running",
            SourcePhase::Completed => "completed",
            SourcePhase::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub phase: SourcePhase,
    pub started_at: Option<f64>,
    pub finished_at: Option<f64>,
    pub jobs: Option<usize>,
    pub error: Option<String>,
}

impl Default for SourceStatus {
    fn default() -> Self {
        Self {
            phase: SourcePhase::Pending,
            started_at: None,
            finished_at: None,
            jobs: None,
            error: None,
        }
    }
}

fn epoch_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// In-memory handle for a running (or finished) search. Counters are atomics
/// so worker tasks can bump them while the poll endpoint reads; everything
/// structured sits behind a std Mutex and is cloned out on snapshot.
pub struct SearchTask {
    pub task_id: String,
    pub cancel: CancellationToken,
    status: Mutex<TaskStatus>,
    total_sources: AtomicUsize,
    completed_sources: AtomicUsize,
    jobs_found: AtomicUsize,
    new_jobs_saved: AtomicUsize,
    started_at: Mutex<Option<f64>>,
    finished_at: Mutex<Option<f64>>,
    current_source: Mutex<String>,
    errors: Mutex<Vec<String>>,
    source_status: Mutex<HashMap<String, SourceStatus>>,
}

impl SearchTask {
    pub fn new(task_id: String) -> Self {
        Self {
            task_id,
            cancel: CancellationToken::new(),
            status: Mutex::new(TaskStatus::Pending),
            total_sources: AtomicUsize::new(0),
            completed_sources: AtomicUsize::new(0),
            jobs_found: AtomicUsize::new(0),
            new_jobs_saved: AtomicUsize::new(0),
            started_at: Mutex::new(None),
            finished_at: Mutex::new(None),
            current_source: Mutex::new(String::new()),
            errors: Mutex::new(Vec::new()),
            source_status: Mutex::new(HashMap::new()),
        }
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn mark_running(&self) {
        *self.status.lock().unwrap() = TaskStatus::Running;
        *self.started_at.lock().unwrap() = Some(epoch_now());
    }

    pub fn finish(&self, status: TaskStatus) {
        *self.status.lock().unwrap() = status;
        *self.finished_at.lock().unwrap() = Some(epoch_now());
    }

    pub fn set_total_sources(&self, total: usize) {
        self.total_sources.store(total, Ordering::SeqCst);
    }

    pub fn jobs_found(&self) -> usize {
        self.jobs_found.load(Ordering::SeqCst)
    }

    pub fn new_jobs_saved(&self) -> usize {
        self.new_jobs_saved.load(Ordering::SeqCst)
    }

    pub fn add_jobs_found(&self, n: usize) {
        self.jobs_found.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_new_jobs_saved(&self, n: usize) {
        self.new_jobs_saved.fetch_add(n, Ordering::SeqCst);
    }

    pub fn increment_completed_sources(&self) {
        self.completed_sources.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_error(&self, message: String) {
        self.errors.lock().unwrap().push(message);
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn init_source(&self, name: &str) {
        self.source_status
            .lock()
            .unwrap()
            .insert(name.to_string(), SourceStatus::default());
    }

    pub fn source_running(&self, name: &str) {
        *self.current_source.lock().unwrap() = name.to_string();
        self.source_status.lock().unwrap().insert(
            name.to_string(),
            SourceStatus {
                phase: SourcePhase::Running,
                started_at: Some(epoch_now()),
                ..Default::default()
            },
        );
    }

    pub fn source_completed(&self, name: &str, jobs: usize) {
        let mut map = self.source_status.lock().unwrap();
        let entry = map.entry(name.to_string()).or_default();
        entry.phase = SourcePhase::Completed;
        entry.finished_at = Some(epoch_now());
        entry.jobs = Some(jobs);
    }

    pub fn source_failed(&self, name: &str, error: String) {
        let mut map = self.source_status.lock().unwrap();
        let entry = map.entry(name.to_string()).or_default();
        entry.phase = SourcePhase::Error;
        entry.finished_at = Some(epoch_now());
        entry.error = Some(error);
    }

    fn elapsed_seconds(&self) -> f64 {
        let started = self.started_at.lock().unwrap().unwrap_or(0.0);
        if started == 0.0 {
            return 0.0;
        }
        let end = self.finished_at.lock().unwrap().unwrap_or_else(epoch_now);
        ((end - started) * 10.0).round() / 10.0
    }

    /// Serialise the live state for the poll endpoint. Readers get a point-in-
    /// time copy; concurrent mutation continues underneath.
    pub fn snapshot(&self) -> Value {
        let now = epoch_now();
        let sources = self.source_status.lock().unwrap();
        let mut source_info = serde_json::Map::new();
        let mut source_results = serde_json::Map::new();
        for (name, info) in sources.iter() {
            let mut entry = serde_json::Map::new();
            entry.insert("status".into(), json!(info.phase.as_str()));
            if let Some(started) = info.started_at {
                let end = info.finished_at.unwrap_or(now);
                entry.insert(
                    "elapsed_seconds".into(),
                    json!(((end - started) * 10.0).round() / 10.0),
                );
            }
            if let Some(jobs) = info.jobs {
                entry.insert("jobs".into(), json!(jobs));
                source_results.insert(name.clone(), json!(jobs));
            }
            if let Some(error) = &info.error {
                entry.insert("error".into(), json!(error));
            }
            source_info.insert(name.clone(), Value::Object(entry));
        }
        json!({
            "task_id": self.task_id,
            "status": self.status().as_str(),
            "cancelled": self.is_cancelled(),
            "total_sources": self.total_sources.load(Ordering::SeqCst),
            "completed_sources": self.completed_sources.load(Ordering::SeqCst),
            "current_source": self.current_source.lock().unwrap().clone(),
            "jobs_found": self.jobs_found(),
            "new_jobs_saved": self.new_jobs_saved(),
            "errors": self.errors(),
            "elapsed_seconds": self.elapsed_seconds(),
            "source_results": Value::Object(source_results),
            "source_status": Value::Object(source_info),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters_and_status() {
        let task = SearchTask::new("abc123def456".into());
        task.mark_running();
        task.set_total_sources(2);
        task.init_source("RemoteOK");
        task.source_running("RemoteOK");
        task.add_jobs_found(5);
        task.add_new_jobs_saved(3);
        task.source_completed("RemoteOK", 5);
        task.increment_completed_sources();

        let snap = task.snapshot();
        assert_eq!(snap["status"], "running");
        assert_eq!(snap["jobs_found"], 5);
        assert_eq!(snap["new_jobs_saved"], 3);
        assert_eq!(snap["completed_sources"], 1);
        assert_eq!(snap["source_status"]["RemoteOK"]["status"], "completed");
        assert_eq!(snap["source_status"]["RemoteOK"]["jobs"], 5);
        assert_eq!(snap["source_results"]["RemoteOK"], 5);
    }

    #[test]
    fn failed_source_keeps_error_string() {
        let task = SearchTask::new("abc123def456".into());
        task.mark_running();
        task.init_source("Reed");
        task.source_running("Reed");
        task.source_failed("Reed", "connection refused".into());
        task.add_error("Reed: connection refused".into());
        task.finish(TaskStatus::Completed);

        let snap = task.snapshot();
        assert_eq!(snap["status"], "completed");
        assert_eq!(snap["source_status"]["Reed"]["status"], "error");
        assert_eq!(snap["source_status"]["Reed"]["error"], "connection refused");
        assert_eq!(snap["errors"][0], "Reed: connection refused");
    }

    #[test]
    fn cancellation_flag_shows_in_snapshot() {
        let task = SearchTask::new("abc123def456".into());
        task.mark_running();
        assert!(!task.is_cancelled());
        task.cancel.cancel();
        assert!(task.is_cancelled());
        assert_eq!(task.snapshot()["cancelled"], true);
    }
}
