use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use log::warn;

const SEPARATOR: &str =
    "======================================================================";

/// Append one framed entry to an LLM request/response ledger. These files are
/// plain newline-delimited text meant for eyeballing what was actually sent to
/// and received from a model; a write failure is logged and swallowed so it
/// can never fail an analysis run.
pub fn append_entry(
    path: &Path,
    job_id: &str,
    prompt_id: i64,
    prompt_title: &str,
    model: &str,
    body: &str,
) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Could not create log directory {}: {}", parent.display(), e);
            return;
        }
    }

    let header = format!(
        "{}\n{} UTC | job={} | prompt={} ({}) | model={}",
        SEPARATOR,
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        job_id,
        prompt_id,
        prompt_title,
        model,
    );

    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| writeln!(file, "{}\n{}\n", header, body));

    if let Err(e) = result {
        warn!("Could not append to {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_appended_with_header_and_separator() {
        let dir = std::env::temp_dir().join("jobsearch-llm-log-test");
        let path = dir.join("requests.log");
        let _ = std::fs::remove_file(&path);

        append_entry(&path, "job1", 3, "My profile", "gpt-4o", "first body");
        append_entry(&path, "job2", 3, "My profile", "gpt-4o", "second body");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(SEPARATOR).count(), 2);
        assert!(content.contains("job=job1"));
        assert!(content.contains("second body"));
        let _ = std::fs::remove_file(&path);
    }
}
