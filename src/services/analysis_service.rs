use std::sync::Arc;

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::clients::{ChatMessage, LlmRouter};
use crate::config::settings::PathsConfig;
use crate::db::{AiAnalysisRepository, AiPromptRepository, JobRepository, PromptRow};
use crate::error::{AnalysisRejection, AppError, AppResult};
use crate::utils::html::strip_html;
use crate::utils::llm_log;

use super::analysis_prompt::{
    ANALYSIS_REQUIRED_FIELDS, ANALYSIS_SYSTEM_PROMPT, FieldKind, VALID_RECOMMENDATIONS,
};

static FENCED_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap());

/// Try the whole string, then the first fenced block, then the outermost
/// braces. Each strategy either yields a JSON object or defers to the next.
pub fn extract_json(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(caps) = FENCED_BLOCK_RE.captures(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(caps[1].trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        if let Ok(value) = serde_json::from_str::<Value>(&raw[start..=end]) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    None
}

/// Check every required field and normalise the two special ones in place:
/// match_score is coerced to an integer in [1, 10], recommendation is trimmed,
/// lowercased, and checked against the allowed set. Returns every violation.
pub fn validate_analysis(result: &mut Value) -> Vec<String> {
    let mut violations: Vec<String> = Vec::new();
    let Some(map) = result.as_object_mut() else {
        return vec!["response is not a JSON object".to_string()];
    };

    for (field, kind) in ANALYSIS_REQUIRED_FIELDS {
        let Some(value) = map.get(field) else {
            violations.push(format!("missing field '{}'", field));
            continue;
        };
        match kind {
            FieldKind::List => {
                if !value.is_array() {
                    violations.push(format!("field '{}' should be a list", field));
                }
            }
            FieldKind::Text => {
                if !value.is_string() {
                    violations.push(format!("field '{}' should be a string", field));
                }
            }
            FieldKind::Score => {
                let score = match value {
                    Value::Number(n) => n.as_f64().map(|f| f as i64),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match score {
                    Some(score) if (1..=10).contains(&score) => {
                        map.insert(field.to_string(), json!(score));
                    }
                    Some(_) => {
                        violations.push(format!("field '{}' must be between 1 and 10", field))
                    }
                    None => violations.push(format!("field '{}' must be an integer", field)),
                }
            }
            FieldKind::Recommendation => {
                let normalized = value
                    .as_str()
                    .map(|s| s.trim().to_lowercase())
                    .unwrap_or_default();
                if VALID_RECOMMENDATIONS.contains(&normalized.as_str()) {
                    map.insert(field.to_string(), json!(normalized));
                } else {
                    violations.push(format!(
                        "field '{}' must be one of {:?}",
                        field, VALID_RECOMMENDATIONS
                    ));
                }
            }
        }
    }

    violations
}

fn block(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() { "(not provided)" } else { trimmed }
}

fn format_salary(job: &Value) -> String {
    let min = job.get("salary_min").and_then(Value::as_f64);
    let max = job.get("salary_max").and_then(Value::as_f64);
    let currency = job
        .get("salary_currency")
        .and_then(Value::as_str)
        .unwrap_or("");
    match (min, max) {
        (Some(min), Some(max)) => format!("{:.0} - {:.0} {}", min, max, currency).trim().to_string(),
        (Some(min), None) => format!("from {:.0} {}", min, currency).trim().to_string(),
        (None, Some(max)) => format!("up to {:.0} {}", max, currency).trim().to_string(),
        (None, None) => "(not stated)".to_string(),
    }
}

fn job_field<'a>(job: &'a Value, key: &str) -> &'a str {
    job.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Build the two-turn chat: the fixed system prompt plus the candidate
/// profile and job listing as labelled blocks.
pub fn compose_messages(prompt: &PromptRow, job: &Value) -> Vec<ChatMessage> {
    let user = format!(
        "CANDIDATE CV:\n{}\n\n\
         ABOUT THE CANDIDATE:\n{}\n\n\
         WHAT THE CANDIDATE IS LOOKING FOR:\n{}\n\n\
         ADDITIONAL CONTEXT:\n{}\n\n\
         JOB LISTING:\n\
         Title: {}\n\
         Company: {}\n\
         Location: {}\n\
         Remote: {}\n\
         Job type: {}\n\
         Salary: {}\n\
         Description:\n{}",
        block(&prompt.cv),
        block(&prompt.about_me),
        block(&prompt.preferences),
        block(&prompt.extra_context),
        job_field(job, "title"),
        job_field(job, "company"),
        job_field(job, "location"),
        job_field(job, "remote"),
        job_field(job, "job_type"),
        format_salary(job),
        block(&strip_html(job_field(job, "description"))),
    );

    vec![
        ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}

fn format_for_ledger(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}]\n{}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Runs one analysis: load job + profile, compose, call the routed provider,
/// extract + validate the JSON, persist the result per (job, prompt).
pub struct AnalysisService {
    jobs: Arc<JobRepository>,
    prompts: Arc<AiPromptRepository>,
    analyses: Arc<AiAnalysisRepository>,
    router: Arc<LlmRouter>,
    paths: PathsConfig,
}

impl AnalysisService {
    pub fn new(
        jobs: Arc<JobRepository>,
        prompts: Arc<AiPromptRepository>,
        analyses: Arc<AiAnalysisRepository>,
        router: Arc<LlmRouter>,
        paths: PathsConfig,
    ) -> Self {
        Self {
            jobs,
            prompts,
            analyses,
            router,
            paths,
        }
    }

    pub async fn analyse(&self, job_id: &str, prompt_id: i64) -> AppResult<Value> {
        let job = self
            .jobs
            .get_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
        let prompt = self
            .prompts
            .get(prompt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Prompt not found".to_string()))?;
        if prompt.model.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Prompt has no model configured".to_string(),
            ));
        }

        let messages = compose_messages(&prompt, &job);

        llm_log::append_entry(
            &self.paths.llm_request_log(),
            job_id,
            prompt_id,
            &prompt.title,
            &prompt.model,
            &format_for_ledger(&messages),
        );

        let raw = self.router.chat(&prompt.model, &messages).await?;

        // Logged before any parsing so a 422 still leaves the evidence.
        llm_log::append_entry(
            &self.paths.llm_response_log(),
            job_id,
            prompt_id,
            &prompt.title,
            &prompt.model,
            &raw,
        );

        let mut result = extract_json(&raw).ok_or_else(|| {
            AppError::AnalysisRejected(AnalysisRejection::new(
                "no valid JSON object found",
                &raw,
                Vec::new(),
            ))
        })?;

        let violations = validate_analysis(&mut result);
        if !violations.is_empty() {
            return Err(AppError::AnalysisRejected(AnalysisRejection::new(
                "analysis response failed validation",
                &raw,
                violations,
            )));
        }

        let analysis_id = self
            .analyses
            .save(job_id, prompt_id, &prompt.model, &result)
            .await?;

        info!(
            "Analysis completed for job {} with prompt {} (id {})",
            job_id, prompt_id, analysis_id
        );

        Ok(json!({
            "status": "completed",
            "analysis_id": analysis_id,
            "match_score": result["match_score"],
            "recommendation": result["recommendation"],
            "job_summary": result["job_description"],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn valid_result() -> Value {
        json!({
            "keywords": ["rust"],
            "key_skills": ["rust", "sql"],
            "job_description": "Builds services.",
            "key_responsibilities": ["ship code"],
            "match_score": 8,
            "score_reasoning": "Strong overlap.",
            "skills_we_have": ["rust"],
            "skills_we_are_missing": ["sql"],
            "cover_letter_talking_points": ["rust work"],
            "red_flags": [],
            "interview_prep_topics": ["sql"],
            "application_tips": "Lead with Rust.",
            "company_type": "Startup",
            "company_size_estimate": "Small startup (~20 employees)",
            "company_highlights": ["seed funded"],
            "recommendation": "apply",
            "recommendation_notes": "Good fit."
        })
    }

    #[test]
    fn extraction_strategy_1_whole_string() {
        let raw = valid_result().to_string();
        assert!(extract_json(&raw).is_some());
    }

    #[test]
    fn extraction_strategy_2_fenced_block() {
        let raw = format!(
            "Here is the analysis:\n```json\n{}\n```\nLet me know if you need more.",
            valid_result()
        );
        let parsed = extract_json(&raw).unwrap();
        assert_eq!(parsed["match_score"], 8);
    }

    #[test]
    fn extraction_strategy_3_outer_braces() {
        let raw = format!("Sure thing! {} Hope that helps.", valid_result());
        assert!(extract_json(&raw).is_some());
    }

    #[test]
    fn extraction_fails_without_json() {
        assert!(extract_json("I could not analyse this job, sorry.").is_none());
        assert!(extract_json("").is_none());
    }

    #[test]
    fn validation_accepts_and_normalises_casing_and_whitespace() {
        let mut result = valid_result();
        result["recommendation"] = json!("APPLY ");
        result["match_score"] = json!("8");
        let violations = validate_analysis(&mut result);
        assert!(violations.is_empty(), "{:?}", violations);
        assert_eq!(result["recommendation"], "apply");
        assert_eq!(result["match_score"], 8);
    }

    #[test]
    fn validation_reports_missing_fields() {
        let mut result = valid_result();
        result.as_object_mut().unwrap().remove("job_description");
        let violations = validate_analysis(&mut result);
        assert!(violations.contains(&"missing field 'job_description'".to_string()));
    }

    #[test]
    fn score_bounds_are_enforced() {
        for bad in [0, 11] {
            let mut result = valid_result();
            result["match_score"] = json!(bad);
            let violations = validate_analysis(&mut result);
            assert!(
                violations.iter().any(|v| v.contains("match_score")),
                "score {} accepted",
                bad
            );
        }
    }

    #[test]
    fn unknown_recommendations_are_rejected() {
        let mut result = valid_result();
        result["recommendation"] = json!("definitely");
        let violations = validate_analysis(&mut result);
        assert!(violations.iter().any(|v| v.contains("recommendation")));
    }

    #[test]
    fn wrong_kinds_are_reported() {
        let mut result = valid_result();
        result["keywords"] = json!("not a list");
        result["application_tips"] = json!(["not a string"]);
        let violations = validate_analysis(&mut result);
        assert!(violations.contains(&"field 'keywords' should be a list".to_string()));
        assert!(violations.contains(&"field 'application_tips' should be a string".to_string()));
    }

    #[test]
    fn composed_messages_carry_profile_and_job_blocks() {
        let prompt = PromptRow {
            id: 1,
            title: "Default".to_string(),
            model: "gpt-4o".to_string(),
            cv: "Ten years of Rust.".to_string(),
            about_me: String::new(),
            preferences: "Remote only".to_string(),
            extra_context: String::new(),
            is_active: true,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let job = json!({
            "title": "Rust Engineer",
            "company": "Acme",
            "location": "Remote",
            "remote": "Remote",
            "job_type": "Full-time",
            "salary_min": 90000.0,
            "salary_max": 120000.0,
            "salary_currency": "USD",
            "description": "<p>Build <b>things</b></p>"
        });

        let messages = compose_messages(&prompt, &job);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("recruitment analyst"));

        let user = &messages[1].content;
        assert!(user.contains("Ten years of Rust."));
        // Blank profile fields render as the placeholder.
        assert!(user.contains("ABOUT THE CANDIDATE:\n(not provided)"));
        assert!(user.contains("Title: Rust Engineer"));
        assert!(user.contains("Salary: 90000 - 120000 USD"));
        // HTML stripped from the description block.
        assert!(user.contains("Build things"));
        assert!(!user.contains("<p>"));
    }
}
