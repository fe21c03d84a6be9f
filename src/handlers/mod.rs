pub mod ai_handlers;
pub mod health;
pub mod job_handlers;
pub mod meta_handlers;
pub mod note_handlers;
pub mod saved_search_handlers;
pub mod search_handlers;
pub mod triage_handlers;
