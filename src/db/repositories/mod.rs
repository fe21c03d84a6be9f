pub mod ai_analysis_repository;
pub mod ai_prompt_repository;
pub mod job_repository;
pub mod note_repository;
pub mod saved_search_repository;
pub mod triage_repository;

pub use ai_analysis_repository::{AiAnalysisRepository, AnalysisListFilter};
pub use ai_prompt_repository::{AiPromptRepository, PromptRow};
pub use job_repository::{JobRepository, JobSearchFilter};
pub use note_repository::NoteRepository;
pub use saved_search_repository::SavedSearchRepository;
pub use triage_repository::TriageRepository;
