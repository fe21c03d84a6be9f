use std::sync::Arc;

use crate::clients::LlmRouter;
use crate::config::AppSettings;
use crate::db::{
    AiAnalysisRepository, AiPromptRepository, JobRepository, NoteRepository,
    SavedSearchRepository, TriageRepository,
};
use crate::services::{AnalysisService, SearchManager};

/// Shared application state handed to every handler.
pub struct AppState {
    pub settings: AppSettings,
    pub jobs: Arc<JobRepository>,
    pub triage: Arc<TriageRepository>,
    pub notes: Arc<NoteRepository>,
    pub saved_searches: Arc<SavedSearchRepository>,
    pub saved_board_searches: Arc<SavedSearchRepository>,
    pub ai_prompts: Arc<AiPromptRepository>,
    pub ai_analyses: Arc<AiAnalysisRepository>,
    pub search_manager: Arc<SearchManager>,
    pub analysis: Arc<AnalysisService>,
    pub llm: Arc<LlmRouter>,
}
