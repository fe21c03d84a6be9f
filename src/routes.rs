use actix_web::web;

use crate::handlers::{
    ai_handlers, job_handlers, meta_handlers, note_handlers, saved_search_handlers,
    search_handlers, triage_handlers,
};

/// Wire up the /api surface.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Search orchestration
    cfg.route("/search", web::post().to(search_handlers::start_search))
        .route(
            "/search/{task_id}",
            web::get().to(search_handlers::search_status),
        )
        .route(
            "/search/{task_id}/cancel",
            web::post().to(search_handlers::cancel_search),
        );

    // Jobs
    cfg.route("/jobs", web::get().to(job_handlers::list_jobs))
        .route("/jobs/statuses", web::post().to(job_handlers::job_statuses))
        .route("/jobs/{job_id}", web::get().to(job_handlers::get_job))
        .route("/export", web::get().to(job_handlers::export_csv));

    // Triage
    cfg.route(
        "/favourite/{job_id}",
        web::post().to(triage_handlers::add_favourite),
    )
    .route(
        "/favourite/{job_id}",
        web::delete().to(triage_handlers::remove_favourite),
    )
    .route("/favourites", web::get().to(triage_handlers::list_favourites))
    .route(
        "/applied/{job_id}",
        web::post().to(triage_handlers::add_application),
    )
    .route(
        "/applied/{job_id}",
        web::delete().to(triage_handlers::remove_application),
    )
    .route(
        "/applied/{job_id}/notes",
        web::put().to(triage_handlers::update_application_notes),
    )
    .route(
        "/applications",
        web::get().to(triage_handlers::list_applications),
    )
    .route(
        "/not-interested/{job_id}",
        web::post().to(triage_handlers::add_not_interested),
    )
    .route(
        "/not-interested/{job_id}",
        web::delete().to(triage_handlers::remove_not_interested),
    );

    // Notes
    cfg.route("/notes", web::get().to(note_handlers::list_notes))
        .route("/notes", web::post().to(note_handlers::create_note))
        .route("/notes/{id}", web::get().to(note_handlers::get_note))
        .route("/notes/{id}", web::put().to(note_handlers::update_note))
        .route("/notes/{id}", web::delete().to(note_handlers::delete_note));

    // Saved searches
    cfg.route(
        "/saved-searches",
        web::get().to(saved_search_handlers::list_saved_searches),
    )
    .route(
        "/saved-searches",
        web::post().to(saved_search_handlers::create_saved_search),
    )
    .route(
        "/saved-searches/{id}",
        web::get().to(saved_search_handlers::get_saved_search),
    )
    .route(
        "/saved-searches/{id}",
        web::put().to(saved_search_handlers::update_saved_search),
    )
    .route(
        "/saved-searches/{id}",
        web::delete().to(saved_search_handlers::delete_saved_search),
    )
    .route(
        "/saved-board-searches",
        web::get().to(saved_search_handlers::list_saved_board_searches),
    )
    .route(
        "/saved-board-searches",
        web::post().to(saved_search_handlers::create_saved_board_search),
    )
    .route(
        "/saved-board-searches/{id}",
        web::get().to(saved_search_handlers::get_saved_board_search),
    )
    .route(
        "/saved-board-searches/{id}",
        web::put().to(saved_search_handlers::update_saved_board_search),
    )
    .route(
        "/saved-board-searches/{id}",
        web::delete().to(saved_search_handlers::delete_saved_board_search),
    );

    // AI prompts + analyses
    cfg.route("/ai-prompts", web::get().to(ai_handlers::list_prompts))
        .route("/ai-prompts", web::post().to(ai_handlers::create_prompt))
        .route("/ai-prompts/{id}", web::get().to(ai_handlers::get_prompt))
        .route("/ai-prompts/{id}", web::put().to(ai_handlers::update_prompt))
        .route(
            "/ai-prompts/{id}",
            web::delete().to(ai_handlers::delete_prompt),
        )
        .route(
            "/ai-prompts/{id}/activate",
            web::post().to(ai_handlers::activate_prompt),
        )
        .route("/ollama/models", web::get().to(ai_handlers::list_models))
        .route("/ai-analyse", web::post().to(ai_handlers::analyse))
        .route("/ai-analyses", web::get().to(ai_handlers::list_analyses))
        .route(
            "/ai-analyses/{job_id}",
            web::get().to(ai_handlers::analyses_for_job),
        );

    // Metadata
    cfg.route("/regions", web::get().to(meta_handlers::list_regions))
        .route("/sources", web::get().to(meta_handlers::list_sources))
        .route("/stats", web::get().to(meta_handlers::stats));
}
