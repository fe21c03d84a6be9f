use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

mod clients;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod sources;
mod state;
mod utils;

use crate::clients::LlmRouter;
use crate::config::AppSettings;
use crate::db::connection::{create_pool, verify_connection};
use crate::db::{
    AiAnalysisRepository, AiPromptRepository, JobRepository, NoteRepository,
    SavedSearchRepository, TriageRepository,
};
use crate::routes::configure_routes;
use crate::services::{AnalysisService, SearchManager};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load application settings from environment
    let settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings from environment: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    // Database connection setup
    let db_pool = match create_pool(&settings.database).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    // Make sure the data/log directories exist before anything appends to them
    for dir in [&settings.paths.data_dir, &settings.paths.log_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Could not create directory {}: {}", dir.display(), e);
        }
    }

    // Initialize repositories
    let jobs = Arc::new(JobRepository::new(db_pool.clone()));
    let triage = Arc::new(TriageRepository::new(db_pool.clone()));
    let notes = Arc::new(NoteRepository::new(db_pool.clone()));
    let saved_searches = Arc::new(SavedSearchRepository::searches(db_pool.clone()));
    let saved_board_searches = Arc::new(SavedSearchRepository::board_searches(db_pool.clone()));
    let ai_prompts = Arc::new(AiPromptRepository::new(db_pool.clone()));
    let ai_analyses = Arc::new(AiAnalysisRepository::new(db_pool.clone()));

    // Initialize services
    let llm = Arc::new(LlmRouter::new(&settings));
    let search_manager = Arc::new(SearchManager::new(jobs.clone(), settings.clone()));
    let analysis = Arc::new(AnalysisService::new(
        jobs.clone(),
        ai_prompts.clone(),
        ai_analyses.clone(),
        llm.clone(),
        settings.paths.clone(),
    ));

    let host = settings.server.host.clone();
    let port = settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);

    let listener = TcpListener::bind(format!("{}:{}", host, port))?;
    let cors_origins = settings.server.cors_origins.clone();

    HttpServer::new(move || {
        // Configure CORS using actix-cors
        let mut cors = Cors::default().supports_credentials();
        if cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        let app_state = web::Data::new(AppState {
            settings: settings.clone(),
            jobs: jobs.clone(),
            triage: triage.clone(),
            notes: notes.clone(),
            saved_searches: saved_searches.clone(),
            saved_board_searches: saved_board_searches.clone(),
            ai_prompts: ai_prompts.clone(),
            ai_analyses: ai_analyses.clone(),
            search_manager: search_manager.clone(),
            analysis: analysis.clone(),
            llm: llm.clone(),
        });

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(app_state)
            .service(web::resource("/health").route(web::get().to(handlers::health::health_check)))
            .service(web::scope("/api").configure(configure_routes))
    })
    .listen(listener)?
    .run()
    .await
}
