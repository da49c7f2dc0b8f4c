//! Nema - a C. elegans-inspired conversational agent
//!
//! A Rust backend that keeps a neuron-state model a language model reads
//! and mutates turn by turn, durably logging every accepted mutation.

mod api;
mod db;
mod llm;
mod manager;
mod prompt;
mod state;

use api::{create_router, AppState};
use db::Store;
use llm::{build_client, LlmConfig};
use manager::ConversationManager;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional .env file for local development
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nema=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("NEMA_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.nema/nema.db")
    });

    let port: u16 = std::env::var("NEMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening store");
    let store = Store::open(&db_path)?;

    // Build the LLM backend selected by the environment
    let llm_config = LlmConfig::from_env();
    let llm = build_client(&llm_config)?;
    tracing::info!(model = %llm.model_id(), "LLM client initialized");

    // Bootstrap the conversation manager
    let manager = ConversationManager::new(store, llm, prompt::SEED_PROMPT)?;
    let app_state = AppState::new(manager);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Nema server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
