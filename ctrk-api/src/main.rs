//! ctrk-api - Component Tracker Service
//!
//! Record-keeping service for software components across business towers:
//! CRUD over the component store, bulk ingestion from uploaded
//! CSV/Excel/JSON files, CSV export, and an SSE channel for live updates.

use anyhow::Result;
use clap::Parser;
use ctrk_common::events::EventBus;
use tracing::info;

use ctrk_api::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "ctrk-api", about = "Component tracker service")]
struct Args {
    /// Data folder holding ctrk.db (overrides CTRK_ROOT_FOLDER and config file)
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP bind port (overrides CTRK_PORT and config file)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting ctrk-api (Component Tracker) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: CLI > env > config file > defaults
    let config = ctrk_common::config::resolve_config(args.root_folder.as_deref(), args.port);
    config.ensure_root_folder()?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());

    // Initialize database connection pool (creates schema when missing)
    let db_pool = ctrk_common::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    let port = config.port;
    let state = AppState::new(db_pool, event_bus, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
