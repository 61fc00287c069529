//! akira-rt - AKIRA Retuner service
//!
//! **Module Identity:**
//! - Name: akira-rt (Retuner)
//! - Port: 5740
//!
//! Accepts cartoon video uploads, flags overstimulating audio segments
//! (sudden loud noise, monotonous repetition) and produces a retuned copy
//! of the video with those segments softened for young listeners.

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use akira_common::events::EventBus;
use akira_rt::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting akira-rt (Retuner) service");
    info!("Port: 5740");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder (CLI arg unused; env then default)
    let root_folder = akira_common::config::resolve_root_folder(None, "AKIRA_ROOT_FOLDER");
    info!("Root folder: {}", root_folder.display());

    // Step 2: Create root folder and upload directories if missing
    akira_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    // Step 3: Load TOML config if present (absent file is fine)
    let config_path = akira_common::config::default_config_path();
    let toml_config = match akira_common::config::load_toml_config(&config_path) {
        Ok(config) => {
            info!("Loaded TOML config from {}", config_path.display());
            config
        }
        Err(_) => akira_common::config::TomlConfig::default(),
    };

    // Step 4: Open or create database
    let db_path = akira_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db_pool = akira_rt::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Sessions left running by a previous process cannot resume
    match akira_rt::db::sessions::cleanup_stale_sessions(&db_pool).await {
        Ok(0) => {}
        Ok(n) => warn!("Marked {} stale retune session(s) as cancelled", n),
        Err(e) => warn!("Stale session cleanup failed: {}", e),
    }

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity
    info!("Event bus initialized");

    // Create application state
    let state = AppState::new(db_pool, event_bus, root_folder, toml_config);

    // Build router
    let app = akira_rt::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:5740").await?;
    info!("Listening on http://127.0.0.1:5740");
    info!("Health check: http://127.0.0.1:5740/health");

    axum::serve(listener, app).await?;

    Ok(())
}
