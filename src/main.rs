use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use frontdesk::state::AppState;
use frontdesk::{api, config, db, queue};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Frontdesk starting v{}", config::APP_VERSION);

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).expect("Cannot create data directory");
    }
    // Run migrations once at startup; request handlers open their own
    // connections afterwards.
    db::open_database(&db_path).expect("Database initialization failed");

    let state = Arc::new(AppState::new(db_path));

    // Nightly queue reset, re-checked hourly.
    let _reset_handle = queue::overnight::start_overnight_reset(state.clone());

    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Cannot bind listen address");
    tracing::info!(%addr, "Frontdesk API listening");

    let app = api::router::api_router(state);
    axum::serve(listener, app).await.expect("Server error");
}
