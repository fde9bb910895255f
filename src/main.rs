use std::sync::Arc;

use axum::{debug_handler, response::IntoResponse, routing::get, Json, Router};
use chathub::config::Config;
use chathub::gateway::{ws, Gateway};
use chathub::store::SqliteMessageStore;
use chathub::{feed, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chathub=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&cfg.database_url)
        .await?;
    let store = Arc::new(SqliteMessageStore::new(db_pool));
    store.migrate().await?;

    let gateway = Arc::new(Gateway::new(Arc::clone(&store), cfg.gateway()));
    let app_state = AppState { gateway, store };

    let app = Router::new()
        .route("/api/ping", get(ping))
        .route("/api/messages", get(feed::recent_messages))
        .route("/ws", get(ws::chat_ws))
        .with_state(app_state)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "chathub listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[debug_handler]
async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "success": true }))
}
