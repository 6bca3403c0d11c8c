// This is the entry point of the moderation engine.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (database, notification queue)
// - `api/` = HTTP adapters consumed by the content services
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize stores and services (dependency injection)
// 3. Serve the HTTP boundary

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "api/api_layer.rs"]
mod api;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::api::moderation::{create_router, AppState};
use crate::core::moderation::{ModerationConfig, ModerationService};
use crate::infra::moderation::{QueueNotifier, SqliteModerationStore};
use std::sync::Arc;

/// Load detector weights and thresholds, optionally overridden from a JSON
/// file. A broken override falls back to the defaults rather than refusing
/// to start.
fn load_config() -> ModerationConfig {
    let mut config = match std::env::var("MODERATION_CONFIG_FILE") {
        Ok(path) => match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Invalid moderation config at {}: {}", path, e);
                ModerationConfig::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read moderation config at {}: {}", path, e);
                ModerationConfig::default()
            }
        },
        Err(_) => ModerationConfig::default(),
    };

    // The platform's own domain is always safe to link
    if let Ok(domain) = std::env::var("PLATFORM_DOMAIN") {
        if !config.allowed_domains.contains(&domain) {
            config.allowed_domains.push(domain);
        }
    }

    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Keep the runtime database in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir)?;
    let db_path = format!("{}/moderation.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await?;
    let store = SqliteModerationStore::new(pool);
    store.migrate().await?;

    // Bounded queue; a slow ops channel must never delay a verdict
    let notifier = QueueNotifier::spawn(256);

    let config = load_config();
    let engine = Arc::new(ModerationService::with_config(
        store.clone(),
        store,
        notifier,
        config,
    ));

    // ========================================================================
    // HTTP BOUNDARY
    // ========================================================================

    let state = AppState { engine };
    let app = create_router(state);

    let bind_addr =
        std::env::var("MODERATION_BIND").unwrap_or_else(|_| "0.0.0.0:8088".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Moderation engine listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
