// web-server/src/main.rs
use std::sync::Arc;

use actix::Actor;
use actix_web::{App, HttpServer};
use common::{setup_tracing, Config};
use web_server::middleware::{AuthGate, RateLimiter};
use web_server::session::AuthSettings;
use web_server::session_registry::SessionRegistryActor;
use web_server::static_files::{self, StaticFilesConfig};
use web_server::store::{MemoryProfileStore, PgProfileStore, ProfileStore};
use web_server::AppState;

async fn open_store(config: &Config) -> std::io::Result<Arc<dyn ProfileStore>> {
    if config.database.url.is_empty() {
        tracing::warn!("DATABASE_URL not set, profiles are kept in memory");
        return Ok(Arc::new(MemoryProfileStore::new()));
    }

    let store = PgProfileStore::connect(&config.database)
        .await
        .map_err(std::io::Error::other)?;
    store.migrate().await.map_err(std::io::Error::other)?;
    store.health_check().await.map_err(std::io::Error::other)?;
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = Config::from_env();

    // Setup tracing
    setup_tracing(&config.log_level);

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
    }

    let store = open_store(&config).await?;

    let registry = SessionRegistryActor::new(config.auth.challenge_ttl_secs)
        .with_cleanup_interval(config.auth.registry_cleanup_interval_secs)
        .start();

    let state = AppState::new(AuthSettings::from_config(&config), registry, store);
    let limiter = RateLimiter::from_config(&config.rate_limit);
    let static_config = config
        .static_files
        .enabled
        .then(|| StaticFilesConfig::from(&config.static_files));

    // Save address before moving config into the server closure
    let server_addr = config.web_server_addr.clone();

    tracing::info!("Starting Web Server on {}", server_addr);

    HttpServer::new(move || {
        let state = state.clone();
        let static_config = static_config.clone();

        App::new()
            .wrap(AuthGate)
            .wrap(limiter.clone())
            .configure(|cfg| state.configure(cfg))
            .configure(|cfg| {
                if let Some(static_config) = static_config {
                    static_files::configure(cfg, static_config);
                }
            })
    })
    .bind(&server_addr)?
    .run()
    .await
}
