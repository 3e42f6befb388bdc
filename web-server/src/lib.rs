// web-server/src/lib.rs
pub mod api;
pub mod error;
pub mod middleware;
pub mod secure_session;
pub mod session;
pub mod session_registry;
pub mod siwe;
pub mod static_files;
pub mod store;
pub mod utils;

use std::sync::Arc;

use actix::Addr;
use actix_web::web;

use crate::error::ApiError;
use crate::session::AuthSettings;
use crate::session_registry::SessionRegistryActor;
use crate::store::ProfileStore;

/// Shared handles registered as app data
#[derive(Clone)]
pub struct AppState {
    pub settings: web::Data<AuthSettings>,
    pub registry: web::Data<Addr<SessionRegistryActor>>,
    pub store: web::Data<dyn ProfileStore>,
}

impl AppState {
    pub fn new(
        settings: AuthSettings,
        registry: Addr<SessionRegistryActor>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            settings: web::Data::new(settings),
            registry: web::Data::new(registry),
            store: web::Data::from(store),
        }
    }

    /// Register app data and the API routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::InvalidInput(err.to_string()).into());

        cfg.app_data(self.settings.clone())
            .app_data(self.registry.clone())
            .app_data(self.store.clone())
            .app_data(json_config)
            .configure(api::configure);
    }
}
