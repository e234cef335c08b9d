pub mod api;
pub mod core;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use actix_web::{dev::ServerHandle, middleware::Logger, web, App, HttpServer};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
    api::handlers::enrollment::EnrollmentLimits,
    core::services::{
        enrollment::EnrollmentService,
        verification::{FirebaseTokenVerifier, TokenVerifier},
    },
    storage::EnrollmentStore,
    utils::{config::Config, error::{NodeError, Result}},
};

pub struct Application {
    config: Arc<Config>,
    enrollment_service: Arc<EnrollmentService>,
    server: Mutex<Option<ServerHandle>>,
}

impl Application {
    /// Builds every long-lived component.
    ///
    /// Fails when the identity provider credentials are missing or unusable,
    /// or when the storage root cannot be created.
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing identity verification...");
        let verifier = FirebaseTokenVerifier::from_config(
            &config.auth,
            config.get_key_refresh_interval(),
            config.get_key_max_stale(),
            config.get_http_timeout(),
        )
        .await
        .map_err(|e| NodeError::Identity(e.to_string()))?;

        Self::with_verifier(config, Arc::new(verifier)).await
    }

    /// Same as [`Application::new`] with a caller-supplied token verifier.
    pub async fn with_verifier(config: Config, verifier: Arc<dyn TokenVerifier>) -> Result<Self> {
        info!("Initializing storage...");
        let store = EnrollmentStore::new(&config.storage.root_dir);
        store
            .init()
            .await
            .map_err(|e| NodeError::Storage(e.to_string()))?;

        Ok(Self {
            enrollment_service: Arc::new(EnrollmentService::new(verifier, store)),
            config: Arc::new(config),
            server: Mutex::new(None),
        })
    }

    pub fn enrollment_service(&self) -> Arc<EnrollmentService> {
        self.enrollment_service.clone()
    }

    /// Binds the API server and runs it in the background.
    pub async fn start(&self) -> Result<()> {
        info!("Starting API server...");
        let service = web::Data::from(self.enrollment_service.clone());
        let limits = EnrollmentLimits {
            max_payload_bytes: self.config.server.max_payload_bytes,
        };

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(api::cors())
                .wrap(Logger::default())
                .app_data(service.clone())
                .app_data(web::Data::new(limits))
                .configure(api::configure)
        })
        .disable_signals();

        if let Some(workers) = self.config.server.workers {
            server = server.workers(workers);
        }

        let server = server
            .bind((self.config.server.host.as_str(), self.config.server.port))
            .map_err(|e| NodeError::Init(format!("Failed to bind API server: {}", e)))?
            .run();

        *self.server.lock().await = Some(server.handle());
        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("API server stopped with error: {}", e);
            }
        });

        info!(
            "Server running at http://{}:{}",
            self.config.server.host, self.config.server.port
        );
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        if let Some(handle) = self.server.lock().await.take() {
            info!("Stopping API server...");
            handle.stop(true).await;
        }

        info!("Application shutdown complete");
        Ok(())
    }
}
