pub mod api;
pub mod core;
pub mod storage;
pub mod utils;

use std::sync::Arc;
use tracing::info;

use crate::{
    core::{capability::SystemClock, services::AttendanceService},
    storage::{AttendanceStore, EncryptedStore, MemoryStore},
    utils::{
        config::{Config, StorageBackend},
        error::{AppError, AppResult},
    },
};

pub struct Application {
    config: Arc<Config>,
    store: Arc<dyn AttendanceStore>,
    attendance_service: Arc<AttendanceService>,
}

impl Application {
    pub async fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        info!("Initializing storage...");
        let store: Arc<dyn AttendanceStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Rocksdb => Arc::new(EncryptedStore::new(
                &config.storage.path,
                config.storage.encryption_key.as_bytes(),
            )?),
        };

        info!("Initializing services...");
        let attendance_service = Arc::new(AttendanceService::new(
            &config.policy,
            store.clone(),
            Arc::new(SystemClock),
        ));

        Ok(Self {
            config,
            store,
            attendance_service,
        })
    }

    pub fn attendance_service(&self) -> Arc<AttendanceService> {
        self.attendance_service.clone()
    }

    /// Binds the API server. The returned server must be awaited to run.
    pub fn start(&self) -> AppResult<actix_web::dev::Server> {
        use actix_cors::Cors;
        use actix_web::{web, App, HttpServer};

        let service = web::Data::from(self.attendance_service.clone());
        let allowed_origins = self.config.security.allowed_origins.clone();
        let max_request_size = self.config.security.max_request_size;

        info!(
            "Starting API server on {}:{}",
            self.config.node.host, self.config.node.port
        );

        let server = HttpServer::new(move || {
            let cors = allowed_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .app_data(service.clone())
                .app_data(web::JsonConfig::default().limit(max_request_size))
                .configure(api::configure)
        })
        .disable_signals()
        .bind((
            self.config.node.host.as_str(),
            self.config.node.port,
        ))
        .map_err(|e| AppError::Init(format!("Failed to bind API server: {}", e)))?
        .run();

        Ok(server)
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down application...");
        self.attendance_service.metrics().log();

        info!("Flushing storage...");
        self.store.flush().await?;

        info!("Application shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_application_with_memory_store() {
        let app = Application::new(Config::default()).await.unwrap();
        let service = app.attendance_service();
        assert_eq!(service.policy().required_scans(crate::core::attendance::ClassMode::Online), 3);
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_application_with_rocksdb_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Rocksdb;
        config.storage.path = temp_dir.path().to_string_lossy().into_owned();
        config.storage.encryption_key = "test_key".to_string();

        let app = Application::new(config).await.unwrap();
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_config() {
        let mut config = Config::default();
        config.node.port = 0;
        assert!(matches!(Application::new(config).await, Err(AppError::Config(_))));
    }
}
