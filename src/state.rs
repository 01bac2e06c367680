//! Application State
//!
//! Process-wide state shared by the CLI: the config service and the
//! analysis service built from it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use anr_analyzer_llm::ProviderFactory;

use crate::models::settings::AppConfig;
use crate::services::analysis::{AnalysisService, HttpProviderFactory};
use crate::storage::ConfigService;
use crate::utils::error::{AppError, AppResult};

/// Application state
pub struct AppState {
    /// Configuration service for analyzer settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// Analysis service, rebuilt when the configuration changes
    analysis: Arc<RwLock<Option<Arc<AnalysisService>>>>,
    /// Whether the state has been initialized
    initialized: Arc<RwLock<bool>>,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            analysis: Arc::new(RwLock::new(None)),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    /// Load the config (default location unless `config_path` is given) and
    /// build the analysis service with HTTP providers.
    pub async fn initialize(&self, config_path: Option<PathBuf>) -> AppResult<()> {
        let config = match config_path {
            Some(path) => ConfigService::with_path(path)?,
            None => ConfigService::new()?,
        };
        let factory = Arc::new(HttpProviderFactory::new(config.resolved_config()));
        self.initialize_with(config, factory).await
    }

    /// Initialize with an explicit config service and provider factory.
    pub async fn initialize_with(
        &self,
        config: ConfigService,
        factory: Arc<dyn ProviderFactory>,
    ) -> AppResult<()> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        {
            let service = AnalysisService::new(config.resolved_config(), factory);
            let mut analysis_lock = self.analysis.write().await;
            *analysis_lock = Some(Arc::new(service));
        }

        {
            let mut config_lock = self.config.write().await;
            *config_lock = Some(config);
        }

        *initialized = true;
        tracing::debug!("application state initialized");
        Ok(())
    }

    /// Check if config is healthy
    pub fn is_config_healthy(&self) -> bool {
        if let Ok(guard) = self.config.try_read() {
            if let Some(ref config) = *guard {
                return config.is_healthy();
            }
        }
        false
    }

    /// Get the current configuration as stored on disk
    pub async fn get_config(&self) -> AppResult<AppConfig> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.get_config_clone()),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Reset the configuration to defaults and rebuild the analysis service.
    ///
    /// Running analyses keep their registry entries and can still be
    /// cancelled; their outcomes stay queryable through the new service.
    pub async fn reset_config(&self) -> AppResult<AppConfig> {
        let resolved = {
            let mut guard = self.config.write().await;
            let config = guard
                .as_mut()
                .ok_or_else(|| AppError::config("Config service not initialized"))?;
            config.reset()?;
            config.resolved_config()
        };

        let mut analysis_lock = self.analysis.write().await;
        let factory = Arc::new(HttpProviderFactory::new(resolved.clone()));
        let service = match analysis_lock.as_ref() {
            Some(current) => current.reconfigure(resolved.clone(), factory),
            None => AnalysisService::new(resolved.clone(), factory),
        };
        *analysis_lock = Some(Arc::new(service));
        Ok(resolved)
    }

    /// Get the analysis service
    pub async fn analysis_service(&self) -> AppResult<Arc<AnalysisService>> {
        let guard = self.analysis.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| AppError::internal("Analysis service not initialized"))
    }

    /// Cancel every running analysis. Returns how many were cancelled.
    pub async fn shutdown(&self) -> usize {
        let guard = self.analysis.read().await;
        match &*guard {
            Some(service) => service.shutdown(),
            None => 0,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
