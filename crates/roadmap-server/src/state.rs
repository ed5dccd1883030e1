//! Shared request state and its construction from configuration

use crate::config::{Environment, ServerConfig};
use crate::openai::OpenAiGenerator;
use roadmap_core::{
    ContentGenerator, CoreConfig, GenerationOrchestrator, IdentityResolver, MemoryReportStore,
    MemoryUsageStore, ReportService, ReportStore, UsageGovernor, UsageStore,
};
use roadmap_store::{OpenError, SqliteConfig, SqliteStore};
use std::sync::Arc;

/// Everything a handler needs; cheap to clone
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: GenerationOrchestrator,
    pub reports: ReportService,
    pub resolver: IdentityResolver,
    pub environment: Environment,
}

impl AppState {
    /// Assemble state from parts
    #[must_use]
    pub fn new(
        usage: Arc<dyn UsageStore>,
        reports: Arc<dyn ReportStore>,
        generator: Arc<dyn ContentGenerator>,
        core: &CoreConfig,
    ) -> Self {
        Self {
            orchestrator: GenerationOrchestrator::new(UsageGovernor::new(usage), generator, core),
            reports: ReportService::new(reports),
            resolver: IdentityResolver::new(),
            environment: Environment::Production,
        }
    }

    /// With identity resolver
    #[inline]
    #[must_use]
    pub fn with_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// With environment
    #[inline]
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Build stores and generator from configuration
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or the HTTP client
    /// cannot be built
    pub async fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let usage: Arc<dyn UsageStore>;
        let reports: Arc<dyn ReportStore>;
        if config.uses_memory_store() {
            tracing::warn!("using in-memory stores; counters and reports are lost on exit");
            usage = Arc::new(MemoryUsageStore::new());
            reports = Arc::new(MemoryReportStore::new());
        } else {
            let store = Arc::new(SqliteStore::open(&SqliteConfig::new(&config.database)).await?);
            usage = store.clone();
            reports = store;
        }

        if config.generator.api_key.is_none() {
            tracing::warn!("no generator API key configured; /generate will fail with auth errors");
        }
        let generator = Arc::new(OpenAiGenerator::new(&config.generator)?);

        Ok(Self::new(usage, reports, generator, &config.core())
            .with_resolver(
                IdentityResolver::new().with_trusted_forwarded_for(config.trust_forwarded_for),
            )
            .with_environment(config.environment))
    }
}

/// Failures while building [`AppState`]
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Database could not be opened
    #[error("cannot open database: {0}")]
    Store(#[from] OpenError),

    /// HTTP client could not be built
    #[error("cannot build generator client: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_config_builds() {
        let config = ServerConfig::new().with_database("memory");
        let state = AppState::from_config(&config).await.unwrap();
        assert_eq!(state.environment, Environment::Production);
        assert!(state.reports.store().ping().await.is_ok());
    }

    #[tokio::test]
    async fn sqlite_config_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::new()
            .with_database(dir.path().join("r.db").display().to_string())
            .with_environment(Environment::Development);
        let state = AppState::from_config(&config).await.unwrap();
        assert!(state.environment.exposes_detail());
        assert!(state.orchestrator.governor().store().ping().await.is_ok());
    }
}
