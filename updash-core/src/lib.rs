//! updash core - Up Banking dashboard logic
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Up resources, money, date filters, summaries, stored secrets
//! - **ports**: Trait definitions for external dependencies (CredentialStore, ResourceApi)
//! - **services**: Token vault, pagination, credentials, dashboard views, handlers
//! - **adapters**: Concrete implementations (DuckDB, Up Banking HTTP client)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbCredentialStore;
use adapters::up_bank::UpBankClient;
use config::Config;
use ports::ResourceApi;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    Cursor, CursorKind, DateFilter, IncomeSpending, MonetaryAmount, Page, UpAccount, UpCategory,
    UpTransaction,
};
pub use services::{
    ApiHandlers, ApiResponse, CredentialProblem, CredentialStatus, DashboardService, EntryPoint,
    ListingView, LogEvent, LoggingService, ViewOutcome,
};

/// Main context for updash operations
///
/// Holds the validated configuration, the credential store, and all services
/// wired together. Construction fails when the configuration is invalid.
pub struct UpdashContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub store: Arc<DuckDbCredentialStore>,
    pub logger: Option<Arc<LoggingService>>,
    pub credentials: Arc<CredentialService>,
    pub resources: Arc<ResourceService>,
    pub dashboard: DashboardService,
    pub handlers: ApiHandlers,
}

impl UpdashContext {
    /// Load settings from `data_dir` and build the context
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config, entry_point)
    }

    /// Build the context against the real Up API
    pub fn with_config(data_dir: &Path, config: Config, entry_point: EntryPoint) -> Result<Self> {
        config.validate()?;
        let client = UpBankClient::new_with_base_url(&config.api_base_url, config.request_timeout())?;
        Self::with_api(data_dir, config, Arc::new(client), entry_point)
    }

    /// Build the context with any `ResourceApi` implementation
    pub fn with_api(
        data_dir: &Path,
        config: Config,
        api: Arc<dyn ResourceApi>,
        entry_point: EntryPoint,
    ) -> Result<Self> {
        let key = config.validate()?;
        let vault = Arc::new(TokenVault::new(&key)?);

        std::fs::create_dir_all(data_dir)?;
        let store = Arc::new(DuckDbCredentialStore::new(&data_dir.join("updash.duckdb"))?);

        // A broken log database must not stop the app
        let logger = LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION"))
            .ok()
            .map(Arc::new);

        let mut credentials = CredentialService::new(store.clone(), vault);
        let mut resources = ResourceService::new(api, config.fetch_settings());
        if let Some(logger) = &logger {
            credentials = credentials.with_logger(logger.clone());
            resources = resources.with_logger(logger.clone());
        }
        let credentials = Arc::new(credentials);
        let resources = Arc::new(resources);

        Ok(Self {
            dashboard: DashboardService::new(credentials.clone(), resources.clone()),
            handlers: ApiHandlers::new(credentials.clone(), resources.clone()),
            config,
            data_dir: data_dir.to_path_buf(),
            store,
            logger,
            credentials,
            resources,
        })
    }

    /// A fresh listing using the configured page size
    pub fn listing(&self) -> ListingView {
        ListingView::new(self.config.recent_page_size)
    }
}
