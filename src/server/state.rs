//! Server shared state
//!
//! Holds the configuration, the resolver and the record sink. Nothing in
//! here is mutated after startup apart from the sink's own append lock.

use crate::config::Config;
use crate::error::Result;
use crate::resolve::{HttpClient, ProviderSettings, ReqwestHttpClient, Resolver};
use crate::store::{RecordSink, RecordStore};
use std::sync::Arc;
use tracing::info;

/// Shared state for the HTTP server
pub struct AppState<H = ReqwestHttpClient> {
    pub config: Config,
    pub resolver: Resolver<H>,
    pub sink: Arc<dyn RecordSink>,
}

impl AppState<ReqwestHttpClient> {
    /// Build state from configuration, writing records to the configured path
    pub fn new(config: Config) -> Result<Self> {
        let resolver = Resolver::new(ReqwestHttpClient::new()?, ProviderSettings::from(&config));
        let path = config.records_path()?;
        info!(path = %path.display(), "writing records");

        Ok(Self::with_parts(config, resolver, Arc::new(RecordStore::open(path))))
    }
}

impl<H: HttpClient> AppState<H> {
    /// Assemble state from already-built parts
    pub fn with_parts(config: Config, resolver: Resolver<H>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            config,
            resolver,
            sink,
        }
    }
}
