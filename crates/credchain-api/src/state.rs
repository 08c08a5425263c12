//! # Application State
//!
//! Shared state handed to every handler. The registry client and PDF
//! extractor are optional: routes that need a missing dependency answer 503.

use std::sync::Arc;
use std::time::Duration;

use credchain_engine::{DegreeCredentialTemplate, PdfTextExtractor, ScanControl};
use credchain_registry::RegistryClient;

use crate::middleware::metrics::ApiMetrics;

/// Default port, matching the issuer service this API replaces.
pub const DEFAULT_PORT: u16 = 4001;

/// Request body limit for JSON and base64 PDF uploads.
pub const BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Overall deadline for one verification scan.
    pub scan_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            scan_timeout: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Load from `PORT` and `CREDCHAIN_SCAN_TIMEOUT_SECS`, falling back to
    /// defaults for absent or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let scan_timeout = std::env::var("CREDCHAIN_SCAN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.scan_timeout);
        Self { port, scan_timeout }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Ledger access. `None` means registry routes return 503.
    pub registry: Option<Arc<dyn RegistryClient>>,
    /// PDF text source. `None` means the PDF route returns 503.
    pub extractor: Option<Arc<dyn PdfTextExtractor>>,
    /// Template for CSV and PDF derived credentials.
    pub template: DegreeCredentialTemplate,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("registry", &self.registry.is_some())
            .field("extractor", &self.extractor.is_some())
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State with no registry and no extractor.
    ///
    /// # Errors
    ///
    /// Fails if the metrics registry cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            registry: None,
            extractor: None,
            template: DegreeCredentialTemplate::default(),
            metrics: ApiMetrics::new()?,
        })
    }

    pub fn with_registry(mut self, registry: Arc<dyn RegistryClient>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfTextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_template(mut self, template: DegreeCredentialTemplate) -> Self {
        self.template = template;
        self
    }

    /// A fresh scan control bounded by the configured timeout.
    pub fn scan_control(&self) -> ScanControl {
        ScanControl::new().with_timeout(self.config.scan_timeout)
    }
}
