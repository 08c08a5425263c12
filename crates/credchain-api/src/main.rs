//! # credchain-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 4001).
//!
//! With `CREDCHAIN_IN_MEMORY=true` the server runs against an in-process dev
//! ledger. Otherwise the registry client is built from the `CREDCHAIN_*`
//! environment; if that fails, registry routes answer 503.

use std::sync::Arc;

use credchain_api::state::{AppConfig, AppState};
use credchain_core::Address;
use credchain_registry::{
    EvmRegistryClient, InMemoryRegistry, RegistryClient, RegistryConfig, RegistryError, Signer,
    SignerConfig,
};

/// Issuer recorded by the in-memory dev ledger unless overridden.
const DEV_ISSUER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;
    let mut state = AppState::new(config)?;

    if in_memory_requested() {
        let issuer: Address = std::env::var("CREDCHAIN_IN_MEMORY_ISSUER")
            .unwrap_or_else(|_| DEV_ISSUER.to_string())
            .parse()?;
        tracing::warn!(%issuer, "Using in-memory dev ledger; records are lost on exit");
        state = state.with_registry(Arc::new(InMemoryRegistry::new(issuer)));
    } else {
        match registry_from_env() {
            Ok(client) => {
                tracing::info!(
                    registry = %client.config().registry_address,
                    signer = ?client.signer_address(),
                    "Registry client configured"
                );
                state = state.with_registry(Arc::new(client) as Arc<dyn RegistryClient>);
            }
            Err(e) => {
                tracing::warn!("Registry client not configured: {e}. Registry endpoints will return 503.");
            }
        }
    }

    #[cfg(feature = "pdf")]
    {
        state = state.with_extractor(Arc::new(credchain_engine::PdfExtractText));
    }

    let app = credchain_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("credchain API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn in_memory_requested() -> bool {
    std::env::var("CREDCHAIN_IN_MEMORY")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn registry_from_env() -> Result<EvmRegistryClient, RegistryError> {
    let config = Arc::new(RegistryConfig::from_env()?);
    let client = EvmRegistryClient::new(config)?;
    Ok(match SignerConfig::from_env()? {
        Some(signer) => client.with_signer(Signer::from_config(&signer)?),
        None => client,
    })
}
