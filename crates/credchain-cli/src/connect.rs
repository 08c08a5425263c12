//! Registry connection arguments shared by the ledger subcommands.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use credchain_core::{Address, CredentialHash};
use credchain_registry::{EvmRegistryClient, LocalSigner, RegistryConfig, Signer};

use crate::exit::UsageError;

/// Where the ledger lives.
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// JSON-RPC endpoint of the chain node.
    pub rpc_url: String,

    /// Address of the credential registry contract.
    pub registry_addr: String,

    /// Chain id for local signing. Queried from the node when omitted.
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl RegistryArgs {
    /// Build the validated client configuration.
    pub fn config(&self) -> Result<RegistryConfig> {
        let mut config =
            RegistryConfig::parse(&self.rpc_url, &self.registry_addr)?.with_timeout_secs(self.timeout_secs);
        if let Some(chain_id) = self.chain_id {
            config = config.with_chain_id(chain_id);
        }
        Ok(config)
    }

    /// A client without a signer, for reads.
    pub fn read_client(&self) -> Result<EvmRegistryClient> {
        Ok(EvmRegistryClient::new(Arc::new(self.config()?))?)
    }

    /// A client that signs `issue` transactions locally with `private_key`.
    pub fn signing_client(&self, private_key: &str) -> Result<EvmRegistryClient> {
        let signer = LocalSigner::from_hex(private_key)?;
        tracing::info!(issuer = %signer.address(), "local signer loaded");
        Ok(self.read_client()?.with_signer(Signer::Local(signer)))
    }
}

/// Parse a subject address argument.
pub fn parse_subject(raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .map_err(|e| UsageError(format!("invalid subject address {raw:?}: {e}")).into())
}

/// Parse a credential hash argument.
pub fn parse_hash(raw: &str) -> Result<CredentialHash> {
    raw.trim()
        .parse()
        .map_err(|e| UsageError(format!("invalid credential hash {raw:?}: {e}")).into())
}
