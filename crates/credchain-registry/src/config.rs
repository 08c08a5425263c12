//! Registry client configuration.
//!
//! `RegistryConfig` is built once (explicitly or from the environment) and
//! shared behind an `Arc` by every component that talks to the ledger. It is
//! never mutated after construction.
//!
//! Signing material lives in a separate [`SignerConfig`] so that read-only
//! verifiers never have to handle a private key.

use std::fmt;

use credchain_core::{Address, HexError};
use url::Url;
use zeroize::Zeroizing;

/// Default JSON-RPC endpoint (local development node).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Connection settings for the credential registry.
///
/// Custom `Debug` implementation prints only the RPC origin, since hosted
/// providers embed API keys in the URL path.
#[derive(Clone)]
pub struct RegistryConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: Url,
    /// Address of the deployed registry contract.
    pub registry_address: Address,
    /// EIP-155 chain id. Queried with `eth_chainId` when unset.
    pub chain_id: Option<u64>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Interval between receipt polls while awaiting confirmation.
    pub confirmation_poll_ms: u64,
    /// Upper bound on waiting for a write to be mined.
    pub confirmation_timeout_secs: u64,
    /// Maximum concurrent read calls against the endpoint.
    pub max_concurrent_reads: usize,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("rpc_url", &self.rpc_url.origin().ascii_serialization())
            .field("registry_address", &self.registry_address)
            .field("chain_id", &self.chain_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("confirmation_poll_ms", &self.confirmation_poll_ms)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .field("max_concurrent_reads", &self.max_concurrent_reads)
            .finish()
    }
}

impl RegistryConfig {
    /// Configuration with default timeouts and concurrency.
    pub fn new(rpc_url: Url, registry_address: Address) -> Self {
        Self {
            rpc_url,
            registry_address,
            chain_id: None,
            timeout_secs: 30,
            confirmation_poll_ms: 500,
            confirmation_timeout_secs: 120,
            max_concurrent_reads: 16,
        }
    }

    /// Parse the endpoint and contract address from text, as given on a
    /// command line.
    pub fn parse(rpc_url: &str, registry_address: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(rpc_url)
            .map_err(|e| ConfigError::InvalidUrl("rpcUrl".to_string(), e.to_string()))?;
        let address = registry_address
            .parse()
            .map_err(|e| ConfigError::InvalidAddress("registryAddr".to_string(), e))?;
        Ok(Self::new(url, address))
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CREDCHAIN_RPC_URL` (default: `http://127.0.0.1:8545`)
    /// - `CREDCHAIN_REGISTRY_ADDRESS` (required)
    /// - `CREDCHAIN_CHAIN_ID` (optional)
    /// - `CREDCHAIN_TIMEOUT_SECS` (default: 30)
    /// - `CREDCHAIN_CONFIRMATION_TIMEOUT_SECS` (default: 120)
    /// - `CREDCHAIN_MAX_CONCURRENT_READS` (default: 16)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url =
            std::env::var("CREDCHAIN_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        let rpc_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("CREDCHAIN_RPC_URL".to_string(), e.to_string()))?;
        let raw_address = std::env::var("CREDCHAIN_REGISTRY_ADDRESS")
            .map_err(|_| ConfigError::MissingVar("CREDCHAIN_REGISTRY_ADDRESS"))?;
        let registry_address = raw_address
            .parse()
            .map_err(|e| ConfigError::InvalidAddress("CREDCHAIN_REGISTRY_ADDRESS".to_string(), e))?;

        let mut config = Self::new(rpc_url, registry_address);
        config.chain_id = env_number("CREDCHAIN_CHAIN_ID")?;
        if let Some(secs) = env_number("CREDCHAIN_TIMEOUT_SECS")? {
            config.timeout_secs = secs;
        }
        if let Some(secs) = env_number("CREDCHAIN_CONFIRMATION_TIMEOUT_SECS")? {
            config.confirmation_timeout_secs = secs;
        }
        if let Some(n) = env_number::<usize>("CREDCHAIN_MAX_CONCURRENT_READS")? {
            config.max_concurrent_reads = n.max(1);
        }
        Ok(config)
    }

    /// Set the chain id instead of querying it.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the confirmation polling interval and overall wait.
    pub fn with_confirmation(mut self, poll_ms: u64, timeout_secs: u64) -> Self {
        self.confirmation_poll_ms = poll_ms;
        self.confirmation_timeout_secs = timeout_secs;
        self
    }

    /// Set the read concurrency bound (minimum 1).
    pub fn with_max_concurrent_reads(mut self, n: usize) -> Self {
        self.max_concurrent_reads = n.max(1);
        self
    }
}

/// How `issue` transactions are signed.
///
/// Custom `Debug` implementation redacts the private key.
#[derive(Clone)]
pub enum SignerConfig {
    /// Sign locally with a secp256k1 private key (hex, optional `0x`).
    Local(Zeroizing<String>),
    /// Let the RPC node sign for an unlocked or managed account.
    RpcManaged {
        /// Account the node signs for.
        from: Address,
    },
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.debug_tuple("Local").field(&"[REDACTED]").finish(),
            Self::RpcManaged { from } => f.debug_struct("RpcManaged").field("from", from).finish(),
        }
    }
}

impl SignerConfig {
    /// A local signer from a hex private key.
    pub fn local(private_key: impl Into<String>) -> Self {
        Self::Local(Zeroizing::new(private_key.into()))
    }

    /// Load signer settings from the environment.
    ///
    /// `CREDCHAIN_PRIVATE_KEY` selects a local signer; otherwise
    /// `CREDCHAIN_FROM_ADDRESS` selects an RPC-managed account. Returns
    /// `Ok(None)` when neither is set (read-only client).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        if let Ok(key) = std::env::var("CREDCHAIN_PRIVATE_KEY") {
            return Ok(Some(Self::local(key)));
        }
        match std::env::var("CREDCHAIN_FROM_ADDRESS") {
            Ok(raw) => {
                let from = raw
                    .parse()
                    .map_err(|e| ConfigError::InvalidAddress("CREDCHAIN_FROM_ADDRESS".to_string(), e))?;
                Ok(Some(Self::RpcManaged { from }))
            }
            Err(_) => Ok(None),
        }
    }
}

fn env_number<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid address for {0}: {1}")]
    InvalidAddress(String, HexError),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(&'static str),
    #[error("no signer configured; issue requires a private key or RPC-managed account")]
    MissingSigner,
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let cfg = RegistryConfig::parse(DEFAULT_RPC_URL, "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512")
            .unwrap();
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.confirmation_poll_ms, 500);
        assert_eq!(cfg.max_concurrent_reads, 16);
        assert_eq!(cfg.chain_id, None);
        assert_eq!(
            cfg.registry_address.to_string(),
            "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"
        );
    }

    #[test]
    fn parse_rejects_bad_inputs() {
        assert!(matches!(
            RegistryConfig::parse("not a url", "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
            Err(ConfigError::InvalidUrl(..))
        ));
        assert!(matches!(
            RegistryConfig::parse(DEFAULT_RPC_URL, "0x1234"),
            Err(ConfigError::InvalidAddress(..))
        ));
    }

    #[test]
    fn builders_override_fields() {
        let cfg = RegistryConfig::parse(DEFAULT_RPC_URL, &format!("0x{}", "00".repeat(20)))
            .unwrap()
            .with_chain_id(31337)
            .with_timeout_secs(5)
            .with_confirmation(10, 2)
            .with_max_concurrent_reads(0);
        assert_eq!(cfg.chain_id, Some(31337));
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.confirmation_poll_ms, 10);
        assert_eq!(cfg.confirmation_timeout_secs, 2);
        assert_eq!(cfg.max_concurrent_reads, 1);
    }

    #[test]
    fn debug_hides_url_path() {
        let cfg = RegistryConfig::parse(
            "https://mainnet.infura.io/v3/secret-project-key",
            &format!("0x{}", "00".repeat(20)),
        )
        .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret-project-key"));
        assert!(dbg.contains("mainnet.infura.io"));
    }

    #[test]
    fn signer_debug_redacts_key() {
        let signer = SignerConfig::local("0xdeadbeef");
        let dbg = format!("{signer:?}");
        assert!(!dbg.contains("deadbeef"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn env_number_absent_is_none() {
        let v: Option<u64> = env_number("CREDCHAIN_TEST_UNSET_VAR_9f2c").unwrap();
        assert!(v.is_none());
    }
}
