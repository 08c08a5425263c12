//! # `credchain verify`: Look a credential up on a subject's ledger
//!
//! ```bash
//! credchain verify http://127.0.0.1:8545 0x5FbD...0aa3 0x7099...79C8 degree.json
//! credchain verify http://127.0.0.1:8545 0x5FbD...0aa3 0x7099...79C8 0x0992...fb45
//! ```
//!
//! The outcome is printed as JSON either way. No matching record is an
//! error, so the command exits 2.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use credchain_core::{Address, CredentialHash, CredentialValue};
use credchain_engine::{ScanControl, VerificationEngine, VerificationOutcome, VerifyTarget};
use credchain_registry::RegistryClient;

use crate::connect::{parse_subject, RegistryArgs};
use crate::exit::{self, UsageError};

/// Arguments for `credchain verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Subject account address.
    pub subject_addr: String,

    /// A `0x`-prefixed credential hash, or a credential JSON file.
    pub target: String,

    /// Give up on the scan after this many seconds.
    #[arg(long)]
    pub scan_timeout_secs: Option<u64>,
}

/// Interpret the target argument: a well-formed hash wins, anything else
/// is read as a credential file.
pub fn resolve_target(raw: &str) -> Result<VerifyTarget> {
    if let Ok(hash) = raw.trim().parse::<CredentialHash>() {
        return Ok(VerifyTarget::Hash(hash));
    }
    let path = Path::new(raw);
    if !path.exists() {
        return Err(UsageError(format!(
            "{raw:?} is neither a credential hash nor an existing file"
        ))
        .into());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading credential {}", path.display()))?;
    let vc = CredentialValue::parse(&text)
        .with_context(|| format!("parsing credential {}", path.display()))?;
    Ok(VerifyTarget::Credential(vc))
}

/// Execute `credchain verify`.
pub async fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject_addr)?;
    let target = resolve_target(&args.target)?;
    let client = args.registry.read_client()?;
    let control = match args.scan_timeout_secs {
        Some(secs) => ScanControl::new().with_timeout(Duration::from_secs(secs)),
        None => ScanControl::new(),
    };
    let outcome = verify_with(Arc::new(client), subject, target, &control).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    outcome.require_match()?;
    Ok(exit::SUCCESS)
}

/// Scan through any registry client.
pub async fn verify_with(
    registry: Arc<dyn RegistryClient>,
    subject: Address,
    target: VerifyTarget,
    control: &ScanControl,
) -> Result<VerificationOutcome> {
    Ok(VerificationEngine::new(registry)
        .verify(subject, target, control)
        .await?)
}
