//! # `credchain issue`: Record one credential hash
//!
//! ```bash
//! credchain issue http://127.0.0.1:8545 0x5FbD...0aa3 0x7099...79C8 0x0992...fb45 ipfs://cid 0xac09...ff80
//! ```
//!
//! An empty locator (`""`) records no locator. The private key may come
//! from `CREDCHAIN_PRIVATE_KEY` instead of the command line.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use credchain_core::{Address, CredentialHash};
use credchain_registry::{IssueReceipt, RegistryClient};

use crate::connect::{parse_hash, parse_subject, RegistryArgs};
use crate::exit;

/// Arguments for `credchain issue`.
#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Subject account address.
    pub subject_addr: String,

    /// `0x`-prefixed credential hash.
    pub hash: String,

    /// Pointer to the credential content; empty for none.
    pub locator: String,

    /// Issuer private key (hex).
    #[arg(env = "CREDCHAIN_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}

/// Execute `credchain issue`.
pub async fn run_issue(args: &IssueArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject_addr)?;
    let hash = parse_hash(&args.hash)?;
    let client = args.registry.signing_client(&args.private_key)?;
    let receipt = issue_with(Arc::new(client), subject, hash, &args.locator).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(exit::SUCCESS)
}

/// Issue through any registry client.
pub async fn issue_with(
    registry: Arc<dyn RegistryClient>,
    subject: Address,
    hash: CredentialHash,
    locator: &str,
) -> Result<IssueReceipt> {
    let locator = Some(locator).filter(|l| !l.is_empty());
    let receipt = registry.issue(subject, hash, locator).await?;
    tracing::info!(
        %subject,
        %hash,
        tx = %receipt.transaction_hash,
        block = receipt.block_number,
        "credential issued"
    );
    Ok(receipt)
}
