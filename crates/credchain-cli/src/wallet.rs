//! # `credchain wallet`: List every record filed under a subject

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use credchain_engine::VerificationEngine;

use crate::connect::{parse_subject, RegistryArgs};
use crate::exit;

/// Arguments for `credchain wallet`.
#[derive(Args, Debug)]
pub struct WalletArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Subject account address.
    pub subject_addr: String,
}

/// Execute `credchain wallet`. Records print as a JSON array in index order.
pub async fn run_wallet(args: &WalletArgs) -> Result<u8> {
    let subject = parse_subject(&args.subject_addr)?;
    let client = args.registry.read_client()?;
    let records = VerificationEngine::new(Arc::new(client))
        .list_records(subject)
        .await?;
    tracing::info!(%subject, count = records.len(), "wallet listed");
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(exit::SUCCESS)
}
