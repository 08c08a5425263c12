//! # `credchain batch-issue`: Issue every row of a CSV file
//!
//! ```bash
//! credchain batch-issue http://127.0.0.1:8545 0x5FbD...0aa3 graduates.csv 0xac09...ff80 --fail-fast
//! ```
//!
//! Rows are issued in file order, one confirmed transaction at a time. The
//! per-row report is printed as JSON; any failed or skipped row makes the
//! command exit 5.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use credchain_core::Timestamp;
use credchain_engine::{
    parse_csv_rows, BatchPipeline, BatchReport, DegreeCredentialTemplate, FailurePolicy,
};
use credchain_registry::RegistryClient;

use crate::connect::RegistryArgs;
use crate::exit;

/// Arguments for `credchain batch-issue`.
#[derive(Args, Debug)]
pub struct BatchIssueArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// CSV file with an `address` column.
    pub csv_path: PathBuf,

    /// Issuer private key (hex).
    #[arg(env = "CREDCHAIN_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Stop at the first failed row; later rows are skipped.
    #[arg(long)]
    pub fail_fast: bool,

    /// Issuer DID written into each credential.
    #[arg(long)]
    pub issuer_did: Option<String>,
}

/// Execute `credchain batch-issue`.
pub async fn run_batch_issue(args: &BatchIssueArgs) -> Result<u8> {
    let client = args.registry.signing_client(&args.private_key)?;
    let mut template = DegreeCredentialTemplate::default();
    if let Some(did) = &args.issuer_did {
        template = template.with_issuer(did.clone());
    }
    let policy = if args.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::ContinueOnError
    };

    let report = batch_with(Arc::new(client), &args.csv_path, template, policy).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(exit_code(&report))
}

/// Run the batch through any registry client.
pub async fn batch_with(
    registry: Arc<dyn RegistryClient>,
    csv_path: &Path,
    template: DegreeCredentialTemplate,
    policy: FailurePolicy,
) -> Result<BatchReport> {
    let text = std::fs::read_to_string(csv_path)
        .with_context(|| format!("reading {}", csv_path.display()))?;
    let rows = parse_csv_rows(&text).with_context(|| format!("parsing {}", csv_path.display()))?;
    Ok(BatchPipeline::new(registry, template)
        .with_policy(policy)
        .run(&rows, Timestamp::now())
        .await)
}

/// 0 when every row was issued, 5 otherwise.
pub fn exit_code(report: &BatchReport) -> u8 {
    if report.is_success() {
        exit::SUCCESS
    } else {
        exit::FAILURE
    }
}
