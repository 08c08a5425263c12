//! # credchain CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Usage errors exit 1; everything else is classified by
//! [`credchain_cli::exit::classify`].

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credchain_cli::batch::{run_batch_issue, BatchIssueArgs};
use credchain_cli::exit;
use credchain_cli::hash::{run_hash, HashArgs};
use credchain_cli::issue::{run_issue, IssueArgs};
use credchain_cli::verify::{run_verify, VerifyArgs};
use credchain_cli::wallet::{run_wallet, WalletArgs};

/// credchain: tamper-evident credentials anchored on an EVM ledger.
///
/// Hashes credential documents canonically, records the hashes under
/// subject accounts, and verifies documents against those records.
#[derive(Parser, Debug)]
#[command(name = "credchain", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the canonical form and hash of a credential file.
    Hash(HashArgs),

    /// Record a credential hash under a subject.
    Issue(IssueArgs),

    /// Check a credential file or hash against a subject's records.
    Verify(VerifyArgs),

    /// Build and issue a credential for every row of a CSV file.
    #[command(name = "batch-issue")]
    BatchIssue(BatchIssueArgs),

    /// List every record held by a subject.
    Wallet(WalletArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here, on stdout.
            let code = if e.use_stderr() { exit::USAGE } else { exit::SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("credchain CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Hash(args) => run_hash(&args),
        Commands::Issue(args) => run_issue(&args).await,
        Commands::Verify(args) => run_verify(&args).await,
        Commands::BatchIssue(args) => run_batch_issue(&args).await,
        Commands::Wallet(args) => run_wallet(&args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(exit::classify(&e))
        }
    }
}
