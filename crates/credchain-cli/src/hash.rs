//! # `credchain hash`: Canonical form and hash of a credential file
//!
//! ```bash
//! credchain hash degree.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use credchain_core::{hash_credential_text, CanonicalBytes, CredentialHash};

use crate::exit;

/// Arguments for `credchain hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Credential JSON file.
    pub file: PathBuf,

    /// Print `{"vcHash", "canonical"}` JSON instead of two text lines.
    #[arg(long)]
    pub json: bool,
}

/// Read and hash a credential file.
pub fn hash_file(path: &Path) -> Result<(CanonicalBytes, CredentialHash)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading credential {}", path.display()))?;
    let hashed = hash_credential_text(&text)
        .with_context(|| format!("hashing credential {}", path.display()))?;
    Ok(hashed)
}

/// Execute `credchain hash`.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let (canonical, hash) = hash_file(&args.file)?;
    if args.json {
        let out = serde_json::json!({
            "vcHash": hash.to_hex(),
            "canonical": canonical.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("canonical: {canonical}");
        println!("vcHash: {hash}");
    }
    Ok(exit::SUCCESS)
}
