//! # credchain-cli: Command-Line Tool for the Credential Registry
//!
//! Provides the `credchain` binary for issuers and verifiers who work from
//! a terminal or CI job instead of the HTTP API.
//!
//! ## Subcommands
//!
//! - `credchain hash`: canonical form and hash of a credential file.
//! - `credchain issue`: record one hash under a subject.
//! - `credchain verify`: scan a subject's ledger for a credential or hash.
//! - `credchain batch-issue`: issue every row of a CSV file.
//! - `credchain wallet`: list a subject's records.
//!
//! ```bash
//! credchain hash degree.json
//! credchain verify http://127.0.0.1:8545 0x5FbD...0aa3 0x7099...79C8 degree.json
//! ```
//!
//! Each subcommand returns the process exit code; see [`exit`] for the
//! table and how errors are classified.

pub mod batch;
pub mod connect;
pub mod exit;
pub mod hash;
pub mod issue;
pub mod verify;
pub mod wallet;
