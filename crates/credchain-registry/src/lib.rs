//! # credchain-registry: Credential Ledger Client
//!
//! Typed access to the append-only credential registry contract. Each
//! subject (an EVM account) owns a dense list of records; the registry
//! exposes three calls:
//!
//! | Call | Kind | Effect |
//! |------|------|--------|
//! | `issue(subject, hash, locator)` | write | append a record |
//! | `getCount(subject)` | read | number of records |
//! | `getCred(subject, index)` | read | record at `index` |
//!
//! ## Crate Structure
//!
//! - [`client`]: the [`RegistryClient`] trait every backend implements.
//! - [`evm`]: JSON-RPC backend against a deployed contract.
//! - [`memory`]: process-local backend for development and tests.
//! - [`abi`]: calldata encoding and return-data decoding.
//! - [`signer`]: local EIP-155 signing or node-managed accounts.
//! - [`config`]: endpoint, contract and signer configuration.
//! - [`error`]: [`RegistryError`] with per-call context.
//!
//! ## Write Safety
//!
//! `issue` is never retried by any backend. A transport failure during a
//! write is reported as [`RegistryError::Unavailable`] and the caller decides
//! whether to re-verify before re-submitting.

pub mod abi;
pub mod client;
pub mod config;
pub mod error;
pub mod evm;
pub mod memory;
pub mod record;
mod retry;
pub mod signer;

pub use client::RegistryClient;
pub use config::{ConfigError, RegistryConfig, SignerConfig, DEFAULT_RPC_URL};
pub use error::{CallContext, Operation, RegistryError};
pub use evm::EvmRegistryClient;
pub use memory::{DuplicatePolicy, InMemoryRegistry};
pub use record::{CredentialRecord, IssueReceipt};
pub use signer::{LegacyTransaction, LocalSigner, Signer};
