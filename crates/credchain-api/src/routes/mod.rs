//! # Route Modules
//!
//! - [`compute`]: hashing, PDF extraction and CSV preview (no ledger).
//! - [`registry`]: verification, issuance and wallet listing.

pub mod compute;
pub mod registry;
