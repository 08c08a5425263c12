//! # credchain-engine: Verification and Issuance Workflows
//!
//! Builds on [`credchain_core`] (canonical hashing) and
//! [`credchain_registry`] (ledger access):
//!
//! - [`verify`]: scan a subject's ledger for a credential hash, and list a
//!   subject's records.
//! - [`template`]: the degree credential template and CSV row parsing.
//! - [`batch`]: compute-only batch preparation and sequential batch
//!   issuance with per-row reporting.
//! - [`extract`]: label heuristics over certificate text, and the PDF text
//!   source (feature `pdf`).

pub mod batch;
pub mod error;
pub mod extract;
pub mod template;
pub mod verify;

pub use batch::{
    prepare_batch, BatchPipeline, BatchReport, BatchSummary, FailurePolicy, PreparedCredential,
    RowOutcome, RowStatus,
};
pub use error::{ExtractError, InputError, RowError, VerifyError};
#[cfg(feature = "pdf")]
pub use extract::PdfExtractText;
pub use extract::{credential_from_text, extract_fields, ExtractedCredential, PdfTextExtractor};
pub use template::{parse_csv_rows, CsvRow, DegreeCredentialTemplate, DocumentFields, RowCredential};
pub use verify::{
    IndexedRecord, MatchedRecord, ScanControl, VerificationEngine, VerificationOutcome, VerifyTarget,
};
