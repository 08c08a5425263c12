//! Degree certificate text extraction.
//!
//! Label heuristics over the text of a certificate: each field takes the
//! first non-empty line containing any of its labels (case-insensitive), and
//! the value is whatever follows the first `:` on that line, or the whole
//! line when there is no colon.
//!
//! Every field except the subject has a fallback. The subject identity must
//! be present and parse as an account address; there is no default account.

use credchain_core::{credential_hash, Address, CanonicalBytes, CredentialHash, CredentialValue, Timestamp};

use crate::error::ExtractError;
use crate::template::{DegreeCredentialTemplate, DocumentFields};

const NAME_LABELS: &[&str] = &["name", "student name", "candidate name"];
const SUBJECT_LABELS: &[&str] = &["reg no", "registration no", "roll no", "student id"];
const DEGREE_LABELS: &[&str] = &["degree", "programme", "course"];
const MAJOR_LABELS: &[&str] = &["branch", "department", "major"];
const GPA_LABELS: &[&str] = &["cgpa", "gpa", "sgpa"];

const DEFAULT_NAME: &str = "Unknown Student";
const DEFAULT_DEGREE: &str = "Bachelor of Technology";
const DEFAULT_MAJOR: &str = "Computer Science";

/// Source of plain text for a PDF document.
pub trait PdfTextExtractor: Send + Sync {
    /// Extract the document's text.
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractError>;
}

/// Text extraction backed by the `pdf-extract` crate.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractText;

#[cfg(feature = "pdf")]
impl PdfTextExtractor for PdfExtractText {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(pdf).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

/// A credential derived from document text, ready to issue.
#[derive(Debug, Clone)]
pub struct ExtractedCredential {
    pub subject: Address,
    pub fields: DocumentFields,
    pub vc: CredentialValue,
    pub canonical: CanonicalBytes,
    pub hash: CredentialHash,
}

/// Recover certificate fields from text.
pub fn extract_fields(text: &str) -> Result<DocumentFields, ExtractError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let subject_id = find_labelled(&lines, SUBJECT_LABELS)
        .ok_or(ExtractError::SubjectNotFound { candidate: None })?;

    Ok(DocumentFields {
        name: find_labelled(&lines, NAME_LABELS).unwrap_or_else(|| DEFAULT_NAME.to_string()),
        subject_id,
        degree: find_labelled(&lines, DEGREE_LABELS).unwrap_or_else(|| DEFAULT_DEGREE.to_string()),
        major: find_labelled(&lines, MAJOR_LABELS).unwrap_or_else(|| DEFAULT_MAJOR.to_string()),
        gpa: find_labelled(&lines, GPA_LABELS).map_or(0.0, |raw| leading_number(&raw)),
    })
}

/// Build, canonicalize and hash the credential described by `text`.
///
/// # Errors
///
/// [`ExtractError::SubjectNotFound`] when no subject line exists or its value
/// is not an account address.
pub fn credential_from_text(
    text: &str,
    template: &DegreeCredentialTemplate,
    issued_at: Timestamp,
) -> Result<ExtractedCredential, ExtractError> {
    let fields = extract_fields(text)?;
    let subject: Address = fields
        .subject_id
        .parse()
        .map_err(|_| ExtractError::SubjectNotFound {
            candidate: Some(fields.subject_id.clone()),
        })?;
    let vc = template.from_document(&fields, issued_at);
    let (canonical, hash) = credential_hash(&vc)?;
    tracing::debug!(%subject, %hash, "credential extracted from document text");
    Ok(ExtractedCredential {
        subject,
        fields,
        vc,
        canonical,
        hash,
    })
}

fn find_labelled(lines: &[&str], labels: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| {
            let lower = line.to_lowercase();
            labels.iter().any(|label| lower.contains(label))
        })
        .map(|line| {
            let mut parts = line.split(':');
            let head = parts.next().unwrap_or_default();
            match parts.next() {
                Some(value) if !value.is_empty() => value.trim().to_string(),
                _ => head.trim().to_string(),
            }
        })
        .filter(|value| !value.is_empty())
}

/// First run of digits and dots, read as a decimal number. A run that does
/// not form a number yields 0.
fn leading_number(raw: &str) -> f64 {
    let Some(start) = raw.find(|c: char| c.is_ascii_digit() || c == '.') else {
        return 0.0;
    };
    let run: &str = raw[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()
        .unwrap_or_default();
    // Everything up to a second dot, as in "8.5.1" -> 8.5.
    let end = run
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .nth(1)
        .map_or(run.len(), |(i, _)| i);
    run[..end].parse().unwrap_or(0.0)
}
