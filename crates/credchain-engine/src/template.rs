//! # Degree Credential Template
//!
//! Builds the W3C-shaped degree credential from tabular rows or from fields
//! lifted out of document text. The envelope (`@context`, `type`, `issuer`,
//! `issuanceDate`) is fixed per template; only `credentialSubject` varies.
//!
//! Row fields are copied verbatim. A column absent from the CSV header is
//! omitted from the credential rather than emitted as `null`, so that the
//! hash matches producers that drop undefined members.

use std::collections::BTreeMap;

use credchain_core::{Address, CredentialValue, Timestamp};

use crate::error::InputError;

/// Default issuer DID.
pub const DEFAULT_ISSUER: &str = "did:web:university.example";

/// W3C Verifiable Credentials 2.0 context.
pub const CREDENTIALS_V2_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";

/// One data row of a CSV batch, keyed by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based position among data rows.
    pub row: usize,
    fields: BTreeMap<String, String>,
}

impl CsvRow {
    /// Build a row from header/value pairs.
    pub fn new<K, V, I>(row: usize, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            row,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Value of a column, if the header has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// Parse CSV text with a header row. Empty lines are skipped; a record with
/// the wrong number of fields is an error.
pub fn parse_csv_rows(text: &str) -> Result<Vec<CsvRow>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        rows.push(CsvRow::new(i + 1, headers.iter().zip(record.iter())));
    }
    Ok(rows)
}

/// A credential built from one row, with its validated subject.
#[derive(Debug, Clone, PartialEq)]
pub struct RowCredential {
    /// 1-based data row.
    pub row: usize,
    /// Subject address exactly as written in the row.
    pub address: String,
    /// Parsed subject identity.
    pub subject: Address,
    /// The credential document.
    pub vc: CredentialValue,
}

/// Fields recovered from a degree certificate's text.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFields {
    pub name: String,
    pub subject_id: String,
    pub degree: String,
    pub major: String,
    pub gpa: f64,
}

/// Envelope settings for degree credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeCredentialTemplate {
    /// Issuer DID placed in `issuer`.
    pub issuer: String,
    /// `@context` entries.
    pub context: Vec<String>,
    /// `type` entries.
    pub types: Vec<String>,
}

impl Default for DegreeCredentialTemplate {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            context: vec![CREDENTIALS_V2_CONTEXT.to_string()],
            types: vec!["VerifiableCredential".to_string(), "DegreeCredential".to_string()],
        }
    }
}

impl DegreeCredentialTemplate {
    /// Replace the issuer DID.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Build the credential for one CSV row.
    ///
    /// # Errors
    ///
    /// [`InputError::MissingField`] or [`InputError::InvalidAddress`] when the
    /// subject cannot be determined; [`InputError::InvalidNumber`] for a
    /// non-numeric `gpa`. An empty `gpa` is recorded as `0`.
    pub fn from_row(&self, row: &CsvRow, issued_at: Timestamp) -> Result<RowCredential, InputError> {
        let address = row.get("address").ok_or(InputError::MissingField {
            row: row.row,
            field: "address",
        })?;
        let subject: Address = address.parse().map_err(|source| InputError::InvalidAddress {
            row: row.row,
            value: address.to_string(),
            source,
        })?;

        let mut degree = BTreeMap::new();
        for (key, column) in [("name", "degree"), ("major", "major"), ("dateAwarded", "dateAwarded")] {
            if let Some(value) = row.get(column) {
                degree.insert(key.to_string(), CredentialValue::from(value));
            }
        }

        let mut credential_subject = BTreeMap::new();
        credential_subject.insert("id".to_string(), CredentialValue::from(address));
        for column in ["givenName", "familyName"] {
            if let Some(value) = row.get(column) {
                credential_subject.insert(column.to_string(), CredentialValue::from(value));
            }
        }
        credential_subject.insert("degree".to_string(), CredentialValue::Mapping(degree));
        credential_subject.insert("gpa".to_string(), parse_gpa(row)?);

        Ok(RowCredential {
            row: row.row,
            address: address.to_string(),
            subject,
            vc: self.envelope(issued_at, CredentialValue::Mapping(credential_subject)),
        })
    }

    /// Build the credential for fields extracted from a certificate.
    pub fn from_document(&self, fields: &DocumentFields, issued_at: Timestamp) -> CredentialValue {
        let degree = CredentialValue::mapping([
            ("name", CredentialValue::from(fields.degree.as_str())),
            ("major", CredentialValue::from(fields.major.as_str())),
        ]);
        let subject = CredentialValue::mapping([
            ("id", CredentialValue::from(fields.subject_id.as_str())),
            ("name", CredentialValue::from(fields.name.as_str())),
            ("degree", degree),
            ("gpa", number_or_zero(fields.gpa)),
        ]);
        self.envelope(issued_at, subject)
    }

    fn envelope(&self, issued_at: Timestamp, credential_subject: CredentialValue) -> CredentialValue {
        let strings = |items: &[String]| {
            CredentialValue::Sequence(items.iter().map(|s| CredentialValue::from(s.as_str())).collect())
        };
        CredentialValue::mapping([
            ("@context", strings(&self.context)),
            ("type", strings(&self.types)),
            ("issuer", CredentialValue::from(self.issuer.as_str())),
            ("issuanceDate", CredentialValue::from(issued_at.to_iso8601())),
            ("credentialSubject", credential_subject),
        ])
    }
}

fn parse_gpa(row: &CsvRow) -> Result<CredentialValue, InputError> {
    let raw = row.get("gpa").map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Ok(number_or_zero(0.0));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(CredentialValue::from_f64)
        .ok_or_else(|| InputError::InvalidNumber {
            row: row.row,
            field: "gpa",
            value: raw.to_string(),
        })
}

fn number_or_zero(value: f64) -> CredentialValue {
    CredentialValue::from_f64(value)
        .unwrap_or_else(|| CredentialValue::Number(serde_json::Number::from(0)))
}
