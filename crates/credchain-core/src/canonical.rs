//! # Canonical Serialization
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used as a credential hash preimage.
//!
//! ## Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which walks a
//! [`CredentialValue`] structurally. Any function that hashes a credential
//! must accept `&CanonicalBytes`, so hashing a non-canonical rendering is a
//! type error rather than a silent interop bug.
//!
//! ## Rules
//!
//! 1. **Mappings**: keys sorted by ascending Unicode code point, values
//!    canonicalized recursively.
//! 2. **Sequences**: element order preserved, elements canonicalized.
//! 3. **Strings**: RFC 8259 minimal escaping, UTF-8 output.
//! 4. **Numbers**: every number is treated as an IEEE-754 binary64 value and
//!    rendered with the ECMAScript `Number::toString` algorithm (RFC 8785
//!    §3.2.2.3) via `serde_jcs`. `1.0` becomes `1`, `1e21` becomes `1e+21`.
//!    `-0` renders as `0`. Integer literals with magnitude above 2^53 - 1
//!    are rejected: they cannot survive a binary64 round trip and would hash
//!    differently in producers that parse numbers as doubles.
//! 5. **Layout**: compact separators, no insignificant whitespace.
//!
//! For credential-shaped documents the output equals `JSON.stringify` of a
//! recursively key-sorted object, which is what existing JavaScript producers
//! hash. It differs for integer-like keys: JavaScript enumerates array-index
//! keys (`"2"`, `"10"`) first and in numeric order, while rule 1 places
//! `"10"` before `"2"`. Code-point order is kept regardless of key shape.

use serde_json::Number;

use crate::error::CanonicalizationError;
use crate::value::CredentialValue;

/// Maximum nesting depth accepted by the canonicalizer.
pub const MAX_DEPTH: usize = 128;

/// Largest integer magnitude that binary64 represents exactly along with all
/// of its neighbours (`Number.MAX_SAFE_INTEGER`).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Bytes produced exclusively by structural canonicalization of a
/// [`CredentialValue`].
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Mapping keys are sorted, separators are compact.
/// - Numbers follow the pinned binary64 rendering policy.
/// - The content is valid UTF-8 JSON that parses back to an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Canonicalize a credential value.
    ///
    /// # Errors
    ///
    /// - [`CanonicalizationError::DepthExceeded`] when nesting exceeds [`MAX_DEPTH`].
    /// - [`CanonicalizationError::UnsafeInteger`] for integers beyond 2^53 - 1.
    pub fn new(value: &CredentialValue) -> Result<Self, CanonicalizationError> {
        let mut out = String::new();
        write_value(&mut out, value, 0)?;
        Ok(Self(out))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The canonical form as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the canonical text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for CanonicalBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_value(
    out: &mut String,
    value: &CredentialValue,
    depth: usize,
) -> Result<(), CanonicalizationError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalizationError::DepthExceeded { max: MAX_DEPTH });
    }
    match value {
        CredentialValue::Null => out.push_str("null"),
        CredentialValue::Bool(true) => out.push_str("true"),
        CredentialValue::Bool(false) => out.push_str("false"),
        CredentialValue::Number(n) => out.push_str(&format_number(n)?),
        CredentialValue::String(s) => out.push_str(&serde_jcs::to_string(s)?),
        CredentialValue::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        CredentialValue::Mapping(map) => {
            // BTreeMap<String, _> iterates in byte order, which for UTF-8 is
            // code-point order.
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_jcs::to_string(key)?);
                out.push(':');
                write_value(out, item, depth + 1)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Render a number under the pinned binary64 policy.
fn format_number(n: &Number) -> Result<String, CanonicalizationError> {
    if let Some(i) = n.as_i64() {
        if i.unsigned_abs() > MAX_SAFE_INTEGER {
            return Err(CanonicalizationError::UnsafeInteger(n.to_string()));
        }
    } else if let Some(u) = n.as_u64() {
        if u > MAX_SAFE_INTEGER {
            return Err(CanonicalizationError::UnsafeInteger(n.to_string()));
        }
    }
    let f = n.as_f64().ok_or(CanonicalizationError::NonFiniteNumber)?;
    if !f.is_finite() {
        return Err(CanonicalizationError::NonFiniteNumber);
    }
    if f == 0.0 {
        // -0 and 0 share one rendering.
        return Ok("0".to_string());
    }
    Ok(serde_jcs::to_string(&f)?)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn arb_leaf() -> impl Strategy<Value = CredentialValue> {
        prop_oneof![
            Just(CredentialValue::Null),
            any::<bool>().prop_map(CredentialValue::Bool),
            (-1_000_000i64..1_000_000).prop_map(CredentialValue::from),
            (-1.0e6f64..1.0e6).prop_filter_map("finite", CredentialValue::from_f64),
            "[a-zA-Z0-9 é\\\\\"\n]{0,12}".prop_map(CredentialValue::from),
        ]
    }

    fn arb_value() -> impl Strategy<Value = CredentialValue> {
        arb_leaf().prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(CredentialValue::Sequence),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(CredentialValue::Mapping),
            ]
        })
    }

    /// Render a mapping with keys in reverse order, as a producer with a
    /// different insertion order would.
    fn reversed_json(value: &CredentialValue) -> String {
        match value {
            CredentialValue::Mapping(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .rev()
                    .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), reversed_json(v)))
                    .collect();
                format!("{{{}}}", entries.join(","))
            }
            CredentialValue::Sequence(items) => {
                let items: Vec<String> = items.iter().map(reversed_json).collect();
                format!("[{}]", items.join(","))
            }
            other => serde_json::to_string(other).unwrap(),
        }
    }

    proptest! {
        #[test]
        fn canonicalization_is_idempotent(v in arb_value()) {
            let once = CanonicalBytes::new(&v).unwrap();
            let reparsed = CredentialValue::parse(once.as_str()).unwrap();
            let twice = CanonicalBytes::new(&reparsed).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn insertion_order_is_irrelevant(v in arb_value()) {
            let forward = CanonicalBytes::new(&v).unwrap();
            let reversed = CredentialValue::parse(&reversed_json(&v)).unwrap();
            prop_assert_eq!(forward, CanonicalBytes::new(&reversed).unwrap());
        }

        #[test]
        fn canonical_text_is_valid_json(v in arb_value()) {
            let cb = CanonicalBytes::new(&v).unwrap();
            prop_assert!(serde_json::from_str::<serde_json::Value>(cb.as_str()).is_ok());
        }

        #[test]
        fn distinct_string_leaves_differ(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            prop_assume!(a != b);
            let mut left = BTreeMap::new();
            left.insert("k".to_string(), CredentialValue::from(a));
            let mut right = BTreeMap::new();
            right.insert("k".to_string(), CredentialValue::from(b));
            prop_assert_ne!(
                CanonicalBytes::new(&CredentialValue::Mapping(left)).unwrap(),
                CanonicalBytes::new(&CredentialValue::Mapping(right)).unwrap()
            );
        }
    }
}
