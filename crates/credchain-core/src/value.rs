//! # Credential Values
//!
//! `CredentialValue` is the closed data model for credential documents:
//! null, boolean, number, string, ordered sequences, and mappings with
//! unique string keys. No schema is enforced beyond that.
//!
//! Mappings are stored in a `BTreeMap`, so insertion order is never
//! observable. Parsing from text rejects duplicate keys instead of silently
//! keeping the last one, because two documents that differ only in which
//! duplicate survived would otherwise hash identically.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

use crate::canonical::MAX_SAFE_INTEGER;
use crate::error::ParseError;

/// A credential document or any sub-value of one.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CredentialValue {
    /// JSON `null`.
    #[default]
    Null,
    /// JSON boolean.
    Bool(bool),
    /// A finite number. Always finite by construction of `serde_json::Number`.
    Number(Number),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence.
    Sequence(Vec<CredentialValue>),
    /// A mapping with unique string keys.
    Mapping(BTreeMap<String, CredentialValue>),
}

impl CredentialValue {
    /// Parse a credential from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Malformed`] for invalid JSON, numbers outside the
    /// binary64 range, nesting beyond the parser's recursion limit, or a
    /// mapping that repeats a key.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build a number value from an `f64`. Returns `None` for NaN or infinity.
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self::Number)
    }

    /// Build a mapping from key/value pairs. Later pairs replace earlier ones.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, CredentialValue)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a key if this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&CredentialValue> {
        match self {
            Self::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries, if this is a mapping.
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, CredentialValue>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Convert into the `serde_json` value model.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for CredentialValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for CredentialValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for CredentialValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for CredentialValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for CredentialValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for CredentialValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<CredentialValue>> for CredentialValue {
    fn from(items: Vec<CredentialValue>) -> Self {
        Self::Sequence(items)
    }
}

impl Serialize for CredentialValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            // Integral binary64 values render without a fraction, as a
            // JavaScript producer would print them.
            Self::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER as f64 => {
                    serializer.serialize_i64(f as i64)
                }
                _ => n.serialize(serializer),
            },
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for CredentialValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CredentialValueVisitor)
    }
}

struct CredentialValueVisitor;

impl<'de> Visitor<'de> for CredentialValueVisitor {
    type Value = CredentialValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON credential value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(CredentialValue::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(CredentialValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E>(self, b: bool) -> Result<Self::Value, E> {
        Ok(CredentialValue::Bool(b))
    }

    fn visit_i64<E>(self, n: i64) -> Result<Self::Value, E> {
        Ok(CredentialValue::Number(n.into()))
    }

    fn visit_u64<E>(self, n: u64) -> Result<Self::Value, E> {
        Ok(CredentialValue::Number(n.into()))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> Result<Self::Value, E> {
        Number::from_f64(n)
            .map(CredentialValue::Number)
            .ok_or_else(|| E::custom(format!("non-finite number {n}")))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E> {
        Ok(CredentialValue::String(s.to_string()))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E> {
        Ok(CredentialValue::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(CredentialValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key {key:?}")));
            }
            let value = access.next_value()?;
            map.insert(key, value);
        }
        Ok(CredentialValue::Mapping(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_builds_nested_value() {
        let v = CredentialValue::parse(r#"{"a":[1,true,null,"x"],"b":{"c":2.5}}"#).unwrap();
        let a = v.get("a").unwrap();
        assert_eq!(
            a,
            &CredentialValue::Sequence(vec![
                CredentialValue::from(1u64),
                CredentialValue::Bool(true),
                CredentialValue::Null,
                CredentialValue::from("x"),
            ])
        );
        assert_eq!(
            v.get("b").and_then(|b| b.get("c")),
            CredentialValue::from_f64(2.5).as_ref()
        );
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(CredentialValue::parse("{\"a\":").is_err());
        assert!(CredentialValue::parse("not json").is_err());
    }

    #[test]
    fn parse_rejects_duplicate_keys() {
        let err = CredentialValue::parse(r#"{"a":1,"a":2}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn parse_rejects_out_of_range_number() {
        assert!(CredentialValue::parse("1e400").is_err());
    }

    #[test]
    fn from_f64_rejects_non_finite() {
        assert!(CredentialValue::from_f64(f64::NAN).is_none());
        assert!(CredentialValue::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn json_conversion_preserves_structure() {
        let json = serde_json::json!({"z": [1, {"y": null}], "a": "s"});
        let v = CredentialValue::from(json.clone());
        assert_eq!(v.to_json(), json);
    }

    #[test]
    fn serialize_matches_json_model() {
        let v = CredentialValue::mapping([("k", CredentialValue::from(false))]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"k":false}"#);
    }

    #[test]
    fn integral_floats_serialize_without_fraction() {
        let v = CredentialValue::Sequence(vec![
            CredentialValue::from_f64(9.0).unwrap(),
            CredentialValue::from_f64(-0.0).unwrap(),
            CredentialValue::from_f64(8.75).unwrap(),
        ]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[9,0,8.75]");
    }

    #[test]
    fn get_on_non_mapping_is_none() {
        assert!(CredentialValue::from("x").get("a").is_none());
        assert!(CredentialValue::Null.as_mapping().is_none());
    }
}
