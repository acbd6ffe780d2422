//! Cache Key Module
//!
//! Maps application keys to canonical storage keys.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::error::{CacheError, Result};

/// Longest plain key that is stored unhashed
pub const MAX_PLAIN_KEY_LENGTH: usize = 32;

// == Cache Key ==
/// An application-supplied cache key.
///
/// Composite keys serialize in a fixed order: sequences by position,
/// mappings by sorted field name.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Seq(Vec<CacheKey>),
    Map(BTreeMap<String, CacheKey>),
}

impl CacheKey {
    /// Builds a sequence key from any iterable of key parts.
    pub fn seq<I, K>(parts: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<CacheKey>,
    {
        CacheKey::Seq(parts.into_iter().map(Into::into).collect())
    }

    /// Builds a mapping key from name/part pairs.
    pub fn map<I, S, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, K)>,
        S: Into<String>,
        K: Into<CacheKey>,
    {
        CacheKey::Map(
            fields
                .into_iter()
                .map(|(name, part)| (name.into(), part.into()))
                .collect(),
        )
    }

    // == Canonical Form ==
    /// Converts the key into a JSON value with stable ordering.
    fn to_canonical(&self) -> Result<Value> {
        Ok(match self {
            CacheKey::Str(s) => Value::String(s.clone()),
            CacheKey::Int(i) => Value::Number((*i).into()),
            CacheKey::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                CacheError::InvalidKey(format!("non-finite number {} in key", f))
            })?,
            CacheKey::Bool(b) => Value::Bool(*b),
            CacheKey::Null => Value::Null,
            CacheKey::Seq(parts) => Value::Array(
                parts
                    .iter()
                    .map(CacheKey::to_canonical)
                    .collect::<Result<Vec<_>>>()?,
            ),
            CacheKey::Map(fields) => {
                let mut map = Map::new();
                for (name, part) in fields {
                    map.insert(name.clone(), part.to_canonical()?);
                }
                Value::Object(map)
            }
        })
    }
}

// == Conversions ==
impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey::Str(value.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey::Str(value)
    }
}

impl From<&String> for CacheKey {
    fn from(value: &String) -> Self {
        CacheKey::Str(value.clone())
    }
}

impl From<i64> for CacheKey {
    fn from(value: i64) -> Self {
        CacheKey::Int(value)
    }
}

impl From<i32> for CacheKey {
    fn from(value: i32) -> Self {
        CacheKey::Int(value.into())
    }
}

impl From<u32> for CacheKey {
    fn from(value: u32) -> Self {
        CacheKey::Int(value.into())
    }
}

impl From<f64> for CacheKey {
    fn from(value: f64) -> Self {
        CacheKey::Float(value)
    }
}

impl From<bool> for CacheKey {
    fn from(value: bool) -> Self {
        CacheKey::Bool(value)
    }
}

impl<K: Into<CacheKey>> From<Vec<K>> for CacheKey {
    fn from(parts: Vec<K>) -> Self {
        CacheKey::seq(parts)
    }
}

impl<K: Into<CacheKey>> From<BTreeMap<String, K>> for CacheKey {
    fn from(fields: BTreeMap<String, K>) -> Self {
        CacheKey::map(fields)
    }
}

// == Normalize ==
/// Returns the canonical storage key for `key`.
///
/// Integers become their decimal form and short alphanumeric strings pass
/// through. Anything else is the MD5 hex digest of its canonical JSON.
pub fn normalize(key: &CacheKey) -> Result<String> {
    match key {
        CacheKey::Int(i) => return Ok(i.to_string()),
        CacheKey::Str(s) if is_plain(s) => return Ok(s.clone()),
        _ => {}
    }

    let canonical = key.to_canonical()?;
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| CacheError::InvalidKey(format!("cannot serialize key: {}", e)))?;

    Ok(format!("{:x}", md5::compute(bytes)))
}

fn is_plain(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_PLAIN_KEY_LENGTH
        && key.bytes().all(|b| b.is_ascii_alphanumeric())
}
