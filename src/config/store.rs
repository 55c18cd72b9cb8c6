//! The canonical configuration store.
//!
//! A flat map from slash-separated keys (`Service/Port`,
//! `Writable/Telemetry/Interval`) to typed scalars. Every overlay reads and
//! writes this map; the structured configuration is projected from it.

use std::collections::btree_map::{self, BTreeMap};

use serde::Serialize;

use crate::config::error::ConfigError;
use crate::config::value::{TypedValue, ValueTag};

/// Segment separator inside canonical keys.
pub const SEPARATOR: char = '/';

/// Root of the hot-reloadable namespace.
pub const WRITABLE_NAME: &str = "Writable";
/// Root of the driver-owned namespace.
pub const DRIVER_NAME: &str = "Driver";
/// Insecure secrets table under the writable namespace.
pub const INSECURE_SECRETS_NAME: &str = "InsecureSecrets";

pub const WRITABLE_PREFIX: &str = "Writable/";
pub const DRIVER_PREFIX: &str = "Driver/";
pub const WRITABLE_DRIVER_PREFIX: &str = "Writable/Driver/";
pub const INSECURE_SECRETS_PREFIX: &str = "Writable/InsecureSecrets/";

/// Ordered mapping of canonical keys to typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalStore {
    entries: BTreeMap<String, TypedValue>,
}

impl CanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry, returning the previous value.
    ///
    /// This is the insertion path: it does not check the previous kind.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TypedValue>) -> Option<TypedValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, TypedValue> {
        self.entries.iter()
    }

    /// Mutable access to every value; keys stay fixed.
    pub(crate) fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, TypedValue> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Look up a key that must exist.
    pub fn require(&self, key: &str) -> Result<&TypedValue, ConfigError> {
        self.entries.get(key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| wrong_type(key, ValueTag::String, value))
    }

    pub fn require_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| wrong_type(key, ValueTag::Bool, value))
    }

    pub fn require_u16(&self, key: &str) -> Result<u16, ConfigError> {
        let value = self.require(key)?;
        value.as_u16().ok_or_else(|| wrong_type(key, ValueTag::UInt16, value))
    }

    pub fn require_u32(&self, key: &str) -> Result<u32, ConfigError> {
        let value = self.require(key)?;
        value.as_u32().ok_or_else(|| wrong_type(key, ValueTag::UInt32, value))
    }

    pub fn require_u64(&self, key: &str) -> Result<u64, ConfigError> {
        let value = self.require(key)?;
        value.as_u64().ok_or_else(|| wrong_type(key, ValueTag::UInt64, value))
    }

    /// Log every entry at debug level. Secret values are masked.
    pub fn dump(&self) {
        for (key, value) in &self.entries {
            if is_secret_value_key(key) {
                tracing::debug!("{}=****", key);
            } else {
                tracing::debug!("{}={}", key, value);
            }
        }
    }
}

fn wrong_type(key: &str, expected: ValueTag, found: &TypedValue) -> ConfigError {
    ConfigError::WrongType {
        key: key.to_string(),
        expected,
        found: found.tag(),
    }
}

/// `Writable/InsecureSecrets/<name>/Secrets/<secretKey>`
pub(crate) fn is_secret_value_key(key: &str) -> bool {
    key.strip_prefix(INSECURE_SECRETS_PREFIX)
        .and_then(|rest| rest.split_once(SEPARATOR))
        .is_some_and(|(_, tail)| tail.starts_with("Secrets/"))
}

impl<K: Into<String>, V: Into<TypedValue>> FromIterator<(K, V)> for CanonicalStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CanonicalStore {
    type Item = (&'a String, &'a TypedValue);
    type IntoIter = btree_map::Iter<'a, String, TypedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
