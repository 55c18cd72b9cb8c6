//! Override sources layered onto the canonical store.
//!
//! # Data Flow
//! ```text
//! defaults ─▶ document ─▶ environment ─▶ remote pairs (startup)
//!                                         remote pairs (every reconfiguration)
//! ```
//!
//! Each overlay visits the keys already present in the store and replaces a
//! value only when its source has an entry for that key and the entry
//! coerces to the key's existing kind. The insecure-secrets area is the
//! exception: its entries are inserted as strings whether or not the key
//! existed.

use std::collections::HashMap;

use crate::config::defaults::{LOG_LEVEL_KEY, REQUEST_TIMEOUT_KEY};
use crate::config::document::{Document, Node, Scalar};
use crate::config::remote::NameValuePairs;
use crate::config::schema::parse_duration;
use crate::config::store::{
    is_secret_value_key, CanonicalStore, INSECURE_SECRETS_NAME, INSECURE_SECRETS_PREFIX, SEPARATOR, WRITABLE_NAME,
};
use crate::config::value::{coerce, CoercionError, TypedValue, ValueTag};
use crate::observability::{metrics, LogLevel};

/// Where an override came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySource {
    Document,
    Environment,
    Remote,
}

impl OverlaySource {
    pub fn name(&self) -> &'static str {
        match self {
            OverlaySource::Document => "document",
            OverlaySource::Environment => "environment",
            OverlaySource::Remote => "remote",
        }
    }
}

/// An override that replaced a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOverride {
    pub key: String,
    pub text: String,
}

/// An override whose text did not coerce; the key kept its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOverride {
    pub key: String,
    pub error: CoercionError,
}

/// Outcome of one overlay pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayReport {
    pub source: OverlaySource,
    pub applied: Vec<AppliedOverride>,
    pub rejected: Vec<RejectedOverride>,
    /// Secret keys inserted (or overwritten) outside the override rule.
    pub inserted: Vec<String>,
}

impl OverlayReport {
    fn new(source: OverlaySource) -> Self {
        Self {
            source,
            applied: Vec::new(),
            rejected: Vec::new(),
            inserted: Vec::new(),
        }
    }

    /// True when the pass changed nothing and rejected nothing.
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.rejected.is_empty() && self.inserted.is_empty()
    }

    /// First rejection caused by a numeric value too wide for its key.
    pub fn first_out_of_range(&self) -> Option<&RejectedOverride> {
        self.rejected.iter().find(|r| r.error.is_out_of_range())
    }

    /// Emit diagnostics and counters for this pass.
    pub fn log(&self) {
        let source = self.source.name();
        for applied in &self.applied {
            let text = if is_secret_value_key(&applied.key) { "****" } else { applied.text.as_str() };
            if self.source == OverlaySource::Environment {
                tracing::info!("Override config {} = {}", applied.key, text);
            } else {
                tracing::debug!(source, key = %applied.key, value = %text, "Override config");
            }
        }
        for rejected in &self.rejected {
            tracing::warn!(source, key = %rejected.key, error = %rejected.error, "Ignoring configuration override");
            metrics::record_override_rejected(source);
        }
        for key in &self.inserted {
            tracing::debug!(source, key = %key, "Added insecure secret");
        }
        metrics::record_overrides_applied(source, self.applied.len() + self.inserted.len());
    }
}

/// Visit every existing key; `lookup` returns the source text and its
/// coercion when the source has an entry for the key.
fn overlay_existing<F>(store: &mut CanonicalStore, source: OverlaySource, mut lookup: F) -> OverlayReport
where
    F: FnMut(&str, &TypedValue) -> Option<(String, Result<TypedValue, CoercionError>)>,
{
    let mut report = OverlayReport::new(source);
    for (key, value) in store.iter_mut() {
        let Some((text, coerced)) = lookup(key, value) else {
            continue;
        };
        match coerced.and_then(|new_value| check_setting(key, new_value)) {
            Ok(new_value) => {
                *value = new_value;
                report.applied.push(AppliedOverride { key: key.clone(), text });
            }
            Err(error) => report.rejected.push(RejectedOverride { key: key.clone(), error }),
        }
    }
    report
}

/// Settings whose text must also parse as something richer than their kind.
/// A rejected value leaves the previous one in place.
fn check_setting(key: &str, value: TypedValue) -> Result<TypedValue, CoercionError> {
    let Some(text) = value.as_str() else {
        return Ok(value);
    };
    let reason = match key {
        REQUEST_TIMEOUT_KEY => parse_duration(text).err().map(|e| e.to_string()),
        LOG_LEVEL_KEY => text.parse::<LogLevel>().err().map(|e| e.to_string()),
        _ => None,
    };
    match reason {
        Some(reason) => Err(CoercionError::Unacceptable {
            text: text.to_string(),
            reason,
        }),
        None => Ok(value),
    }
}

/// Coerce a document scalar. Strings are only accepted for string keys and
/// non-string scalars only for non-string keys.
pub fn coerce_scalar(tag: ValueTag, scalar: &Scalar) -> Result<TypedValue, CoercionError> {
    match (tag, scalar) {
        (ValueTag::String, Scalar::String(s)) => Ok(TypedValue::String(s.clone())),
        (ValueTag::String, other) => Err(CoercionError::NotAString { text: other.literal() }),
        (tag, Scalar::String(s)) => Err(CoercionError::UnexpectedString { tag, text: s.clone() }),
        (tag, other) => coerce(tag, &other.literal()),
    }
}

/// Apply a structured document, then import its insecure secrets.
pub fn overlay_document(store: &mut CanonicalStore, document: &Document) -> OverlayReport {
    let mut report = overlay_existing(store, OverlaySource::Document, |key, current| {
        let scalar = document.find(key)?;
        Some((scalar.literal(), coerce_scalar(current.tag(), scalar)))
    });
    report.inserted = import_document_secrets(store, document);
    report
}

/// Copy `Writable.InsecureSecrets.<name>.{path, Secrets}` into the store.
fn import_document_secrets(store: &mut CanonicalStore, document: &Document) -> Vec<String> {
    let mut inserted = Vec::new();
    let Some(secrets) = document
        .root()
        .table(WRITABLE_NAME)
        .and_then(|writable| writable.table(INSECURE_SECRETS_NAME))
    else {
        return inserted;
    };

    for (name, entry) in secrets.entries() {
        let Some(path) = entry
            .scalar("path")
            .and_then(Scalar::as_str)
            .filter(|p| !p.is_empty())
        else {
            continue;
        };
        let Some(values) = entry.table("Secrets") else {
            continue;
        };

        for (secret, value) in values.entries() {
            let Node::Scalar(Scalar::String(value)) = value else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let key = format!("{}{}{}Secrets{}{}", INSECURE_SECRETS_PREFIX, name, SEPARATOR, SEPARATOR, secret);
            store.insert(key.clone(), value.as_str());
            inserted.push(key);
        }

        let key = format!("{}{}{}path", INSECURE_SECRETS_PREFIX, name, SEPARATOR);
        store.insert(key.clone(), path);
        inserted.push(key);
    }
    inserted
}

/// Process environment lookup.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// `Service/Port` → `SERVICE_PORT`
pub fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| if c == SEPARATOR { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

/// Apply environment variables named after each key.
pub fn overlay_environment(store: &mut CanonicalStore, env: &dyn EnvSource) -> OverlayReport {
    overlay_existing(store, OverlaySource::Environment, |key, current| {
        let text = env.var(&env_var_name(key))?;
        let coerced = current.coerce(&text);
        Some((text, coerced))
    })
}

/// Apply remote pairs, then insert any insecure-secret pairs verbatim.
pub fn overlay_remote(store: &mut CanonicalStore, pairs: &NameValuePairs) -> OverlayReport {
    let mut report = overlay_existing(store, OverlaySource::Remote, |key, current| {
        let text = pairs.get(key)?;
        Some((text.to_string(), current.coerce(text)))
    });

    for (name, value) in pairs.iter() {
        if !name.starts_with(INSECURE_SECRETS_PREFIX) || report.applied.iter().any(|a| a.key == name) {
            continue;
        }
        store.insert(name, value);
        report.inserted.push(name.to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CanonicalStore {
        [
            ("Service/Host", TypedValue::from("localhost")),
            ("Service/Port", TypedValue::UInt16(59999)),
            ("Writable/Device/DataTransform", TypedValue::Bool(true)),
            ("Writable/Device/MaxCmdOps", TypedValue::UInt32(0)),
        ]
        .into_iter()
        .collect()
    }

    fn tags(store: &CanonicalStore) -> Vec<(String, ValueTag)> {
        store.iter().map(|(k, v)| (k.clone(), v.tag())).collect()
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("Service/Port"), "SERVICE_PORT");
        assert_eq!(env_var_name("Writable/Device/Discovery/Enabled"), "WRITABLE_DEVICE_DISCOVERY_ENABLED");
        assert_eq!(env_var_name("Driver/core-metadata"), "DRIVER_CORE-METADATA");
    }

    #[test]
    fn test_document_overlay_coerces_to_existing_kind() {
        let mut store = store();
        let before = tags(&store);
        let doc = Document::parse(
            r#"
            [Service]
            Host = "gateway"
            Port = "8080"

            [Writable.Device]
            DataTransform = false
            MaxCmdOps = 128
            "#,
        )
        .unwrap();

        let report = overlay_document(&mut store, &doc);

        assert_eq!(store.get("Service/Host"), Some(&TypedValue::from("gateway")));
        assert_eq!(store.get("Service/Port"), Some(&TypedValue::UInt16(59999)));
        assert_eq!(store.get("Writable/Device/DataTransform"), Some(&TypedValue::Bool(false)));
        assert_eq!(store.get("Writable/Device/MaxCmdOps"), Some(&TypedValue::UInt32(128)));
        assert_eq!(report.applied.len(), 3);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].key, "Service/Port");
        assert_eq!(tags(&store), before);
    }

    #[test]
    fn test_unacceptable_settings_keep_previous_value() {
        let mut store = store();
        store.insert(REQUEST_TIMEOUT_KEY, "5s");
        store.insert(LOG_LEVEL_KEY, "INFO");
        let vars: HashMap<String, String> = [
            ("SERVICE_REQUESTTIMEOUT", "soon"),
            ("WRITABLE_LOGLEVEL", "LOUD"),
            ("SERVICE_HOST", "gateway"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let report = overlay_environment(&mut store, &vars);

        assert_eq!(store.get(REQUEST_TIMEOUT_KEY), Some(&TypedValue::from("5s")));
        assert_eq!(store.get(LOG_LEVEL_KEY), Some(&TypedValue::from("INFO")));
        assert_eq!(store.get("Service/Host"), Some(&TypedValue::from("gateway")));
        assert_eq!(report.rejected.len(), 2);
        assert!(report.first_out_of_range().is_none());
        assert!(matches!(report.rejected[0].error, CoercionError::Unacceptable { .. }));
    }

    #[test]
    fn test_document_secrets_are_inserted() {
        let mut store = store();
        let doc = Document::parse(
            r#"
            [Writable.InsecureSecrets.foo]
            path = "foo-path"
            [Writable.InsecureSecrets.foo.Secrets]
            username = "admin"
            password = ""
            retries = 3

            [Writable.InsecureSecrets.nopath.Secrets]
            username = "ignored"

            [Writable.InsecureSecrets.nosecrets]
            path = "ignored"
            "#,
        )
        .unwrap();

        let report = overlay_document(&mut store, &doc);

        assert_eq!(
            store.get("Writable/InsecureSecrets/foo/path"),
            Some(&TypedValue::from("foo-path"))
        );
        assert_eq!(
            store.get("Writable/InsecureSecrets/foo/Secrets/username"),
            Some(&TypedValue::from("admin"))
        );
        assert!(!store.contains_key("Writable/InsecureSecrets/foo/Secrets/password"));
        assert!(!store.contains_key("Writable/InsecureSecrets/foo/Secrets/retries"));
        assert!(!store.contains_key("Writable/InsecureSecrets/nopath/Secrets/username"));
        assert!(!store.contains_key("Writable/InsecureSecrets/nosecrets/path"));
        assert_eq!(report.inserted.len(), 2);
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn test_environment_overlay() {
        let mut store = store();
        let env: HashMap<String, String> = [
            ("SERVICE_PORT".to_string(), "8080".to_string()),
            ("WRITABLE_DEVICE_MAXCMDOPS".to_string(), "lots".to_string()),
            ("Service/Host".to_string(), "not-used".to_string()),
        ]
        .into_iter()
        .collect();

        let report = overlay_environment(&mut store, &env);

        assert_eq!(store.get("Service/Port"), Some(&TypedValue::UInt16(8080)));
        assert_eq!(store.get("Service/Host"), Some(&TypedValue::from("localhost")));
        assert_eq!(store.get("Writable/Device/MaxCmdOps"), Some(&TypedValue::UInt32(0)));
        assert_eq!(report.rejected.len(), 1);
        assert!(report.first_out_of_range().is_none());
    }

    #[test]
    fn test_remote_overlay_and_secret_pairs() {
        let mut store = store();
        let pairs: NameValuePairs = [
            ("Service/Port", "70000"),
            ("Writable/Device/DataTransform", "false"),
            ("Writable/InsecureSecrets/mqtt/Secrets/password", "s3cret"),
            ("Writable/Unknown", "ignored"),
        ]
        .into_iter()
        .collect();

        let report = overlay_remote(&mut store, &pairs);

        assert_eq!(store.get("Service/Port"), Some(&TypedValue::UInt16(59999)));
        assert_eq!(store.get("Writable/Device/DataTransform"), Some(&TypedValue::Bool(false)));
        assert_eq!(
            store.get("Writable/InsecureSecrets/mqtt/Secrets/password"),
            Some(&TypedValue::from("s3cret"))
        );
        assert!(!store.contains_key("Writable/Unknown"));
        assert_eq!(report.first_out_of_range().map(|r| r.key.as_str()), Some("Service/Port"));
        assert_eq!(report.inserted, vec!["Writable/InsecureSecrets/mqtt/Secrets/password"]);

        let again = overlay_remote(&mut store, &pairs);
        assert!(again.inserted.is_empty());
        assert!(again
            .applied
            .iter()
            .any(|a| a.key == "Writable/InsecureSecrets/mqtt/Secrets/password"));
    }

    #[test]
    fn test_sources_without_matches_leave_store_unchanged() {
        let mut store = store();
        let before = store.clone();

        let doc = Document::parse("[Other]\nKey = 1\n").unwrap();
        assert!(overlay_document(&mut store, &doc).is_empty());
        assert!(overlay_environment(&mut store, &HashMap::<String, String>::new()).is_empty());
        let pairs: NameValuePairs = [("Nothing/Here", "1")].into_iter().collect();
        assert!(overlay_remote(&mut store, &pairs).is_empty());

        assert_eq!(store, before);
    }
}
