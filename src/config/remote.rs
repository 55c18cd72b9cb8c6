//! Name/value pairs delivered by the configuration service.
//!
//! Names are canonical keys verbatim. The list is ordered; when a name
//! repeats, the first occurrence wins for overrides.

use std::fs;
use std::path::Path;

use crate::config::document::{Document, Node};
use crate::config::error::ConfigError;
use crate::config::store::SEPARATOR;

/// Ordered list of remote `(name, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameValuePairs {
    pairs: Vec<(String, String)>,
}

impl NameValuePairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Value of the first pair named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Decode a TOML key/value file. Nested tables flatten into slash-joined
    /// names; arrays are ignored.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let document = Document::parse(text)?;
        let mut pairs = Self::new();
        flatten(document.root(), "", &mut pairs);
        Ok(pairs)
    }

    /// Read and decode a pairs file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

fn flatten(node: &Node, prefix: &str, out: &mut NameValuePairs) {
    for (name, child) in node.entries() {
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", prefix, SEPARATOR, name)
        };
        match child {
            Node::Table(_) => flatten(child, &key, out),
            Node::Scalar(scalar) => out.push(key, scalar.literal()),
            Node::Array(_) => {}
        }
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for NameValuePairs {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let pairs: NameValuePairs = [("Writable/LogLevel", "DEBUG"), ("Writable/LogLevel", "ERROR")]
            .into_iter()
            .collect();
        assert_eq!(pairs.get("Writable/LogLevel"), Some("DEBUG"));
        assert_eq!(pairs.get("Service/Port"), None);
    }

    #[test]
    fn test_from_toml_flattens_tables() {
        let text = r#"
            "Service/Port" = 8080

            [Writable]
            LogLevel = "DEBUG"

            [Writable.InsecureSecrets.db]
            path = "credentials"
        "#;
        let pairs = NameValuePairs::from_toml_str(text).unwrap();

        assert_eq!(pairs.get("Service/Port"), Some("8080"));
        assert_eq!(pairs.get("Writable/LogLevel"), Some("DEBUG"));
        assert_eq!(pairs.get("Writable/InsecureSecrets/db/path"), Some("credentials"));
        assert_eq!(pairs.len(), 3);
    }
}
