//! Structured configuration documents.
//!
//! The overlays only need named-table, array and scalar lookup, so the
//! parsed file is adapted into a small format-neutral node tree. TOML is the
//! on-disk format; anything else that can produce a [`Node`] tree works too.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::store::SEPARATOR;

const DEFAULT_REGISTRY_URL: &str = "consul.http://localhost:8500";

/// A leaf value as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Datetime(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The unquoted literal text of the scalar.
    pub fn literal(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Boolean(b) => b.to_string(),
            Scalar::Datetime(d) => d.clone(),
        }
    }
}

/// One node of a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Table(BTreeMap<String, Node>),
    Array(Vec<Node>),
    Scalar(Scalar),
}

impl Node {
    /// Named child of a table node.
    pub fn child(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Table(entries) => entries.get(name),
            _ => None,
        }
    }

    /// Named sub-table of a table node.
    pub fn table(&self, name: &str) -> Option<&Node> {
        self.child(name).filter(|node| matches!(node, Node::Table(_)))
    }

    /// Named scalar of a table node.
    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        match self.child(name)? {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Named array of a table node.
    pub fn array(&self, name: &str) -> Option<&[Node]> {
        match self.child(name)? {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a table node, empty for anything else.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node)> {
        let entries = match self {
            Node::Table(entries) => Some(entries),
            _ => None,
        };
        entries.into_iter().flatten().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve a slash-separated path to a scalar, descending one table per
    /// segment.
    pub fn find(&self, path: &str) -> Option<&Scalar> {
        match path.split_once(SEPARATOR) {
            Some((head, rest)) => self.child(head)?.find(rest),
            None => self.scalar(path),
        }
    }
}

impl From<toml::Value> for Node {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Node::Scalar(Scalar::String(s)),
            toml::Value::Integer(i) => Node::Scalar(Scalar::Integer(i)),
            toml::Value::Float(f) => Node::Scalar(Scalar::Float(f)),
            toml::Value::Boolean(b) => Node::Scalar(Scalar::Boolean(b)),
            toml::Value::Datetime(d) => Node::Scalar(Scalar::Datetime(d.to_string())),
            toml::Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            toml::Value::Table(table) => table.into(),
        }
    }
}

impl From<toml::Table> for Node {
    fn from(table: toml::Table) -> Self {
        Node::Table(table.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
    }
}

/// A parsed configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(text)?;
        Ok(Self { root: table.into() })
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn find(&self, path: &str) -> Option<&Scalar> {
        self.root.find(path)
    }

    /// Location of the registry as `<type>://<host>:<port>`.
    pub fn registry_url(&self) -> String {
        let registry = self.root.table("Registry");
        let text = |name: &str| {
            registry
                .and_then(|t| t.scalar(name))
                .and_then(Scalar::as_str)
                .filter(|s| !s.is_empty())
        };
        let port = registry
            .and_then(|t| t.scalar("Port"))
            .and_then(Scalar::as_integer)
            .filter(|p| *p != 0);

        match (text("Type"), text("Host"), port) {
            (Some(kind), Some(host), Some(port)) => format!("{}://{}:{}", kind, host, port),
            _ => DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}
