//! Configuration engine for edge device services.
//!
//! Merges built-in defaults, a configuration document, the process
//! environment and remote overrides into one typed store, projects it into
//! a structured configuration and hot-applies remote changes at runtime.

pub mod admin;
pub mod config;
pub mod observability;
pub mod service;

pub use config::{CanonicalStore, ConfigError, ConfigLoader, NameValuePairs, StructuredConfig, TypedValue};
pub use observability::{init_logging, LogLevel, LogLevelSwitch};
pub use service::{Collaborators, ConfigContext, ReconfigureOutcome};
