//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults.rs (built-in table + driver defaults)
//!     → overlay.rs: configuration document (document.rs)
//!     → overlay.rs: process environment
//!     → overlay.rs: remote pairs (remote.rs)
//!     → CanonicalStore (flat, typed, slash-delimited keys)
//!     → projection.rs → StructuredConfig
//!
//! On remote change:
//!     watcher.rs decodes the pairs file
//!     → service::reconfigure overlays a copy of the live store
//!     → projection, diff, atomic swap, notifications
//! ```
//!
//! # Design Decisions
//! - The key set is fixed by the defaults; overlays replace values but never
//!   change a key's kind
//! - Secrets are the only entries inserted after defaults
//! - Startup treats out-of-range overrides as fatal, reconfiguration does not

pub mod defaults;
pub mod document;
pub mod error;
pub mod loader;
pub mod namespace;
pub mod overlay;
pub mod projection;
pub mod remote;
pub mod schema;
pub mod store;
pub mod validation;
pub mod value;
pub mod watcher;

pub use document::{Document, Node, Scalar};
pub use error::ConfigError;
pub use loader::{ConfigLoader, LoadedConfig};
pub use overlay::{EnvSource, OverlayReport, OverlaySource, ProcessEnv};
pub use remote::NameValuePairs;
pub use schema::StructuredConfig;
pub use store::CanonicalStore;
pub use value::{CoercionError, TypedValue, ValueTag};
