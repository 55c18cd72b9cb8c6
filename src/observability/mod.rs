//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, runtime level switch)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Log output (stdout)
//!     → Whatever metrics recorder the embedding service installs
//! ```
//!
//! # Design Decisions
//! - The log level belongs to the writable configuration; reconfiguration
//!   drives it through `LogLevelSwitch`
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogLevel, LogLevelSwitch};
