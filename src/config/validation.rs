//! Startup acceptance of overlay results.
//!
//! # Responsibilities
//! - Log every rejected override (source, key, offending text)
//! - Refuse to start when a numeric override was too wide for its key
//!
//! # Design Decisions
//! - Unparsable text is a diagnostic, not a failure: the key keeps its value
//! - Out-of-range numbers are configuration errors at startup; during
//!   reconfiguration only that key's update is dropped

use crate::config::error::ConfigError;
use crate::config::overlay::OverlayReport;

/// Log `report` and fail if it contains an out-of-range rejection.
pub fn check_startup_overlay(report: &OverlayReport) -> Result<(), ConfigError> {
    report.log();
    match report.first_out_of_range() {
        Some(rejected) => Err(ConfigError::OutOfRange {
            key: rejected.key.clone(),
            source_name: report.source.name(),
            error: rejected.error.clone(),
        }),
        None => Ok(()),
    }
}
