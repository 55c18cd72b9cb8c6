//! Configuration metrics.
//!
//! # Metrics
//! - `config_overrides_applied_total` (counter): overrides and secret
//!   insertions applied, by source
//! - `config_overrides_rejected_total` (counter): overrides whose text did
//!   not fit the key's kind, by source
//! - `config_reconfigurations_total` (counter): reconfiguration attempts, by
//!   outcome
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; the embedding service installs
//!   whatever recorder it exports with

pub fn record_overrides_applied(source: &'static str, count: usize) {
    if count > 0 {
        metrics::counter!("config_overrides_applied_total", "source" => source).increment(count as u64);
    }
}

pub fn record_override_rejected(source: &'static str) {
    metrics::counter!("config_overrides_rejected_total", "source" => source).increment(1);
}

pub fn record_reconfiguration(outcome: &'static str) {
    metrics::counter!("config_reconfigurations_total", "outcome" => outcome).increment(1);
}
