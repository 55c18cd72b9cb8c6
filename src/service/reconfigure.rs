//! Runtime reconfiguration from remote pairs.
//!
//! # Data Flow
//! ```text
//! remote pairs
//!     → overlay onto a private copy of the live store
//!     → project a new StructuredConfig (failure discards everything)
//!     → diff telemetry interval and driver map against the live generation
//!     → publish the new generation in one swap
//!     → notify telemetry, driver, log level, discovery, secret store
//! ```

use std::sync::{Arc, PoisonError};

use crate::config::defaults::LOG_LEVEL_KEY;
use crate::config::error::ConfigError;
use crate::config::overlay::{overlay_remote, OverlayReport};
use crate::config::projection::project;
use crate::config::remote::NameValuePairs;
use crate::config::store::CanonicalStore;
use crate::observability::metrics;
use crate::service::context::{ConfigContext, LiveConfig};

/// What a reconfiguration changed and whom it notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconfigureOutcome {
    /// The telemetry interval text changed.
    pub telemetry_rescheduled: bool,
    /// At least one driver value changed.
    pub driver_notified: bool,
    /// The active log level changed.
    pub log_level_changed: bool,
    /// Per-key result of the remote overlay.
    pub overlay: OverlayReport,
}

impl ConfigContext {
    /// Re-merge `pairs` into the live configuration and notify the affected
    /// collaborators.
    ///
    /// On error nothing is published and nobody is notified.
    pub fn reconfigure(&self, pairs: &NameValuePairs) -> Result<ReconfigureOutcome, ConfigError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!("Reconfiguring");

        let previous = self.live.load_full();
        let mut store = previous.store.clone();
        let overlay = overlay_remote(&mut store, pairs);
        overlay.log();

        let config = match project(&store, previous.config.log_level) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Reconfiguration discarded");
                metrics::record_reconfiguration("rejected");
                return Err(e);
            }
        };

        let telemetry_rescheduled = config.telemetry.interval != previous.config.telemetry.interval;
        let driver_notified = driver_config_changed(&previous.config.driver, &config.driver);

        let next = Arc::new(LiveConfig {
            store,
            config,
            clients: previous.clients.clone(),
        });
        self.live.store(next.clone());

        if telemetry_rescheduled {
            tracing::info!(interval = %next.config.telemetry.interval, "Rescheduling telemetry");
            if let Some(telemetry) = &self.hooks.telemetry {
                telemetry.reschedule(&next.config.telemetry);
            }
        }

        if driver_notified {
            tracing::info!("Driver configuration changed");
            if let Some(driver) = &self.hooks.driver {
                driver.reconfigure(&next.config.driver);
            }
        }

        let log_level_changed = pairs.get(LOG_LEVEL_KEY).is_some() && self.logging.apply(next.config.log_level);

        let discovery = next.config.device.discovery;
        if let Some(controller) = &self.hooks.discovery {
            controller.configure(discovery.enabled, discovery.interval);
        }
        if let Some(secret_store) = &self.hooks.secret_store {
            secret_store.reconfigure(&next.store);
        }

        metrics::record_reconfiguration("applied");
        Ok(ReconfigureOutcome {
            telemetry_rescheduled,
            driver_notified,
            log_level_changed,
            overlay,
        })
    }
}

/// True when any driver key's value differs between the two maps.
fn driver_config_changed(previous: &CanonicalStore, next: &CanonicalStore) -> bool {
    next.len() != previous.len() || next.iter().any(|(key, value)| previous.get(key) != Some(value))
}
