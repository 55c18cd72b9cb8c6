//! The live configuration context.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::config::error::ConfigError;
use crate::config::loader::LoadedConfig;
use crate::config::projection::project;
use crate::config::schema::{ClientsConfig, StructuredConfig};
use crate::config::store::CanonicalStore;
use crate::observability::LogLevelSwitch;
use crate::service::hooks::Collaborators;
use crate::service::snapshot::ConfigSnapshot;

/// One consistent generation of configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    /// The merged canonical store.
    pub store: CanonicalStore,

    /// Structured projection of `store`.
    pub config: StructuredConfig,

    /// Dependent service locations, fixed at startup.
    pub clients: ClientsConfig,
}

/// Owns the live configuration and publishes each generation atomically.
///
/// Readers take an `Arc<LiveConfig>` and keep a consistent view for as long
/// as they hold it. Writers are serialized.
pub struct ConfigContext {
    service_name: String,
    pub(crate) live: ArcSwap<LiveConfig>,
    pub(crate) writer: Mutex<()>,
    pub(crate) logging: Arc<LogLevelSwitch>,
    pub(crate) hooks: Collaborators,
}

impl ConfigContext {
    /// Project the startup store, apply its log level and publish it.
    pub fn start(
        service_name: impl Into<String>,
        loaded: LoadedConfig,
        logging: Arc<LogLevelSwitch>,
        hooks: Collaborators,
    ) -> Result<Self, ConfigError> {
        let config = project(&loaded.store, logging.current())?;
        logging.apply(config.log_level);
        loaded.store.dump();

        let live = LiveConfig {
            store: loaded.store,
            config,
            clients: loaded.clients,
        };

        Ok(Self {
            service_name: service_name.into(),
            live: ArcSwap::from_pointee(live),
            writer: Mutex::new(()),
            logging,
            hooks,
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The current generation.
    pub fn current(&self) -> Arc<LiveConfig> {
        self.live.load_full()
    }

    /// Status view of the current generation.
    pub fn snapshot(&self) -> Result<ConfigSnapshot, ConfigError> {
        ConfigSnapshot::from_live(&self.current())
    }

    pub fn logging(&self) -> &LogLevelSwitch {
        &self.logging
    }
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("service_name", &self.service_name)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::ConfigLoader;
    use crate::observability::LogLevel;
    use std::collections::HashMap;

    #[test]
    fn test_start_applies_projected_level() {
        let env: HashMap<String, String> = [("WRITABLE_LOGLEVEL".to_string(), "DEBUG".to_string())]
            .into_iter()
            .collect();
        let loaded = ConfigLoader::new("svc").host("node").env(&env).load().unwrap();
        let logging = Arc::new(LogLevelSwitch::detached(LogLevel::Warning));

        let ctx = ConfigContext::start("svc", loaded, logging.clone(), Collaborators::new()).unwrap();

        assert_eq!(logging.current(), LogLevel::Debug);
        assert_eq!(ctx.current().config.log_level, LogLevel::Debug);
        assert_eq!(ctx.service_name(), "svc");
    }
}
