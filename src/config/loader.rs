//! Startup configuration loading.
//!
//! Builds the canonical store in precedence order, lowest first:
//! built-in and driver defaults, the configuration document, the process
//! environment, then remote pairs from the configuration service.

use std::path::Path;

use crate::config::defaults::DefaultsBuilder;
use crate::config::document::{Document, Scalar};
use crate::config::error::ConfigError;
use crate::config::overlay::{coerce_scalar, overlay_document, overlay_environment, overlay_remote, EnvSource, ProcessEnv};
use crate::config::remote::NameValuePairs;
use crate::config::schema::{ClientsConfig, EndpointConfig};
use crate::config::store::CanonicalStore;
use crate::config::validation::check_startup_overlay;
use crate::config::value::{coerce, CoercionError, ValueTag};

const METADATA_CLIENT: &str = "core-metadata";
const METADATA_ENV_NAME: &str = "CORE_METADATA";

/// Result of startup loading.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub store: CanonicalStore,
    pub clients: ClientsConfig,
}

/// Collects the startup sources and merges them.
pub struct ConfigLoader<'a> {
    defaults: DefaultsBuilder<'a>,
    document: Option<&'a Document>,
    env: &'a dyn EnvSource,
    remote: Option<&'a NameValuePairs>,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(service_name: &'a str) -> Self {
        Self {
            defaults: DefaultsBuilder::new(service_name),
            document: None,
            env: &ProcessEnv,
            remote: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.defaults = self.defaults.host(host);
        self
    }

    pub fn driver_defaults(mut self, defaults: Option<&'a CanonicalStore>) -> Self {
        self.defaults = self.defaults.driver_defaults(defaults);
        self
    }

    pub fn document(mut self, document: Option<&'a Document>) -> Self {
        self.document = document;
        self
    }

    pub fn env(mut self, env: &'a dyn EnvSource) -> Self {
        self.env = env;
        self
    }

    pub fn remote(mut self, pairs: Option<&'a NameValuePairs>) -> Self {
        self.remote = pairs;
        self
    }

    /// Merge every source. Fails on out-of-range overrides.
    pub fn load(self) -> Result<LoadedConfig, ConfigError> {
        let mut store = self.defaults.build();

        if let Some(document) = self.document {
            check_startup_overlay(&overlay_document(&mut store, document))?;
        }
        check_startup_overlay(&overlay_environment(&mut store, self.env))?;
        if let Some(pairs) = self.remote {
            check_startup_overlay(&overlay_remote(&mut store, pairs))?;
        }

        let clients = load_clients(self.document, self.env)?;
        Ok(LoadedConfig { store, clients })
    }
}

/// Load the configuration document at `path`, failing on any structural
/// error.
pub fn load_document(path: &Path) -> Result<Document, ConfigError> {
    let document = Document::load(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Unable to load configuration");
        e
    })?;
    tracing::info!(path = %path.display(), "Configuration document loaded");
    Ok(document)
}

/// Dependent service locations from `Clients.<name>`, overridable with
/// `CLIENTS_<NAME>_HOST` and `CLIENTS_<NAME>_PORT`.
pub fn load_clients(document: Option<&Document>, env: &dyn EnvSource) -> Result<ClientsConfig, ConfigError> {
    let mut metadata = EndpointConfig::default();

    let table = document
        .and_then(|d| d.root().table("Clients"))
        .and_then(|clients| clients.table(METADATA_CLIENT));
    if let Some(table) = table {
        if let Some(host) = table.scalar("Host").and_then(Scalar::as_str).filter(|h| !h.is_empty()) {
            metadata.host = host.to_string();
        }
        if let Some(port) = table.scalar("Port") {
            let key = format!("Clients/{}/Port", METADATA_CLIENT);
            metadata.port = coerce_scalar(ValueTag::UInt16, port)
                .map_err(|error| port_error(key, error))?
                .as_u16()
                .unwrap_or_default();
        }
    }

    override_endpoint(env, METADATA_ENV_NAME, &mut metadata);
    Ok(ClientsConfig { metadata })
}

fn port_error(key: String, error: CoercionError) -> ConfigError {
    if error.is_out_of_range() {
        ConfigError::OutOfRange {
            key,
            source_name: "document",
            error,
        }
    } else {
        ConfigError::InvalidValue {
            key,
            reason: error.to_string(),
        }
    }
}

fn override_endpoint(env: &dyn EnvSource, name: &str, endpoint: &mut EndpointConfig) {
    let host = env.var(&format!("CLIENTS_{}_HOST", name));
    let port = env
        .var(&format!("CLIENTS_{}_PORT", name))
        .and_then(|text| coerce(ValueTag::UInt16, &text).ok())
        .and_then(|value| value.as_u16())
        .filter(|port| *port != 0);

    if host.is_none() && port.is_none() {
        return;
    }
    if let Some(host) = host {
        endpoint.host = host;
    }
    if let Some(port) = port {
        endpoint.port = port;
    }
    tracing::info!("Override {} service location = {}:{}", name, endpoint.host, endpoint.port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::value::TypedValue;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_precedence() {
        let document = Document::parse("[Service]\nPort = 1000\n").unwrap();
        let vars = env(&[("SERVICE_PORT", "2000")]);
        let pairs: NameValuePairs = [("Service/Port", "3000")].into_iter().collect();

        let doc_only = ConfigLoader::new("svc")
            .document(Some(&document))
            .env(&HashMap::<String, String>::new())
            .load()
            .unwrap();
        assert_eq!(doc_only.store.get("Service/Port"), Some(&TypedValue::UInt16(1000)));

        let with_env = ConfigLoader::new("svc").document(Some(&document)).env(&vars).load().unwrap();
        assert_eq!(with_env.store.get("Service/Port"), Some(&TypedValue::UInt16(2000)));

        let with_remote = ConfigLoader::new("svc")
            .document(Some(&document))
            .env(&vars)
            .remote(Some(&pairs))
            .load()
            .unwrap();
        assert_eq!(with_remote.store.get("Service/Port"), Some(&TypedValue::UInt16(3000)));
    }

    #[test]
    fn test_out_of_range_aborts_startup() {
        let document = Document::parse("[Service]\nPort = 70000\n").unwrap();

        let result = ConfigLoader::new("svc").document(Some(&document)).env(&HashMap::<String, String>::new()).load();

        assert!(matches!(result, Err(ConfigError::OutOfRange { source_name: "document", .. })));
    }

    #[test]
    fn test_clients_from_document_and_env() {
        let document = Document::parse(
            "[Clients.core-metadata]\nHost = \"metadata\"\nPort = 59881\n",
        )
        .unwrap();

        let clients = load_clients(Some(&document), &HashMap::<String, String>::new()).unwrap();
        assert_eq!(clients.metadata, EndpointConfig { host: "metadata".into(), port: 59881 });

        let vars = env(&[("CLIENTS_CORE_METADATA_HOST", "edgex-core-metadata"), ("CLIENTS_CORE_METADATA_PORT", "0")]);
        let clients = load_clients(Some(&document), &vars).unwrap();
        assert_eq!(clients.metadata.host, "edgex-core-metadata");
        assert_eq!(clients.metadata.port, 59881);
    }

    #[test]
    fn test_clients_port_must_fit() {
        let document = Document::parse("[Clients.core-metadata]\nPort = 65536\n").unwrap();
        assert!(matches!(
            load_clients(Some(&document), &HashMap::<String, String>::new()),
            Err(ConfigError::OutOfRange { .. })
        ));

        let document = Document::parse("[Clients.core-metadata]\nPort = \"59881\"\n").unwrap();
        assert!(matches!(
            load_clients(Some(&document), &HashMap::<String, String>::new()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
