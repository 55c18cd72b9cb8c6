//! Built-in configuration defaults.
//!
//! Every key the service reads is declared here with its kind; later
//! overlays can only replace values, never add keys (secrets aside).

use std::fs;
use std::time::Duration;

use crate::config::namespace::canonical_driver_key;
use crate::config::store::CanonicalStore;
use crate::config::value::TypedValue;

pub const LOG_LEVEL_KEY: &str = "Writable/LogLevel";
pub const REQUEST_TIMEOUT_KEY: &str = "Service/RequestTimeout";
pub const TELEMETRY_INTERVAL_KEY: &str = "Writable/Telemetry/Interval";
pub const MESSAGE_BUS_TYPE_KEY: &str = "MessageBus/Type";

/// Used when the stored timeout cannot be parsed; matches the `"5s"` default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_METRICS_TOPIC: &str = "edgex/telemetry";
const DEFAULT_PUBLISH_TOPIC: &str = "edgex/events/device";
const DEFAULT_RESPONSE_TOPIC: &str = "edgex/device/command/response";
const DEFAULT_CORS_METHODS: &str = "GET, POST, PUT, PATCH, DELETE";
const DEFAULT_CORS_HEADERS: &str =
    "Authorization, Accept, Accept-Language, Content-Language, Content-Type, X-Correlation-ID";
const DEFAULT_CORS_EXPOSE: &str =
    "Cache-Control, Content-Language, Content-Length, Content-Type, Expires, Last-Modified, Pragma, X-Correlation-ID";

/// Builds the initial canonical store.
#[derive(Debug, Clone)]
pub struct DefaultsBuilder<'a> {
    service_name: &'a str,
    host: String,
    driver_defaults: Option<&'a CanonicalStore>,
}

impl<'a> DefaultsBuilder<'a> {
    pub fn new(service_name: &'a str) -> Self {
        Self {
            service_name,
            host: local_hostname(),
            driver_defaults: None,
        }
    }

    /// Override the detected host name used for `Service/Host`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Driver defaults, keyed without any `Driver/` prefix.
    pub fn driver_defaults(mut self, defaults: Option<&'a CanonicalStore>) -> Self {
        self.driver_defaults = defaults;
        self
    }

    pub fn build(self) -> CanonicalStore {
        let svc = self.service_name;
        let mut store = CanonicalStore::new();

        let writable: [(&str, TypedValue); 14] = [
            ("LogLevel", "WARNING".into()),
            ("Device/DataTransform", true.into()),
            ("Device/Discovery/Enabled", true.into()),
            ("Device/Discovery/Interval", 0u32.into()),
            ("Device/UpdateLastConnected", false.into()),
            ("Device/MaxCmdOps", 0u32.into()),
            ("Device/MaxEventSize", 0u32.into()),
            ("Telemetry/Interval", "30s".into()),
            ("Telemetry/PublishTopicPrefix", DEFAULT_METRICS_TOPIC.into()),
            ("Telemetry/Metrics/EventsSent", false.into()),
            ("Telemetry/Metrics/ReadingsSent", false.into()),
            ("Telemetry/Metrics/ReadCommandsExecuted", false.into()),
            ("Telemetry/Metrics/SecuritySecretsRequested", false.into()),
            ("Telemetry/Metrics/SecuritySecretsStored", false.into()),
        ];
        for (key, value) in writable {
            store.insert(format!("Writable/{}", key), value);
        }

        store.insert("Service/Host", self.host.as_str());
        store.insert("Service/Port", 59999u16);
        store.insert(REQUEST_TIMEOUT_KEY, "5s");
        store.insert("Service/StartupMsg", "");
        store.insert("Service/HealthCheckInterval", "");
        store.insert("Service/ServerBindAddr", "");
        store.insert("Service/MaxRequestSize", 0u64);
        store.insert("Service/CORSConfiguration/EnableCORS", false);
        store.insert("Service/CORSConfiguration/CORSAllowCredentials", false);
        store.insert("Service/CORSConfiguration/CORSAllowedOrigin", "https://localhost");
        store.insert("Service/CORSConfiguration/CORSAllowedMethods", DEFAULT_CORS_METHODS);
        store.insert("Service/CORSConfiguration/CORSAllowedHeaders", DEFAULT_CORS_HEADERS);
        store.insert("Service/CORSConfiguration/CORSExposeHeaders", DEFAULT_CORS_EXPOSE);
        store.insert("Service/CORSConfiguration/CORSMaxAge", 3600u32);

        store.insert("Device/Labels", "");
        store.insert("Device/ProfilesDir", "");
        store.insert("Device/DevicesDir", "");
        store.insert("Device/EventQLength", 0u32);

        store.insert(MESSAGE_BUS_TYPE_KEY, "");
        message_bus_defaults(&mut store, svc);

        store.insert("SecretStore/Type", "vault");
        store.insert("SecretStore/Host", "localhost");
        store.insert("SecretStore/Port", 8200u16);
        store.insert("SecretStore/Protocol", "http");
        store.insert("SecretStore/Path", format!("{}/", svc));
        store.insert("SecretStore/RootCaCertPath", "");
        store.insert("SecretStore/ServerName", "");
        store.insert("SecretStore/TokenFile", format!("/tmp/edgex/secrets/{}/secrets-token.json", svc));
        store.insert("SecretStore/Authentication/AuthType", "X-Vault-Token");
        store.insert("SecretStore/SecretsFile", "");
        store.insert("SecretStore/DisableScrubSecretsFile", false);

        if let Some(driver) = self.driver_defaults {
            for (key, value) in driver {
                store.insert(canonical_driver_key(key), value.clone());
            }
        }

        store
    }
}

fn message_bus_defaults(store: &mut CanonicalStore, svc: &str) {
    store.insert("MessageBus/Disabled", false);
    store.insert("MessageBus/Protocol", "");
    store.insert("MessageBus/Host", "localhost");
    store.insert("MessageBus/Port", 0u16);
    store.insert("MessageBus/PublishTopicPrefix", DEFAULT_PUBLISH_TOPIC);
    store.insert("MessageBus/AuthMode", "none");
    store.insert("MessageBus/SecretName", "");

    store.insert("MessageBus/Optional/ClientId", "");
    store.insert("MessageBus/Optional/Qos", 0u16);
    store.insert("MessageBus/Optional/KeepAlive", 60u16);
    store.insert("MessageBus/Optional/Retained", false);
    store.insert("MessageBus/Optional/CertFile", "");
    store.insert("MessageBus/Optional/KeyFile", "");
    store.insert("MessageBus/Optional/SkipCertVerify", false);

    store.insert(
        "MessageBus/Topics/CommandRequestTopic",
        format!("edgex/device/command/request/{}/#", svc),
    );
    store.insert("MessageBus/Topics/CommandResponseTopicPrefix", DEFAULT_RESPONSE_TOPIC);
}

/// Defaults for `service_name` merged with the driver's own defaults.
pub fn build_defaults(driver_defaults: Option<&CanonicalStore>, service_name: &str) -> CanonicalStore {
    DefaultsBuilder::new(service_name)
        .driver_defaults(driver_defaults)
        .build()
}

fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
