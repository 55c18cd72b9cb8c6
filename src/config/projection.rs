//! Projection of the canonical store into [`StructuredConfig`].

use std::time::Duration;

use crate::config::defaults::{DEFAULT_REQUEST_TIMEOUT, LOG_LEVEL_KEY, REQUEST_TIMEOUT_KEY, TELEMETRY_INTERVAL_KEY};
use crate::config::error::ConfigError;
use crate::config::namespace::split_driver_config;
use crate::config::schema::{
    parse_duration, parse_labels, CorsConfig, DeviceConfig, DiscoveryConfig, MetricFlags, ServiceConfig,
    StructuredConfig, TelemetryConfig,
};
use crate::config::store::CanonicalStore;
use crate::observability::LogLevel;

/// Build a fresh structured configuration from `store`.
///
/// `current_level` is kept when the stored level name is not a valid level;
/// an unparsable request timeout falls back to the built-in default. Only a
/// missing or wrongly-kinded key is an error.
pub fn project(store: &CanonicalStore, current_level: LogLevel) -> Result<StructuredConfig, ConfigError> {
    let request_timeout = project_timeout(store.require_str(REQUEST_TIMEOUT_KEY)?);

    let service = ServiceConfig {
        host: store.require_str("Service/Host")?.to_string(),
        port: store.require_u16("Service/Port")?,
        request_timeout,
        startup_msg: store.require_str("Service/StartupMsg")?.to_string(),
        health_check_interval: store.require_str("Service/HealthCheckInterval")?.to_string(),
        bind_addr: store.require_str("Service/ServerBindAddr")?.to_string(),
        max_request_size: store.require_u64("Service/MaxRequestSize")?,
        labels: parse_labels(store.require_str("Device/Labels")?),
        cors: project_cors(store)?,
    };

    let device = DeviceConfig {
        data_transform: store.require_bool("Writable/Device/DataTransform")?,
        discovery: DiscoveryConfig {
            enabled: store.require_bool("Writable/Device/Discovery/Enabled")?,
            interval: store.require_u32("Writable/Device/Discovery/Interval")?,
        },
        update_last_connected: store.require_bool("Writable/Device/UpdateLastConnected")?,
        max_cmd_ops: store.require_u32("Writable/Device/MaxCmdOps")?,
        max_event_size: store.require_u32("Writable/Device/MaxEventSize")?,
        profiles_dir: store.require_str("Device/ProfilesDir")?.to_string(),
        devices_dir: store.require_str("Device/DevicesDir")?.to_string(),
        event_queue_length: store.require_u32("Device/EventQLength")?,
    };

    let metrics = MetricFlags::empty()
        .with(MetricFlags::EVENTS_SENT, store.require_bool("Writable/Telemetry/Metrics/EventsSent")?)
        .with(MetricFlags::READINGS_SENT, store.require_bool("Writable/Telemetry/Metrics/ReadingsSent")?)
        .with(
            MetricFlags::READ_COMMANDS_EXECUTED,
            store.require_bool("Writable/Telemetry/Metrics/ReadCommandsExecuted")?,
        )
        .with(
            MetricFlags::SECURITY_SECRETS_REQUESTED,
            store.require_bool("Writable/Telemetry/Metrics/SecuritySecretsRequested")?,
        )
        .with(
            MetricFlags::SECURITY_SECRETS_STORED,
            store.require_bool("Writable/Telemetry/Metrics/SecuritySecretsStored")?,
        );

    let telemetry = TelemetryConfig {
        interval: store.require_str(TELEMETRY_INTERVAL_KEY)?.to_string(),
        publish_topic_prefix: store.require_str("Writable/Telemetry/PublishTopicPrefix")?.to_string(),
        metrics,
    };

    let level_name = store.require_str(LOG_LEVEL_KEY)?;
    let log_level = match level_name.parse::<LogLevel>() {
        Ok(level) => level,
        Err(e) => {
            tracing::warn!(current = %current_level, "{}", e);
            current_level
        }
    };

    Ok(StructuredConfig {
        service,
        device,
        telemetry,
        log_level,
        driver: split_driver_config(store),
    })
}

fn project_timeout(text: &str) -> Duration {
    parse_duration(text).unwrap_or_else(|e| {
        tracing::warn!(key = REQUEST_TIMEOUT_KEY, value = %text, error = %e, "Invalid duration, using default");
        DEFAULT_REQUEST_TIMEOUT
    })
}

fn project_cors(store: &CanonicalStore) -> Result<CorsConfig, ConfigError> {
    Ok(CorsConfig {
        enabled: store.require_bool("Service/CORSConfiguration/EnableCORS")?,
        allow_credentials: store.require_bool("Service/CORSConfiguration/CORSAllowCredentials")?,
        allowed_origin: store.require_str("Service/CORSConfiguration/CORSAllowedOrigin")?.to_string(),
        allowed_methods: store.require_str("Service/CORSConfiguration/CORSAllowedMethods")?.to_string(),
        allowed_headers: store.require_str("Service/CORSConfiguration/CORSAllowedHeaders")?.to_string(),
        expose_headers: store.require_str("Service/CORSConfiguration/CORSExposeHeaders")?.to_string(),
        max_age: store.require_u32("Service/CORSConfiguration/CORSMaxAge")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DefaultsBuilder;
    use crate::config::value::TypedValue;

    fn defaults() -> CanonicalStore {
        DefaultsBuilder::new("device-test").host("node").build()
    }

    #[test]
    fn test_project_defaults() {
        let config = project(&defaults(), LogLevel::Info).unwrap();

        assert_eq!(config.service.port, 59999);
        assert_eq!(config.service.host, "node");
        assert_eq!(config.service.request_timeout, Duration::from_secs(5));
        assert!(config.service.labels.is_empty());
        assert_eq!(config.service.cors.max_age, 3600);
        assert!(config.device.discovery.enabled);
        assert_eq!(config.telemetry.interval, "30s");
        assert_eq!(config.telemetry.metrics, MetricFlags::empty());
        assert_eq!(config.log_level, LogLevel::Warning);
        assert!(config.driver.is_empty());
    }

    #[test]
    fn test_labels_and_metric_bits() {
        let mut store = defaults();
        store.insert("Device/Labels", "a,b,c");
        store.insert("Writable/Telemetry/Metrics/ReadingsSent", true);
        store.insert("Writable/Telemetry/Metrics/SecuritySecretsRequested", true);

        let config = project(&store, LogLevel::Warning).unwrap();

        assert_eq!(config.service.labels, vec!["a", "b", "c"]);
        assert_eq!(
            config.telemetry.metrics,
            MetricFlags::READINGS_SENT | MetricFlags::SECURITY_SECRETS_REQUESTED
        );
    }

    #[test]
    fn test_invalid_level_keeps_current() {
        let mut store = defaults();
        store.insert(LOG_LEVEL_KEY, "CHATTY");

        let config = project(&store, LogLevel::Debug).unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_bad_timeout_falls_back_to_default() {
        let mut store = defaults();
        store.insert(REQUEST_TIMEOUT_KEY, "soon");
        store.insert("Writable/Device/MaxCmdOps", 7u32);

        let config = project(&store, LogLevel::Warning).unwrap();

        assert_eq!(config.service.request_timeout, Duration::from_secs(5));
        assert_eq!(config.device.max_cmd_ops, 7);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let store: CanonicalStore = [("Service/Port", TypedValue::UInt16(1))].into_iter().collect();

        assert!(matches!(
            project(&store, LogLevel::Warning),
            Err(ConfigError::MissingKey(_))
        ));
    }
}
