//! Structured configuration definitions.
//!
//! This module defines the strongly-typed view of the canonical store that
//! the rest of the service consumes. It is rebuilt from the store on every
//! projection, never edited in place.

use std::ops::BitOr;
use std::time::Duration;

use crate::config::store::CanonicalStore;
use crate::observability::LogLevel;

/// Root structured configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredConfig {
    /// Network and HTTP settings of the service itself.
    pub service: ServiceConfig,

    /// Device handling behaviour.
    pub device: DeviceConfig,

    /// Telemetry publication settings.
    pub telemetry: TelemetryConfig,

    /// Level the service logs at.
    pub log_level: LogLevel,

    /// Driver-visible keys, without the `Driver/` segment.
    pub driver: CanonicalStore,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub startup_msg: String,
    pub health_check_interval: String,
    pub bind_addr: String,
    pub max_request_size: u64,

    /// Labels attached to the service registration, in declared order.
    pub labels: Vec<String>,

    pub cors: CorsConfig,
}

/// Cross-origin resource sharing settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_credentials: bool,
    pub allowed_origin: String,
    pub allowed_methods: String,
    pub allowed_headers: String,
    pub expose_headers: String,
    pub max_age: u32,
}

/// Device behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub data_transform: bool,
    pub discovery: DiscoveryConfig,
    pub update_last_connected: bool,
    pub max_cmd_ops: u32,
    pub max_event_size: u32,
    pub profiles_dir: String,
    pub devices_dir: String,
    pub event_queue_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    /// Seconds between discovery runs; zero disables periodic discovery.
    pub interval: u32,
}

/// Telemetry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Publication interval as written (e.g. `"30s"`).
    pub interval: String,
    pub publish_topic_prefix: String,
    pub metrics: MetricFlags,
}

/// Bitmask of enabled service metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MetricFlags(u32);

impl MetricFlags {
    pub const EVENTS_SENT: MetricFlags = MetricFlags(1 << 0);
    pub const READINGS_SENT: MetricFlags = MetricFlags(1 << 1);
    pub const READ_COMMANDS_EXECUTED: MetricFlags = MetricFlags(1 << 2);
    pub const SECURITY_SECRETS_REQUESTED: MetricFlags = MetricFlags(1 << 3);
    pub const SECURITY_SECRETS_STORED: MetricFlags = MetricFlags(1 << 4);

    pub const fn empty() -> Self {
        MetricFlags(0)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: MetricFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set `flag` when `enabled`.
    pub fn with(self, flag: MetricFlags, enabled: bool) -> Self {
        if enabled {
            self | flag
        } else {
            self
        }
    }
}

impl BitOr for MetricFlags {
    type Output = MetricFlags;

    fn bitor(self, rhs: MetricFlags) -> MetricFlags {
        MetricFlags(self.0 | rhs.0)
    }
}

/// Location of a dependent service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

/// Dependent services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientsConfig {
    pub metadata: EndpointConfig,
}

/// Parse a compact duration such as `"30s"`, `"250ms"` or `"1m30s"`. A bare
/// `"0"` is zero.
pub fn parse_duration(text: &str) -> Result<Duration, humantime::DurationError> {
    let text = text.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(text)
}

/// Split a comma-separated list into trimmed, non-empty items.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
