//! Serializable status view of the live configuration.
//!
//! Field names and nesting follow the canonical key namespaces, so the JSON
//! reads like the configuration document that produced it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::defaults::{MESSAGE_BUS_TYPE_KEY, REQUEST_TIMEOUT_KEY};
use crate::config::error::ConfigError;
use crate::config::schema::MetricFlags;
use crate::config::store::CanonicalStore;
use crate::observability::LogLevel;
use crate::service::context::LiveConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigSnapshot {
    pub writable: WritableSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_queue: Option<MessageQueueSnapshot>,
    pub clients: ClientsSnapshot,
    pub service: ServiceSnapshot,
    pub driver: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WritableSnapshot {
    pub log_level: LogLevel,
    pub device: DeviceSnapshot,
    pub telemetry: TelemetrySnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceSnapshot {
    pub discovery: DiscoverySnapshot,
    pub data_transform: bool,
    pub max_cmd_ops: u32,
    pub max_event_size: u32,
    pub profiles_dir: String,
    pub devices_dir: String,
    pub update_last_connected: bool,
    #[serde(rename = "EventQLength")]
    pub event_queue_length: u32,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoverySnapshot {
    pub enabled: bool,
    pub interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetrySnapshot {
    pub interval: String,
    pub publish_topic_prefix: String,
    pub events_sent: bool,
    pub readings_sent: bool,
    pub read_commands_executed: bool,
    pub security_secrets_requested: bool,
    pub security_secrets_stored: bool,
}

/// Message bus connection, reported for the `mqtt` and `redis` bus types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageQueueSnapshot {
    #[serde(rename = "Type")]
    pub kind: String,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub auth_mode: String,
    pub secret_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<MqttOptionalSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<TopicsSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MqttOptionalSnapshot {
    pub client_id: String,
    pub qos: u16,
    pub keep_alive: u16,
    pub retained: bool,
    pub cert_file: String,
    pub key_file: String,
    pub skip_cert_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicsSnapshot {
    pub command_request_topic: String,
    pub command_response_topic_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientsSnapshot {
    pub metadata: EndpointSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSnapshot {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSnapshot {
    pub host: String,
    pub port: u16,
    /// As written, not normalized.
    pub request_timeout: String,
    pub startup_msg: String,
    pub health_check_interval: String,
    pub server_bind_addr: String,
    pub max_request_size: u64,
    #[serde(rename = "CORSConfiguration")]
    pub cors: CorsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsSnapshot {
    #[serde(rename = "EnableCORS")]
    pub enable_cors: bool,
    #[serde(rename = "CORSAllowCredentials")]
    pub allow_credentials: bool,
    #[serde(rename = "CORSAllowedOrigin")]
    pub allowed_origin: String,
    #[serde(rename = "CORSAllowedMethods")]
    pub allowed_methods: String,
    #[serde(rename = "CORSAllowedHeaders")]
    pub allowed_headers: String,
    #[serde(rename = "CORSExposeHeaders")]
    pub expose_headers: String,
    #[serde(rename = "CORSMaxAge")]
    pub max_age: u32,
}

impl ConfigSnapshot {
    pub fn from_live(live: &LiveConfig) -> Result<Self, ConfigError> {
        let config = &live.config;
        let device = &config.device;
        let telemetry = &config.telemetry;
        let service = &config.service;
        let flags = telemetry.metrics;

        Ok(Self {
            writable: WritableSnapshot {
                log_level: config.log_level,
                device: DeviceSnapshot {
                    discovery: DiscoverySnapshot {
                        enabled: device.discovery.enabled,
                        interval: device.discovery.interval,
                    },
                    data_transform: device.data_transform,
                    max_cmd_ops: device.max_cmd_ops,
                    max_event_size: device.max_event_size,
                    profiles_dir: device.profiles_dir.clone(),
                    devices_dir: device.devices_dir.clone(),
                    update_last_connected: device.update_last_connected,
                    event_queue_length: device.event_queue_length,
                    labels: service.labels.clone(),
                },
                telemetry: TelemetrySnapshot {
                    interval: telemetry.interval.clone(),
                    publish_topic_prefix: telemetry.publish_topic_prefix.clone(),
                    events_sent: flags.contains(MetricFlags::EVENTS_SENT),
                    readings_sent: flags.contains(MetricFlags::READINGS_SENT),
                    read_commands_executed: flags.contains(MetricFlags::READ_COMMANDS_EXECUTED),
                    security_secrets_requested: flags.contains(MetricFlags::SECURITY_SECRETS_REQUESTED),
                    security_secrets_stored: flags.contains(MetricFlags::SECURITY_SECRETS_STORED),
                },
            },
            message_queue: message_queue(&live.store)?,
            clients: ClientsSnapshot {
                metadata: EndpointSnapshot {
                    host: live.clients.metadata.host.clone(),
                    port: live.clients.metadata.port,
                },
            },
            service: ServiceSnapshot {
                host: service.host.clone(),
                port: service.port,
                request_timeout: live.store.require_str(REQUEST_TIMEOUT_KEY)?.to_string(),
                startup_msg: service.startup_msg.clone(),
                health_check_interval: service.health_check_interval.clone(),
                server_bind_addr: service.bind_addr.clone(),
                max_request_size: service.max_request_size,
                cors: CorsSnapshot {
                    enable_cors: service.cors.enabled,
                    allow_credentials: service.cors.allow_credentials,
                    allowed_origin: service.cors.allowed_origin.clone(),
                    allowed_methods: service.cors.allowed_methods.clone(),
                    allowed_headers: service.cors.allowed_headers.clone(),
                    expose_headers: service.cors.expose_headers.clone(),
                    max_age: service.cors.max_age,
                },
            },
            driver: config
                .driver
                .iter()
                .map(|(key, value)| (key.clone(), value.to_string()))
                .collect(),
        })
    }
}

fn message_queue(store: &CanonicalStore) -> Result<Option<MessageQueueSnapshot>, ConfigError> {
    let kind = store.require_str(MESSAGE_BUS_TYPE_KEY)?;
    let mqtt = match kind {
        "mqtt" => true,
        "redis" => false,
        _ => return Ok(None),
    };

    let mut queue = MessageQueueSnapshot {
        kind: kind.to_string(),
        protocol: store.require_str("MessageBus/Protocol")?.to_string(),
        host: store.require_str("MessageBus/Host")?.to_string(),
        port: store.require_u16("MessageBus/Port")?,
        topic: store.require_str("MessageBus/PublishTopicPrefix")?.to_string(),
        auth_mode: store.require_str("MessageBus/AuthMode")?.to_string(),
        secret_name: store.require_str("MessageBus/SecretName")?.to_string(),
        optional: None,
        topics: None,
    };

    if mqtt {
        queue.optional = Some(MqttOptionalSnapshot {
            client_id: store.require_str("MessageBus/Optional/ClientId")?.to_string(),
            qos: store.require_u16("MessageBus/Optional/Qos")?,
            keep_alive: store.require_u16("MessageBus/Optional/KeepAlive")?,
            retained: store.require_bool("MessageBus/Optional/Retained")?,
            cert_file: store.require_str("MessageBus/Optional/CertFile")?.to_string(),
            key_file: store.require_str("MessageBus/Optional/KeyFile")?.to_string(),
            skip_cert_verify: store.require_bool("MessageBus/Optional/SkipCertVerify")?,
        });
        queue.topics = Some(TopicsSnapshot {
            command_request_topic: store.require_str("MessageBus/Topics/CommandRequestTopic")?.to_string(),
            command_response_topic_prefix: store
                .require_str("MessageBus/Topics/CommandResponseTopicPrefix")?
                .to_string(),
        });
    }

    Ok(Some(queue))
}
