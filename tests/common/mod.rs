//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use edge_device_config::config::schema::TelemetryConfig;
use edge_device_config::config::{CanonicalStore, ConfigLoader, Document};
use edge_device_config::observability::{LogLevel, LogLevelSwitch};
use edge_device_config::service::{
    Collaborators, ConfigContext, DiscoveryController, DriverHandle, SecretStoreClient, TelemetryScheduler,
};

pub const SERVICE_NAME: &str = "device-simple";

/// A configuration document in the shape device services ship.
pub const FIXTURE: &str = r#"
[Writable]
LogLevel = "INFO"

  [Writable.Device]
  DataTransform = false
  [Writable.Device.Discovery]
  Enabled = false
  Interval = 30

  [Writable.Telemetry]
  Interval = "30s"
  [Writable.Telemetry.Metrics]
  EventsSent = true

  [Writable.InsecureSecrets.credentials]
  path = "credentials"
    [Writable.InsecureSecrets.credentials.Secrets]
    username = "admin"
    password = "hunter2"

[Service]
Host = "device-simple"
Port = 59999
RequestTimeout = "20s"
StartupMsg = "device simple started"

[Device]
Labels = "simple,test"
ProfilesDir = "./res/profiles"

[Clients.core-metadata]
Host = "localhost"
Port = 59881

[Driver]
SimpleDriverOption = "alpha"
"#;

/// Every call each collaborator received, in order.
#[derive(Default)]
pub struct Recorder {
    pub driver: Mutex<Vec<CanonicalStore>>,
    pub telemetry: Mutex<Vec<String>>,
    pub discovery: Mutex<Vec<(bool, u32)>>,
    pub secret_store: Mutex<usize>,
}

impl DriverHandle for Recorder {
    fn reconfigure(&self, config: &CanonicalStore) {
        self.driver.lock().unwrap().push(config.clone());
    }
}

impl TelemetryScheduler for Recorder {
    fn reschedule(&self, telemetry: &TelemetryConfig) {
        self.telemetry.lock().unwrap().push(telemetry.interval.clone());
    }
}

impl DiscoveryController for Recorder {
    fn configure(&self, enabled: bool, interval: u32) {
        self.discovery.lock().unwrap().push((enabled, interval));
    }
}

impl SecretStoreClient for Recorder {
    fn reconfigure(&self, _store: &CanonicalStore) {
        *self.secret_store.lock().unwrap() += 1;
    }
}

#[allow(dead_code)]
impl Recorder {
    pub fn driver_calls(&self) -> Vec<CanonicalStore> {
        self.driver.lock().unwrap().clone()
    }

    pub fn telemetry_calls(&self) -> Vec<String> {
        self.telemetry.lock().unwrap().clone()
    }

    pub fn discovery_calls(&self) -> Vec<(bool, u32)> {
        self.discovery.lock().unwrap().clone()
    }

    pub fn secret_store_calls(&self) -> usize {
        *self.secret_store.lock().unwrap()
    }
}

/// Driver defaults the simple driver declares.
pub fn driver_defaults() -> CanonicalStore {
    let mut defaults = CanonicalStore::new();
    defaults.insert("SimpleDriverOption", "default");
    defaults.insert("Writable/PollRate", 1000u32);
    defaults
}

/// Start a context over the fixture document with every collaborator
/// recording into the returned `Recorder`.
pub fn start_context(env: &HashMap<String, String>) -> (Arc<ConfigContext>, Arc<Recorder>) {
    let document = Document::parse(FIXTURE).unwrap();
    let defaults = driver_defaults();
    let loaded = ConfigLoader::new(SERVICE_NAME)
        .host("test-host")
        .driver_defaults(Some(&defaults))
        .document(Some(&document))
        .env(env)
        .load()
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    let hooks = Collaborators::new()
        .with_driver(recorder.clone())
        .with_telemetry(recorder.clone())
        .with_discovery(recorder.clone())
        .with_secret_store(recorder.clone());
    let logging = Arc::new(LogLevelSwitch::detached(LogLevel::Warning));

    let ctx = ConfigContext::start(SERVICE_NAME, loaded, logging, hooks).unwrap();
    (Arc::new(ctx), recorder)
}
