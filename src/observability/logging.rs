//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Name the service's log levels
//! - Switch the active level at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The level filter sits in a reload layer so reconfiguration can change it
//! - A level change is always announced at INFO, whatever the new level is

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, Registry};

type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Service log levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid LogLevel {0}")]
pub struct InvalidLogLevel(pub String);

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warning
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = InvalidLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => LogLevel::Error,
            "WARN" | "WARNING" => LogLevel::Warning,
            "INFO" => LogLevel::Info,
            "DEBUG" => LogLevel::Debug,
            "TRACE" => LogLevel::Trace,
            _ => return Err(InvalidLogLevel(s.to_string())),
        };
        Ok(level)
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// The active log level and, when installed, the subscriber's filter.
pub struct LogLevelSwitch {
    current: Mutex<LogLevel>,
    handle: Option<LevelHandle>,
}

impl LogLevelSwitch {
    /// A switch that tracks the level without a subscriber behind it.
    pub fn detached(level: LogLevel) -> Self {
        Self {
            current: Mutex::new(level),
            handle: None,
        }
    }

    fn installed(level: LogLevel, handle: LevelHandle) -> Self {
        Self {
            current: Mutex::new(level),
            handle: Some(handle),
        }
    }

    pub fn current(&self) -> LogLevel {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `level` active. Returns false when it already was.
    pub fn apply(&self, level: LogLevel) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if *current == level {
            return false;
        }
        *current = level;

        self.set_filter(LevelFilter::INFO);
        tracing::info!("Setting LogLevel to {}", level);
        self.set_filter(level.filter());
        true
    }

    fn set_filter(&self, filter: LevelFilter) {
        if let Some(handle) = &self.handle {
            if let Err(e) = handle.modify(|f| *f = filter) {
                eprintln!("failed to change log level: {}", e);
            }
        }
    }
}

impl fmt::Debug for LogLevelSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogLevelSwitch")
            .field("current", &self.current())
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

/// Install the global subscriber and return its level switch.
///
/// `RUST_LOG` may narrow output further; the switch controls the ceiling.
pub fn init_logging(initial: LogLevel) -> LogLevelSwitch {
    let (filter, handle) = reload::Layer::new(initial.filter());
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogLevelSwitch::installed(initial, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_level_names() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("Debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("LOUD".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Trace.to_string(), "TRACE");
    }

    #[test]
    fn test_switch_reports_changes_only() {
        let switch = LogLevelSwitch::detached(LogLevel::Warning);

        assert!(!switch.apply(LogLevel::Warning));
        assert!(switch.apply(LogLevel::Debug));
        assert_eq!(switch.current(), LogLevel::Debug);
    }

    #[test]
    fn test_level_change_is_announced_at_info() {
        let captured = Captured::default();
        let (filter, handle) = reload::Layer::new(LogLevel::Warning.filter());
        let subscriber = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(captured.clone())
                .with_ansi(false),
        );
        let switch = LogLevelSwitch::installed(LogLevel::Warning, handle);

        tracing::subscriber::with_default(subscriber, || {
            assert!(switch.apply(LogLevel::Error));
            tracing::warn!("below the new level");
        });

        let output = captured.contents();
        let line = output
            .lines()
            .find(|line| line.contains("Setting LogLevel to ERROR"))
            .unwrap_or_else(|| panic!("no announcement in {:?}", output));
        assert!(line.contains("INFO"));
        assert!(!output.contains("below the new level"));
    }
}
