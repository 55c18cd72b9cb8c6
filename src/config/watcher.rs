//! Remote pairs file watcher for hot reconfiguration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::error::ConfigError;
use crate::config::remote::NameValuePairs;

/// Monitors a remote pairs file and delivers its decoded contents on every
/// change.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<NameValuePairs>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for decoded pair lists.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<NameValuePairs>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, ConfigError> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Remote configuration change detected");
                        match NameValuePairs::load(&path) {
                            Ok(pairs) => {
                                let _ = tx.send(pairs);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Unable to read remote configuration, keeping current");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Remote configuration watcher started");
        Ok(watcher)
    }
}
