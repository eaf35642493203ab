//! Hot reload of the configuration file.
//!
//! The parent directory is watched and events are filtered by file name, so a
//! file replaced by renaming a temporary over it keeps reloading.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::EdgeConfig;

/// Sends a freshly validated [`EdgeConfig`] whenever the file's content changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<EdgeConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<EdgeConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Updates stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsString::from);
        let mut reload = Reload {
            path: self.path.clone(),
            update_tx: self.update_tx,
            last_applied: fs::read_to_string(&self.path).ok(),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(OsString::from) == file_name);
                    if ours && (event.kind.is_modify() || event.kind.is_create()) {
                        reload.apply();
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, directory = ?directory, "Config watcher started");
        Ok(watcher)
    }
}

/// Reload state carried by the watch callback.
struct Reload {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<EdgeConfig>,
    last_applied: Option<String>,
}

impl Reload {
    fn apply(&mut self) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(error = %e, "Config file unreadable, waiting for next change");
                return;
            }
        };

        // A truncate-then-write save is briefly empty, and empty parses as all defaults.
        if content.trim().is_empty() {
            tracing::debug!("Config file empty, waiting for next change");
            return;
        }
        if self.last_applied.as_deref() == Some(content.as_str()) {
            return;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file change detected, reloading");
                self.last_applied = Some(content);
                let _ = self.update_tx.send(config);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_title(title: &str) -> String {
        format!("[experiment]\npage_title = \"{title}\"\n")
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("variant-edge-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn save_atomically(path: &Path, content: &str) {
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content).unwrap();
        fs::rename(&tmp, path).unwrap();
    }

    async fn next_title(updates: &mut mpsc::UnboundedReceiver<EdgeConfig>) -> String {
        tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .expect("reload within timeout")
            .expect("watcher still running")
            .experiment
            .page_title
    }

    #[tokio::test]
    async fn every_atomic_save_is_reloaded() {
        let dir = scratch_dir();
        let path = dir.join("edge.toml");
        fs::write(&path, config_with_title("v0")).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        for title in ["v1", "v2", "v3"] {
            save_atomically(&path, &config_with_title(title));
            assert_eq!(next_title(&mut updates).await, title);
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn empty_and_unchanged_content_is_skipped() {
        let dir = scratch_dir();
        let path = dir.join("edge.toml");
        fs::write(&path, config_with_title("v0")).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        fs::write(&path, "").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&path, config_with_title("v0")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&path, config_with_title("v1")).unwrap();

        assert_eq!(next_title(&mut updates).await, "v1");
        let _ = fs::remove_dir_all(&dir);
    }
}
