//! Watches the config file and asks the config actor to reload it on change.
//!
//! Editors tend to replace files via rename or write through a symlink, so
//! relevance is decided by file identity (canonical path, dev/inode pair)
//! rather than by the watched path alone.

use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, thread};

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEvent, DebouncedEventKind, new_debouncer};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::actor::config::{self as config_actor, Event as ConfigEvent};
use crate::common::config::{Config, ConfigCommand};
use crate::sys::executor::Executor;

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Stable identity of the config file, resilient to atomic-rename saves.
struct FileIdentity {
    path: PathBuf,
    canonical: Option<PathBuf>,
    dev_ino: Option<(u64, u64)>,
}

impl FileIdentity {
    fn of(path: PathBuf) -> Self {
        let canonical = fs::canonicalize(&path).ok();
        let dev_ino = canonical
            .as_deref()
            .or(Some(path.as_path()))
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| (m.dev(), m.ino()));
        FileIdentity { path, canonical, dev_ino }
    }

    /// Directories that need watching to observe this file.
    fn parents(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for p in [Some(self.path.as_path()), self.canonical.as_deref()].into_iter().flatten() {
            if let Some(dir) = p.parent()
                && !dirs.contains(&dir.to_path_buf())
            {
                dirs.push(dir.to_path_buf());
            }
        }
        dirs
    }

    fn matches(&self, changed: &Path) -> bool {
        if changed == self.path || Some(changed) == self.canonical.as_deref() {
            return true;
        }
        if let Ok(real) = fs::canonicalize(changed)
            && Some(real.as_path()) == self.canonical.as_deref()
        {
            return true;
        }
        if let (Ok(meta), Some((dev, ino))) = (fs::metadata(changed), self.dev_ino)
            && meta.dev() == dev
            && meta.ino() == ino
        {
            return true;
        }
        changed.file_name().is_some_and(|n| Some(n) == self.path.file_name())
    }
}

pub struct ConfigWatcher {
    file: FileIdentity,
    config_tx: config_actor::Sender,
    hot_reload: bool,
}

impl ConfigWatcher {
    pub fn spawn(config_tx: config_actor::Sender, config: Config, config_path: PathBuf) {
        let actor = ConfigWatcher {
            file: FileIdentity::of(config_path),
            config_tx,
            hot_reload: config.settings.hot_reload,
        };
        thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || {
                Executor::run(async move {
                    if let Err(e) = actor.run().await {
                        warn!("config-watcher: error: {e:?}");
                    }
                })
            })
            .expect("failed to spawn config-watcher thread");
    }

    async fn run(mut self) -> notify::Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DebouncedEvent>();

        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for e in events {
                    if e.kind == DebouncedEventKind::Any {
                        let _ = tx.send(e);
                    }
                }
            }
        })?;

        for dir in self.file.parents() {
            debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;
            info!("watching {:?}", dir);
        }

        while let Some(event) = rx.recv().await {
            if !self.file.matches(&event.path) {
                continue;
            }
            trace!("change detected (debounced): {:?}", event.path);

            if !self.hot_reload {
                debug!("hot reload disabled, ignoring change");
                continue;
            }
            if self.request_reload().await
                && let Some(new_config) = self.query_config().await
            {
                self.hot_reload = new_config.settings.hot_reload;
            }
        }

        Ok(())
    }

    async fn request_reload(&self) -> bool {
        info!("requesting config reload");
        let (tx, rx) = oneshot::channel();
        let msg = ConfigEvent::Apply {
            cmd: ConfigCommand::ReloadConfig,
            response: Some(tx),
        };
        if self.config_tx.try_send(msg).is_err() {
            warn!("config actor unavailable");
            return false;
        }
        matches!(rx.await, Ok(Ok(())))
    }

    async fn query_config(&self) -> Option<Config> {
        let (tx, rx) = oneshot::channel();
        self.config_tx.try_send(ConfigEvent::Query(tx)).ok()?;
        rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_tracks_renamed_siblings_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(&path, "").unwrap();
        let id = FileIdentity::of(path.clone());

        assert!(id.matches(&path));
        // Atomic saves often report the temp file under the same name.
        assert!(id.matches(&dir.path().join("strata.toml")));
        assert!(!id.matches(&dir.path().join("other.toml")));
    }

    #[test]
    fn identity_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.toml");
        fs::write(&target, "").unwrap();
        let link = dir.path().join("link.toml");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let id = FileIdentity::of(link);
        assert!(id.matches(&target));
    }

    #[test]
    fn parents_deduped() {
        let guard = tempfile::tempdir().unwrap();
        // Use the canonical directory so the watched and canonical parents
        // coincide.
        let dir = fs::canonicalize(guard.path()).unwrap();
        let path = dir.join("strata.toml");
        fs::write(&path, "").unwrap();
        let id = FileIdentity::of(path);
        assert_eq!(id.parents().len(), 1);
    }
}
