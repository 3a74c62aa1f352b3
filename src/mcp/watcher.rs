//! Hot reload of the tools document.
//!
//! The directory holding the document is watched rather than the file itself: editors and the
//! remote sync replace the file by rename, which would orphan a watch on the old inode.

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::registry::ToolRegistry;

/// Pause between a change notification and the re-read, so a half-written file is not parsed.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to resolve config directory {path}: {source}")]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Background watcher keeping a [`ToolRegistry`] in step with its document.
///
/// Dropping the handle stops the OS watch and the reload task.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
    tracked: PathBuf,
}

impl ConfigWatcher {
    pub fn spawn(registry: Arc<ToolRegistry>) -> Result<Self, WatchError> {
        Self::spawn_with_delay(registry, SETTLE_DELAY)
    }

    pub fn spawn_with_delay(
        registry: Arc<ToolRegistry>,
        settle: Duration,
    ) -> Result<Self, WatchError> {
        let tracked = resolve_tracked_path(registry.config_path())?;
        let dir = tracked
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(err) => tracing::warn!(error = %err, "File watcher error"),
        })
        .map_err(|source| WatchError::Notify {
            path: dir.clone(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: dir.clone(),
                source,
            })?;

        tracing::info!(path = %tracked.display(), "Watching config file for changes");

        let task = tokio::spawn(reload_loop(rx, tracked.clone(), registry, settle));

        Ok(Self {
            _watcher: watcher,
            task,
            tracked,
        })
    }

    pub fn tracked_path(&self) -> &Path {
        &self.tracked
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Absolute path of the document, with its directory canonicalized so it compares equal to the
/// paths notify reports.
fn resolve_tracked_path(config_path: &Path) -> Result<PathBuf, WatchError> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = std::fs::canonicalize(dir).map_err(|source| WatchError::Resolve {
        path: dir.to_path_buf(),
        source,
    })?;
    let file_name = config_path.file_name().unwrap_or(config_path.as_os_str());
    Ok(dir.join(file_name))
}

fn is_write_or_rename(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

fn touches(event: &Event, tracked: &Path) -> bool {
    is_write_or_rename(&event.kind) && event.paths.iter().any(|path| path == tracked)
}

async fn reload_loop(
    mut events: mpsc::UnboundedReceiver<Event>,
    tracked: PathBuf,
    registry: Arc<ToolRegistry>,
    settle: Duration,
) {
    while let Some(event) = events.recv().await {
        if !touches(&event, &tracked) {
            continue;
        }

        tracing::info!(path = %tracked.display(), "Config file changed, reloading tools");
        tokio::time::sleep(settle).await;
        // everything that queued up while settling is covered by this reload
        while events.try_recv().is_ok() {}

        match registry.reload().await {
            Ok(count) => tracing::info!(count, "Tools reloaded successfully"),
            Err(err) => tracing::error!(
                error = %err,
                "Error reloading tools, keeping previous tool set"
            ),
        }
    }

    tracing::debug!("Config watcher channel closed");
}
