//! Reload a snapshot file when it changes on disk

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::graph::GraphSnapshot;
use crate::io::{self, IoResult};

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watch `path` and send a freshly read snapshot after every change.
///
/// The returned watcher must be kept alive for as long as reloads are
/// wanted. Must be called inside a tokio runtime.
pub fn watch_snapshot(
    path: &Path,
) -> IoResult<(RecommendedWatcher, mpsc::Receiver<GraphSnapshot>)> {
    let (change_tx, mut change_rx) = mpsc::channel::<()>(1);
    let (snapshot_tx, snapshot_rx) = mpsc::channel::<GraphSnapshot>(1);

    let target = path.to_path_buf();
    let target_name = target.file_name().map(|name| name.to_os_string());
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
        if let Ok(event) = res {
            let touches_target = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == target_name);
            if touches_target && (event.kind.is_modify() || event.kind.is_create()) {
                // A full channel already has a pending reload
                let _ = change_tx.try_send(());
            }
        }
    })?;

    // Watch the parent directory so editors that replace the file still count
    let watch_path = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        while change_rx.recv().await.is_some() {
            tokio::time::sleep(DEBOUNCE).await;
            while change_rx.try_recv().is_ok() {}

            match io::read_snapshot(&target) {
                Ok(snapshot) => {
                    debug!(path = %target.display(), nodes = snapshot.nodes.len(), "reloaded snapshot");
                    if snapshot_tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(path = %target.display(), error = %e, "failed to reload snapshot"),
            }
        }
    });

    Ok((watcher, snapshot_rx))
}
