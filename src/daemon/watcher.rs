//! Filesystem trigger watch.
//!
//! Watches the directory containing the target image (filesystem watch APIs
//! operate at directory granularity) and forwards only events for the target
//! filename. Screenshot tools commonly write a temp file and rename it over
//! the target, so rename-into-place must count as a trigger; notify reports
//! that as a modify-name event on the destination path.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crossbeam_channel::Sender;
use notify::event::EventKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tracing::{debug, info, warn};

/// Raw change notification for the watched path.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub path: PathBuf,
    pub kind: TriggerKind,
    pub observed_at: Instant,
}

/// Event kinds that count as triggers. Deletions are ignored; a
/// delete/recreate cycle produces a fresh Created trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Created,
    Modified,
}

/// Map a notify event kind onto a trigger kind, if it is one we act on.
fn classify(kind: &EventKind) -> Option<TriggerKind> {
    match kind {
        EventKind::Create(_) => Some(TriggerKind::Created),
        // Covers data writes and rename-into-place (Modify(Name(To))).
        EventKind::Modify(_) => Some(TriggerKind::Modified),
        _ => None,
    }
}

/// Active watch on the target file's directory.
///
/// Dropping the handle stops the underlying watcher thread; [`FileWatch::stop`]
/// does so explicitly and logs it.
pub struct FileWatch {
    watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl FileWatch {
    /// Establish the watch and start forwarding [`TriggerEvent`]s to `tx`.
    ///
    /// The target's parent directory is created if it does not exist yet so
    /// a freshly booted machine with an empty temp dir still works. Failure
    /// to establish the watch itself is fatal to the daemon.
    pub fn start(target: &Path, tx: Sender<TriggerEvent>) -> notify::Result<Self> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)
            .map_err(|e| notify::Error::io(e).add_path(dir.clone()))?;

        let file_name = target.file_name().map(|n| n.to_os_string());

        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "watch event error");
                    return;
                }
            };
            let Some(kind) = classify(&event.kind) else {
                return;
            };
            for path in event.paths {
                if path.file_name().map(|n| n.to_os_string()) != file_name {
                    continue;
                }
                debug!(path = %path.display(), ?kind, "trigger event");
                let _ = tx.send(TriggerEvent {
                    path,
                    kind,
                    observed_at: Instant::now(),
                });
            }
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), target = %target.display(), "watching");

        Ok(Self { watcher, dir })
    }

    /// Stop watching. Events already forwarded stay in the channel.
    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.dir) {
            debug!(error = %e, "unwatch failed");
        }
        info!(dir = %self.dir.display(), "watch stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};

    #[test]
    fn classify_create_and_modify() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(TriggerKind::Created)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Any)),
            Some(TriggerKind::Modified)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(TriggerKind::Modified)
        );
    }

    #[test]
    fn classify_ignores_removal_and_access() {
        assert_eq!(classify(&EventKind::Remove(RemoveKind::File)), None);
        assert_eq!(classify(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }
}
