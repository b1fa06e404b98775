//! Quiet-window debouncing of raw trigger events.
//!
//! A single logical "save" by an external image-writing tool can surface as
//! several raw write notifications. The debouncer collapses any burst that
//! stays inside the configured quiet window into one [`PredictionJob`],
//! carrying the most recent event's path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use super::watcher::TriggerEvent;

/// One unit of work for the runner, emitted after a quiet window elapses.
#[derive(Debug, Clone)]
pub struct PredictionJob {
    /// Monotonic job counter, starting at 1.
    pub id: u64,
    /// Path from the burst's most recent event.
    pub path: std::path::PathBuf,
    pub enqueued_at: Instant,
    /// Processing attempts so far; jobs are never retried automatically, so
    /// this stays 0 until a retry policy exists to bump it.
    pub attempt: u32,
}

/// Collapses event bursts into jobs.
///
/// The daemon watches a single path, so one pending slot suffices: each
/// incoming event replaces the slot and restarts the quiet window.
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Consume raw events until the channel disconnects or `shutdown` is set.
    ///
    /// Jobs go into `jobs`, a bounded channel: if the runner still has a job
    /// in flight and the queue is full, the send blocks, so later triggers
    /// queue behind the in-flight work instead of being dropped or run
    /// concurrently.
    pub fn run(
        &self,
        raw: &Receiver<TriggerEvent>,
        jobs: &Sender<PredictionJob>,
        shutdown: &AtomicBool,
    ) {
        let mut pending: Option<TriggerEvent> = None;
        let mut next_id: u64 = 0;

        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            match raw.recv_timeout(self.window) {
                Ok(event) => {
                    // Restart the quiet window; the newest event wins.
                    pending = Some(event);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(event) = pending.take() {
                        next_id += 1;
                        let job = PredictionJob {
                            id: next_id,
                            path: event.path,
                            enqueued_at: Instant::now(),
                            attempt: 0,
                        };
                        debug!(job_id = job.id, path = %job.path.display(), "quiet window elapsed");
                        if jobs.send(job).is_err() {
                            break; // Runner gone
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}
