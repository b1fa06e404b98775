//! Daemon lifecycle orchestration.
//!
//! Owns startup ordering (model load, warmup, watcher start), the worker
//! threads, and the shutdown flag. Process-level signals and the bounded
//! shutdown grace live in the CLI shell; this type never terminates the
//! process itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::bounded;
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::model::{self, Recognizer};
use crate::output::{
    self, ClipboardSink, DesktopNotifier, NotificationSink, SystemClipboard, Urgency,
};

use super::DaemonError;
use super::debounce::{Debouncer, PredictionJob};
use super::runner::{JobRunner, RunnerMetrics};
use super::watcher::{FileWatch, TriggerEvent};

/// The resident daemon: one recognizer handle, one serving loop.
pub struct Daemon {
    config: DaemonConfig,
    recognizer: Arc<dyn Recognizer>,
    clipboard: Arc<dyn ClipboardSink>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<RunnerMetrics>,
    shutdown: Arc<AtomicBool>,
}

impl Daemon {
    /// Assemble a daemon from explicit capabilities. Tests inject fakes here.
    pub fn new(
        config: DaemonConfig,
        recognizer: Arc<dyn Recognizer>,
        clipboard: Arc<dyn ClipboardSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            recognizer,
            clipboard,
            notifier,
            metrics: Arc::new(RunnerMetrics::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Load the model and wire up the platform sinks.
    ///
    /// Model load failure is fatal: the caller gets the error before any
    /// watcher exists and before any notification is sent.
    pub fn bootstrap(config: DaemonConfig) -> Result<Self, DaemonError> {
        let recognizer = model::load_recognizer(&config.models_dir, Some(&config.model))?;
        let notifier = DesktopNotifier::new(config.app_name.clone());
        Ok(Self::new(
            config,
            recognizer,
            Arc::new(SystemClipboard::new()),
            Arc::new(notifier),
        ))
    }

    /// One synthetic inference to pay down first-request latency.
    ///
    /// Warmup failure is logged and otherwise ignored; the first real job
    /// will surface a genuinely broken model soon enough.
    pub fn warmup(&self) {
        let started = Instant::now();
        match self.recognizer.recognize(&model::warmup_image()) {
            Ok(_) => info!(
                latency_ms = started.elapsed().as_millis() as u64,
                "warmup complete"
            ),
            Err(e) => warn!(error = %e, "warmup failed"),
        }
    }

    /// Run the serving loop on the calling thread until shutdown.
    ///
    /// Startup order: channels and worker threads first, the watcher last,
    /// so no trigger can arrive before the pipeline can absorb it.
    pub fn run(&self) -> Result<(), DaemonError> {
        let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<TriggerEvent>();
        let (job_tx, job_rx) = bounded::<PredictionJob>(self.config.queue_depth);

        let debouncer = Debouncer::new(self.config.debounce);
        let debounce_shutdown = self.shutdown.clone();
        let debounce_handle = std::thread::Builder::new()
            .name("snaptex-debounce".into())
            .spawn(move || debouncer.run(&raw_rx, &job_tx, &debounce_shutdown))?;

        let watch = FileWatch::start(&self.config.watch_path, raw_tx)?;

        info!(
            model = self.recognizer.id(),
            watch_path = %self.config.watch_path.display(),
            debounce_ms = self.config.debounce.as_millis() as u64,
            "daemon serving"
        );
        output::attempt(
            "notification",
            self.notifier.send(
                &self.config.app_name,
                &format!(
                    "Model {} loaded. Watching {}",
                    self.recognizer.id(),
                    self.config.watch_path.display()
                ),
                Urgency::Normal,
            ),
        );

        let runner = JobRunner::new(
            self.recognizer.clone(),
            self.clipboard.clone(),
            self.notifier.clone(),
            self.metrics.clone(),
            self.shutdown.clone(),
        );
        runner.run(&job_rx);

        // Teardown: stop the event source, then let the debouncer drain.
        watch.stop();
        if debounce_handle.join().is_err() {
            warn!("debounce thread panicked during shutdown");
        }

        info!(
            started = self.metrics.jobs_started.load(Ordering::SeqCst),
            succeeded = self.metrics.jobs_succeeded.load(Ordering::SeqCst),
            failed = self.metrics.jobs_failed.load(Ordering::SeqCst),
            "daemon stopped"
        );
        Ok(())
    }

    /// Ask the serving loop to stop after the in-flight job, if any.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn metrics(&self) -> &RunnerMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_flag_round_trip() {
        let shutdown = AtomicBool::new(false);
        assert!(!shutdown.load(Ordering::SeqCst));
        shutdown.store(true, Ordering::SeqCst);
        assert!(shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn bootstrap_fails_without_model() {
        let tmp = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            models_dir: tmp.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        let err = Daemon::bootstrap(config).unwrap_err();
        assert!(matches!(err, DaemonError::Model(_)));
    }
}
