//! Single-flight job execution.
//!
//! The runner is the only consumer of the jobs channel and processes one
//! job at a time: read the image, run the recognizer, dispatch the outcome.
//! FIFO order and non-overlap fall out of the single consumer thread, and
//! that discipline is what lets every job share the resident recognizer
//! handle without per-call locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{info, warn};

use crate::model::Recognizer;
use crate::output::{self, ClipboardSink, NotificationSink, Urgency};

use super::debounce::PredictionJob;

/// How often the idle runner wakes to check the shutdown flag.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Terminal result of one job.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Success { text: String },
    /// Target file unreadable or not a decodable image; the model was never
    /// invoked.
    ReadError { detail: String },
    /// The model raised during inference.
    InferenceError { detail: String },
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success { .. })
    }
}

/// Outcome of a processed job, handed to the sinks and then discarded.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub job_id: u64,
    pub status: JobStatus,
    pub latency: Duration,
}

/// Counters exposed for observability and tests.
///
/// `max_running` is the high-water mark of concurrently RUNNING jobs; the
/// single-flight guarantee holds iff it never exceeds 1.
#[derive(Debug, Default)]
pub struct RunnerMetrics {
    pub jobs_started: AtomicU64,
    pub jobs_succeeded: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub running: AtomicU64,
    pub max_running: AtomicU64,
}

/// The serialized execution path: jobs in, sink effects out.
pub struct JobRunner {
    recognizer: Arc<dyn Recognizer>,
    clipboard: Arc<dyn ClipboardSink>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<RunnerMetrics>,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        clipboard: Arc<dyn ClipboardSink>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<RunnerMetrics>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            recognizer,
            clipboard,
            notifier,
            metrics,
            shutdown,
        }
    }

    /// Consume jobs until the channel disconnects or shutdown is requested.
    ///
    /// A job already dequeued runs to completion; shutdown is only observed
    /// between jobs.
    pub fn run(&self, jobs: &Receiver<PredictionJob>) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match jobs.recv_timeout(IDLE_POLL) {
                Ok(job) => {
                    let outcome = self.process(&job);
                    self.dispatch(&outcome);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// IDLE → RUNNING → (SUCCESS | FAILED). Never touches the clipboard.
    fn process(&self, job: &PredictionJob) -> PredictionOutcome {
        let started = Instant::now();
        self.metrics.jobs_started.fetch_add(1, Ordering::SeqCst);
        let running = self.metrics.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.max_running.fetch_max(running, Ordering::SeqCst);

        info!(job_id = job.id, path = %job.path.display(), "job started");
        output::attempt(
            "notification",
            self.notifier
                .send("SnapTeX", "Recognizing formula...", Urgency::Normal),
        );

        let status = match std::fs::read(&job.path) {
            Err(e) => JobStatus::ReadError {
                detail: format!("{}: {e}", job.path.display()),
            },
            Ok(bytes) => match image::load_from_memory(&bytes) {
                Err(e) => JobStatus::ReadError {
                    detail: format!("{}: {e}", job.path.display()),
                },
                Ok(decoded) => match self.recognizer.recognize(&decoded) {
                    Ok(text) => JobStatus::Success { text },
                    Err(e) => JobStatus::InferenceError {
                        detail: e.to_string(),
                    },
                },
            },
        };

        self.metrics.running.fetch_sub(1, Ordering::SeqCst);
        PredictionOutcome {
            job_id: job.id,
            status,
            latency: started.elapsed(),
        }
    }

    /// Deliver the outcome. Sink failures are logged and swallowed; the
    /// clipboard is only written on success so a failed job can never
    /// overwrite a previous good result.
    fn dispatch(&self, outcome: &PredictionOutcome) {
        match &outcome.status {
            JobStatus::Success { text } => {
                self.metrics.jobs_succeeded.fetch_add(1, Ordering::SeqCst);
                info!(
                    job_id = outcome.job_id,
                    latency_ms = outcome.latency.as_millis() as u64,
                    chars = text.len(),
                    "job succeeded"
                );
                output::attempt("clipboard", self.clipboard.set_text(text));
                output::attempt(
                    "notification",
                    self.notifier.send(
                        "SnapTeX",
                        &format!(
                            "LaTeX copied to clipboard ({:.2}s)",
                            outcome.latency.as_secs_f64()
                        ),
                        Urgency::Normal,
                    ),
                );
            }
            JobStatus::ReadError { detail } | JobStatus::InferenceError { detail } => {
                self.metrics.jobs_failed.fetch_add(1, Ordering::SeqCst);
                warn!(job_id = outcome.job_id, detail = %detail, "job failed");
                output::attempt(
                    "notification",
                    self.notifier.send(
                        "SnapTeX",
                        &format!("Recognition failed: {detail}"),
                        Urgency::Critical,
                    ),
                );
            }
        }
    }
}
