//! Resident prediction daemon.
//!
//! The daemon keeps the recognizer loaded and turns filesystem writes to one
//! well-known image path into clipboard-ready LaTeX:
//!
//! ```text
//! ┌──────────────┐   TriggerEvent   ┌───────────┐  PredictionJob  ┌───────────┐
//! │ FileWatch    │ ───────────────▶ │ Debouncer │ ──────────────▶ │ JobRunner │
//! │ (notify)     │   (channel)      │ (quiet    │  (bounded       │ (single-  │
//! └──────────────┘                  │  window)  │   channel)      │  flight)  │
//!                                   └───────────┘                 └─────┬─────┘
//!                                                                       │
//!                                                  ┌────────────────────┴───┐
//!                                                  ▼                        ▼
//!                                            ClipboardSink          NotificationSink
//! ```
//!
//! The watcher and debouncer run on their own threads; the runner loop is
//! the single consumer, which is what makes the shared recognizer handle
//! safe without per-call locking. [`controller::Daemon`] owns startup
//! ordering and teardown; the CLI shell owns signals and the shutdown grace.

pub mod controller;
pub mod debounce;
pub mod runner;
pub mod watcher;

use thiserror::Error;

// Re-export key types for convenience
pub use controller::Daemon;
pub use debounce::{Debouncer, PredictionJob};
pub use runner::{JobRunner, JobStatus, PredictionOutcome, RunnerMetrics};
pub use watcher::{FileWatch, TriggerEvent, TriggerKind};

/// Startup failures. Any of these prevents the daemon from entering its
/// serving loop; per-job failures are [`JobStatus`] values instead.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("model load failed: {0}")]
    Model(#[from] crate::model::RecognizerError),

    #[error("filesystem watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
