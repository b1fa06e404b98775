//! Best-effort delivery of prediction results to platform services.
//!
//! The daemon pushes successful predictions to the clipboard and reports
//! progress through desktop notifications. Both are side channels: a broken
//! clipboard utility or a missing notification service must never take down
//! a prediction job, so the capability traits here return a [`SinkError`]
//! that call sites log and swallow.

pub mod clipboard;
pub mod notify;

use thiserror::Error;

pub use clipboard::SystemClipboard;
pub use notify::DesktopNotifier;

/// Delivery failure from a platform sink. Never fatal to a job.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("notification delivery failed: {0}")]
    Notification(String),
}

/// Notification urgency, mirroring the desktop notification levels we emit:
/// normal for progress and success, critical for failed jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

/// Write-only clipboard capability.
pub trait ClipboardSink: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), SinkError>;
}

/// Fire-and-forget desktop notification capability.
pub trait NotificationSink: Send + Sync {
    fn send(&self, summary: &str, body: &str, urgency: Urgency) -> Result<(), SinkError>;
}

/// Attempt a sink delivery, logging failures instead of propagating them.
pub fn attempt(what: &str, result: Result<(), SinkError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "{what} delivery failed");
    }
}
