//! Desktop notification sink backed by notify-rust.

use super::{NotificationSink, SinkError, Urgency};

/// Desktop notifier carrying the application name shown by the
/// notification daemon.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl NotificationSink for DesktopNotifier {
    fn send(&self, summary: &str, body: &str, urgency: Urgency) -> Result<(), SinkError> {
        let mut notification = notify_rust::Notification::new();
        notification
            .appname(&self.app_name)
            .summary(summary)
            .body(body);

        // Urgency hints are an XDG extension; macOS/Windows backends ignore them.
        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(match urgency {
            Urgency::Normal => notify_rust::Urgency::Normal,
            Urgency::Critical => notify_rust::Urgency::Critical,
        });
        #[cfg(not(all(unix, not(target_os = "macos"))))]
        let _ = urgency;

        notification
            .show()
            .map(|_| ())
            .map_err(|e| SinkError::Notification(e.to_string()))
    }
}
