//! System clipboard sink backed by arboard.

use super::{ClipboardSink, SinkError};

/// Clipboard sink that opens a fresh platform handle per write.
///
/// arboard handles are cheap to create and not `Sync`, so holding one across
/// jobs would force a lock for no benefit; a write happens at most once per
/// prediction.
#[derive(Debug, Default, Clone)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), SinkError> {
        arboard::Clipboard::new()
            .and_then(|mut cb| cb.set_text(text.to_owned()))
            .map_err(|e| SinkError::Clipboard(e.to_string()))
    }
}
