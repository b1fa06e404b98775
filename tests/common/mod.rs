//! Shared fixtures for integration tests: a scriptable recognizer and
//! recording sinks, so the pipeline runs without model files, a clipboard,
//! or a notification daemon.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use image::DynamicImage;
use snaptex::model::{Recognizer, RecognizerError};
use snaptex::output::{ClipboardSink, NotificationSink, SinkError, Urgency};

/// Recognizer fake. With an empty script it derives the result from the
/// image's first pixel (`x_{<shade>}`), which lets tests tie a clipboard
/// value back to a specific written file. Scripted entries are consumed
/// front-to-back; `Err` entries become inference failures.
pub struct FakeRecognizer {
    pub delay: Duration,
    scripted: Mutex<VecDeque<Result<String, String>>>,
}

impl FakeRecognizer {
    pub fn pixel() -> Self {
        Self {
            delay: Duration::ZERO,
            scripted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn pixel_with_delay(delay: Duration) -> Self {
        Self {
            delay,
            scripted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn scripted(responses: Vec<Result<String, String>>) -> Self {
        Self {
            delay: Duration::ZERO,
            scripted: Mutex::new(responses.into()),
        }
    }
}

impl Recognizer for FakeRecognizer {
    fn id(&self) -> &str {
        "fake-recognizer"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognizerError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(response) = self.scripted.lock().unwrap().pop_front() {
            return response.map_err(RecognizerError::Decode);
        }
        let shade = image.to_luma8().get_pixel(0, 0)[0];
        Ok(format!("x_{{{shade}}}"))
    }
}

/// Clipboard fake that records writes, optionally failing every call.
#[derive(Default)]
pub struct RecordingClipboard {
    pub texts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingClipboard {
    pub fn failing() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl ClipboardSink for RecordingClipboard {
    fn set_text(&self, text: &str) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Clipboard("scripted clipboard failure".into()));
        }
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Notification fake recording every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notes: Mutex<Vec<(String, String, Urgency)>>,
}

impl RecordingNotifier {
    pub fn snapshot(&self) -> Vec<(String, String, Urgency)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn critical_count(&self) -> usize {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, u)| *u == Urgency::Critical)
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn send(&self, summary: &str, body: &str, urgency: Urgency) -> Result<(), SinkError> {
        self.notes
            .lock()
            .unwrap()
            .push((summary.to_string(), body.to_string(), urgency));
        Ok(())
    }
}

/// Write an 8x8 grayscale PNG of the given shade to `path`.
pub fn write_png(path: &Path, shade: u8) {
    let img = image::GrayImage::from_pixel(8, 8, image::Luma([shade]));
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png encode");
    std::fs::write(path, bytes).expect("png write");
}
