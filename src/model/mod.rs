//! Resident recognition model.
//!
//! The daemon treats the model as an opaque capability behind the
//! [`Recognizer`] trait: an image goes in, LaTeX text comes out. Loading is
//! expensive (that is the whole reason the daemon exists) and happens exactly
//! once at startup through [`load_recognizer`]; after that the handle is
//! shared read-only and the job runner's single-flight discipline guarantees
//! `recognize` is never entered concurrently.

pub mod onnx;
pub mod registry;

use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;

pub use onnx::OnnxRecognizer;
pub use registry::{ModelRegistry, RegisteredModel};

/// Errors from model loading and inference.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// Model files missing or unknown model name. Fatal at startup.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("onnx runtime error: {0}")]
    Runtime(#[from] ort::Error),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The decode loop produced no usable sequence.
    #[error("decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Image-to-LaTeX recognition capability.
///
/// Implementations are `Send + Sync` so the handle can cross the controller
/// and runner threads, but `recognize` itself is only ever driven from the
/// runner's single execution path.
pub trait Recognizer: Send + Sync {
    /// Stable identifier of the loaded model (for logs and notifications).
    fn id(&self) -> &str;

    /// Run inference on a decoded image, returning LaTeX source.
    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognizerError>;
}

/// Load the recognizer named by `name` (or the registry default) from
/// `models_dir`. Called once during daemon startup; any error here is a
/// startup failure and the serving loop is never entered.
pub fn load_recognizer(
    models_dir: &std::path::Path,
    name: Option<&str>,
) -> Result<Arc<dyn Recognizer>, RecognizerError> {
    let registry = ModelRegistry::new(models_dir);
    let model = registry.validate(name.unwrap_or(registry::DEFAULT_MODEL))?;
    let recognizer = OnnxRecognizer::load(models_dir, model)?;
    Ok(Arc::new(recognizer))
}

/// Synthetic input for the startup warmup pass: a small blank page.
///
/// The content is irrelevant; the point is to force session initialization
/// and allocator growth before the first real screenshot arrives.
pub fn warmup_image() -> DynamicImage {
    DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
        64,
        64,
        image::Luma([255u8]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_image_is_blank_and_small() {
        let img = warmup_image();
        let luma = img.to_luma8();
        assert_eq!(luma.dimensions(), (64, 64));
        assert!(luma.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn load_fails_without_model_files() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_recognizer(tmp.path(), None).unwrap_err();
        assert!(matches!(err, RecognizerError::Unavailable(_)));
    }
}
