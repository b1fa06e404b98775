//! Registry of recognizer models.
//!
//! Knows which models the daemon can load, where their files live under the
//! models directory, and how to turn a missing installation into an
//! actionable error instead of a bare load failure.

use std::path::{Path, PathBuf};

use super::RecognizerError;

/// Default model name when none is configured.
pub const DEFAULT_MODEL: &str = "texocr-base";

/// Files required for any optimum-exported encoder/decoder model.
pub const REQUIRED_MODEL_FILES: &[&str] =
    &["encoder_model.onnx", "decoder_model.onnx", "tokenizer.json"];

/// Information about a registered recognizer model.
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    /// Short name for CLI/config (e.g., "texocr-base").
    pub name: &'static str,
    /// Unique model ID used in logs and notifications.
    pub id: &'static str,
    /// Directory name under `<models_dir>/`.
    pub dir_name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Upstream model source for download/reference.
    pub huggingface_id: &'static str,
    /// Approximate on-disk size in bytes.
    pub size_bytes: u64,
}

impl RegisteredModel {
    /// Directory holding this model's files.
    pub fn model_dir(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.dir_name)
    }

    /// Check whether all required files are present.
    pub fn is_available(&self, models_dir: &Path) -> bool {
        let dir = self.model_dir(models_dir);
        REQUIRED_MODEL_FILES.iter().all(|f| dir.join(f).is_file())
    }

    /// List the required files that are missing.
    pub fn missing_files(&self, models_dir: &Path) -> Vec<String> {
        let dir = self.model_dir(models_dir);
        REQUIRED_MODEL_FILES
            .iter()
            .filter(|f| !dir.join(*f).is_file())
            .map(|f| (*f).to_string())
            .collect()
    }
}

/// Static registry of all supported recognizer models.
pub static MODELS: &[RegisteredModel] = &[RegisteredModel {
    name: "texocr-base",
    id: "texocr-base-onnx",
    dir_name: "texocr-base",
    description: "Encoder/decoder math OCR - printed and handwritten formulas",
    huggingface_id: "OleehyO/TexTeller",
    size_bytes: 300_000_000,
}];

/// Model registry bound to a models directory.
pub struct ModelRegistry {
    models_dir: PathBuf,
}

impl ModelRegistry {
    pub fn new(models_dir: &Path) -> Self {
        Self {
            models_dir: models_dir.to_path_buf(),
        }
    }

    /// Get all registered models.
    pub fn all(&self) -> &'static [RegisteredModel] {
        MODELS
    }

    /// Get model info by name or id.
    pub fn get(&self, name: &str) -> Option<&'static RegisteredModel> {
        let name = name.to_ascii_lowercase();
        MODELS.iter().find(|m| m.name == name || m.id == name)
    }

    /// Check availability by name.
    pub fn is_available(&self, name: &str) -> bool {
        self.get(name)
            .map(|m| m.is_available(&self.models_dir))
            .unwrap_or(false)
    }

    /// Validate that a model is ready to load.
    ///
    /// Returns the registered entry, or an [`RecognizerError::Unavailable`]
    /// naming the missing files and the directory that was searched.
    pub fn validate(&self, name: &str) -> Result<&'static RegisteredModel, RecognizerError> {
        let model = self.get(name).ok_or_else(|| {
            RecognizerError::Unavailable(format!(
                "unknown model '{}'. Registered: {}",
                name,
                MODELS.iter().map(|m| m.name).collect::<Vec<_>>().join(", ")
            ))
        })?;

        if !model.is_available(&self.models_dir) {
            let missing = model.missing_files(&self.models_dir);
            return Err(RecognizerError::Unavailable(format!(
                "model '{}' not installed: missing {} in {}. Fetch it from https://huggingface.co/{}",
                model.name,
                missing.join(", "),
                model.model_dir(&self.models_dir).display(),
                model.huggingface_id
            )));
        }

        Ok(model)
    }
}
