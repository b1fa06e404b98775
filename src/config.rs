//! Daemon configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML config file,
//! then `SNAPTEX_*` environment variables, then CLI flags (applied by the
//! CLI layer). Every knob has a sensible default so `snaptex run` works with
//! no configuration at all once a model is installed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::daemon::DaemonError;

/// Default trigger file: a well-known name in the platform temp directory,
/// where screenshot tools can be pointed without extra setup.
static DEFAULT_WATCH_PATH: Lazy<PathBuf> =
    Lazy::new(|| std::env::temp_dir().join("snaptex.png"));

/// Runtime configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// The image path whose creation/modification triggers predictions.
    pub watch_path: PathBuf,
    /// Quiet window after the last raw event before a job is emitted.
    pub debounce: Duration,
    /// How long shutdown waits for an in-flight job before abandoning it.
    pub grace: Duration,
    /// Directory holding installed model directories.
    pub models_dir: PathBuf,
    /// Registered model name to load.
    pub model: String,
    /// Run a synthetic warmup inference at startup.
    pub warmup: bool,
    /// Bounded depth of the job queue between debouncer and runner.
    pub queue_depth: usize,
    /// Application name shown in desktop notifications.
    pub app_name: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            watch_path: DEFAULT_WATCH_PATH.clone(),
            debounce: Duration::from_millis(300),
            grace: Duration::from_secs(5),
            models_dir: default_models_dir(),
            model: crate::model::registry::DEFAULT_MODEL.to_string(),
            warmup: true,
            queue_depth: 4,
            app_name: "SnapTeX".to_string(),
        }
    }
}

/// Serde shape of the optional config file; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    watch_path: Option<PathBuf>,
    debounce_ms: Option<u64>,
    grace_ms: Option<u64>,
    models_dir: Option<PathBuf>,
    model: Option<String>,
    warmup: Option<bool>,
    queue_depth: Option<usize>,
    app_name: Option<String>,
}

impl DaemonConfig {
    /// Defaults overlaid with the config file (if present) and environment.
    ///
    /// `config_path` of `None` means the platform default location; a file
    /// that does not exist is fine, a file that exists but does not parse is
    /// a startup error.
    pub fn load(config_path: Option<&Path>) -> Result<Self, DaemonError> {
        let mut cfg = Self::default();

        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        if path.is_file() {
            let raw = std::fs::read_to_string(&path)?;
            let file: ConfigFile = toml::from_str(&raw)
                .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))?;
            cfg.apply_file(file);
        }

        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.watch_path {
            self.watch_path = v;
        }
        if let Some(v) = file.debounce_ms {
            self.debounce = Duration::from_millis(v);
        }
        if let Some(v) = file.grace_ms {
            self.grace = Duration::from_millis(v);
        }
        if let Some(v) = file.models_dir {
            self.models_dir = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.warmup {
            self.warmup = v;
        }
        if let Some(v) = file.queue_depth {
            self.queue_depth = v;
        }
        if let Some(v) = file.app_name {
            self.app_name = v;
        }
    }

    /// Environment overrides, `SNAPTEX_*`.
    fn apply_env(&mut self) {
        if let Ok(path) = dotenvy::var("SNAPTEX_WATCH_PATH") {
            self.watch_path = PathBuf::from(path);
        }
        if let Ok(val) = dotenvy::var("SNAPTEX_DEBOUNCE_MS")
            && let Ok(ms) = val.parse()
        {
            self.debounce = Duration::from_millis(ms);
        }
        if let Ok(val) = dotenvy::var("SNAPTEX_GRACE_MS")
            && let Ok(ms) = val.parse()
        {
            self.grace = Duration::from_millis(ms);
        }
        if let Ok(path) = dotenvy::var("SNAPTEX_MODELS_DIR") {
            self.models_dir = PathBuf::from(path);
        }
        if let Ok(name) = dotenvy::var("SNAPTEX_MODEL") {
            self.model = name;
        }
        if let Ok(val) = dotenvy::var("SNAPTEX_WARMUP") {
            self.warmup = val != "0";
        }
        if let Ok(val) = dotenvy::var("SNAPTEX_QUEUE_DEPTH")
            && let Ok(n) = val.parse()
        {
            self.queue_depth = n;
        }
        if let Ok(name) = dotenvy::var("SNAPTEX_APP_NAME") {
            self.app_name = name;
        }
    }

    fn validate(&self) -> Result<(), DaemonError> {
        if self.debounce.is_zero() {
            return Err(DaemonError::Config(
                "debounce_ms must be greater than zero".into(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(DaemonError::Config(
                "queue_depth must be greater than zero".into(),
            ));
        }
        if self.watch_path.file_name().is_none() {
            return Err(DaemonError::Config(format!(
                "watch_path has no file name: {}",
                self.watch_path.display()
            )));
        }
        Ok(())
    }
}

/// Platform data dir for installed models, e.g.
/// `~/.local/share/snaptex/models` on Linux.
pub fn default_models_dir() -> PathBuf {
    default_data_dir().join("models")
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "snaptex", "snaptex")
        .expect("project dirs available")
        .data_dir()
        .to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("com", "snaptex", "snaptex")
        .expect("project dirs available")
        .config_dir()
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_sane() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.debounce, Duration::from_millis(300));
        assert_eq!(cfg.queue_depth, 4);
        assert!(cfg.warmup);
        assert_eq!(cfg.watch_path.file_name().unwrap(), "snaptex.png");
    }

    #[test]
    #[serial]
    fn file_overlay_then_env_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "debounce_ms = 150\nmodel = \"texocr-base\"\n").unwrap();

        // SAFETY: test-only env mutation, serialized via #[serial].
        unsafe { std::env::set_var("SNAPTEX_DEBOUNCE_MS", "700") };
        let cfg = DaemonConfig::load(Some(&path)).unwrap();
        unsafe { std::env::remove_var("SNAPTEX_DEBOUNCE_MS") };

        assert_eq!(cfg.debounce, Duration::from_millis(700));
        assert_eq!(cfg.model, "texocr-base");
    }

    #[test]
    #[serial]
    fn missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = DaemonConfig::load(Some(&tmp.path().join("nope.toml"))).unwrap();
        assert_eq!(cfg.debounce, Duration::from_millis(300));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "debounce_ms = \"soon\"").unwrap();

        let err = DaemonConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn zero_debounce_rejected() {
        let cfg = DaemonConfig {
            debounce: Duration::ZERO,
            ..DaemonConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
