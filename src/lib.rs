pub mod config;
pub mod daemon;
pub mod logging;
pub mod model;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};

use config::DaemonConfig;
use daemon::Daemon;
use model::ModelRegistry;
use output::{ClipboardSink, SystemClipboard};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "snaptex",
    version,
    long_version = long_version(),
    about = "Resident math-OCR daemon: screenshot in, LaTeX on the clipboard"
)]
pub struct Cli {
    /// Path to the TOML config file (defaults to the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daemon in the foreground (ctrl-c to stop)
    Run {
        /// Override the watched image path
        #[arg(long)]
        watch_path: Option<PathBuf>,

        /// Override the debounce quiet window in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Override the models directory
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Registered model name to load
        #[arg(long)]
        model: Option<String>,

        /// Skip the synthetic warmup inference
        #[arg(long, default_value_t = false)]
        no_warmup: bool,
    },
    /// One-shot recognition of an image file
    Predict {
        /// Image to recognize
        image: PathBuf,

        /// Override the models directory
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Registered model name to load
        #[arg(long)]
        model: Option<String>,

        /// Also copy the result to the clipboard
        #[arg(long, default_value_t = false)]
        copy: bool,
    },
    /// List registered models and their installation state
    Models {
        /// Override the models directory
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Emit machine-readable JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let _logging = logging::init();

    match cli.command {
        Commands::Run {
            watch_path,
            debounce_ms,
            models_dir,
            model,
            no_warmup,
        } => {
            let mut config = DaemonConfig::load(cli.config.as_deref())?;
            if let Some(path) = watch_path {
                config.watch_path = path;
            }
            if let Some(ms) = debounce_ms {
                config.debounce = std::time::Duration::from_millis(ms);
            }
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }
            if let Some(name) = model {
                config.model = name;
            }
            if no_warmup {
                config.warmup = false;
            }
            run_daemon(config).await
        }
        Commands::Predict {
            image,
            models_dir,
            model,
            copy,
        } => {
            let config = DaemonConfig::load(cli.config.as_deref())?;
            let models_dir = models_dir.unwrap_or(config.models_dir);
            let model = model.unwrap_or(config.model);
            run_predict(&models_dir, &model, &image, copy)
        }
        Commands::Models { models_dir, json } => {
            let config = DaemonConfig::load(cli.config.as_deref())?;
            let models_dir = models_dir.unwrap_or(config.models_dir);
            run_models(&models_dir, json)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "snaptex", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

/// Bootstrap and serve until a termination signal, honoring the configured
/// shutdown grace for an in-flight job.
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let grace = config.grace;
    let daemon = Arc::new(Daemon::bootstrap(config)?);
    if daemon.config().warmup {
        daemon.warmup();
    }

    let mut worker = {
        let daemon = daemon.clone();
        tokio::task::spawn_blocking(move || daemon.run())
    };

    tokio::select! {
        res = &mut worker => {
            // The serving loop ended on its own (channel teardown).
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            daemon.request_shutdown();
            match tokio::time::timeout(grace, &mut worker).await {
                Ok(res) => res??,
                Err(_) => {
                    warn!(grace_ms = grace.as_millis() as u64, "grace period elapsed; abandoning in-flight job");
                }
            }
        }
    }

    Ok(())
}

/// The original one-shot mode: load, recognize, print.
fn run_predict(
    models_dir: &std::path::Path,
    model: &str,
    image_path: &std::path::Path,
    copy: bool,
) -> Result<()> {
    let recognizer = model::load_recognizer(models_dir, Some(model))?;
    let bytes = std::fs::read(image_path)?;
    let decoded = image::load_from_memory(&bytes)?;

    let started = Instant::now();
    let text = recognizer.recognize(&decoded)?;
    info!(
        latency_ms = started.elapsed().as_millis() as u64,
        "prediction complete"
    );

    println!("{text}");
    if copy {
        SystemClipboard::new()
            .set_text(&text)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }
    Ok(())
}

fn run_models(models_dir: &std::path::Path, json: bool) -> Result<()> {
    let registry = ModelRegistry::new(models_dir);

    if json {
        let entries: Vec<serde_json::Value> = registry
            .all()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "id": m.id,
                    "description": m.description,
                    "source": m.huggingface_id,
                    "size_bytes": m.size_bytes,
                    "installed": m.is_available(models_dir),
                    "missing_files": m.missing_files(models_dir),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("models directory: {}", models_dir.display());
    for m in registry.all() {
        let state = if m.is_available(models_dir) {
            "installed".to_string()
        } else {
            format!("missing: {}", m.missing_files(models_dir).join(", "))
        };
        println!("  {:<14} {:<20} {}", m.name, m.id, state);
        println!("      {} (https://huggingface.co/{})", m.description, m.huggingface_id);
    }
    Ok(())
}

/// Version string enriched with vergen build metadata when available.
pub fn long_version() -> String {
    format!(
        "{} (build {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    )
}
