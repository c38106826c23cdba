//! Process-wide `tracing` setup shared by the CLI and integration tests.
//!
//! Events always land in a daily rolling file under the resolved log
//! directory and can additionally be mirrored to `stderr`. Only the first
//! [`init_logging`] call installs anything; later calls hand back the path
//! chosen the first time.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Environment variable that relocates logs when no directory is configured.
pub const LOG_DIR_ENV: &str = "AIRSCOUT_LOG_DIR";

static INSTALLED: OnceLock<(PathBuf, WorkerGuard)> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

impl LogFormat {
    fn layer(self, writer: NonBlocking) -> BoxedLayer {
        match self {
            Self::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
            Self::Json => fmt::layer().json().with_writer(writer).boxed(),
        }
    }

    fn stderr_layer(self) -> BoxedLayer {
        match self {
            Self::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
            Self::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        }
    }
}

/// Settings for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the fallback directory.
    pub app_name: &'static str,
    /// Explicit directory; `~/` is expanded. Falls back to `AIRSCOUT_LOG_DIR`,
    /// then the platform data directory.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is unset, e.g. `"info,airscout_fetch=debug"`.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "airscout",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some((path, _)) = INSTALLED.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let prefix = format!("{}.log", config.app_name);
    let today_file = dir.join(format!("{prefix}.{}", Local::now().format("%Y-%m-%d")));
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));

    let mut layers = vec![config.format.layer(writer)];
    if config.emit_stderr {
        layers.push(config.format.stderr_layer());
    }
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .with_context(|| format!("invalid log filter {:?}", config.default_filter))?;

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("a global tracing subscriber is already set: {e}"))?;

    let _ = INSTALLED.set((today_file.clone(), guard));
    tracing::debug!(target: "airscout.logging", file = %today_file.display(), "logging.ready");
    Ok(today_file)
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from));
    match configured {
        Some(dir) => expand_home(&dir),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(app_name),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
