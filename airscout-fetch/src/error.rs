use airscout_drivers::DriverError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Where a download run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    Idle,
    SessionReady,
    Navigated,
    TriggerPending,
    Downloading,
    Completed,
    Errored,
}

impl FetchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FetchState::Completed | FetchState::Errored)
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchState::Idle => "idle",
            FetchState::SessionReady => "session_ready",
            FetchState::Navigated => "navigated",
            FetchState::TriggerPending => "trigger_pending",
            FetchState::Downloading => "downloading",
            FetchState::Completed => "completed",
            FetchState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// The bounded step a run was executing when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStep {
    OpenSession,
    Navigate,
    AwaitInteractive,
    TriggerDownload,
    SelectFormat,
    AwaitFile,
    Rename,
}

impl fmt::Display for FetchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchStep::OpenSession => "open_session",
            FetchStep::Navigate => "navigate",
            FetchStep::AwaitInteractive => "await_interactive",
            FetchStep::TriggerDownload => "trigger_download",
            FetchStep::SelectFormat => "select_format",
            FetchStep::AwaitFile => "await_file",
            FetchStep::Rename => "rename",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid download target: {0}")]
    InvalidInput(String),

    #[error("browser session failed during {step}: {message}")]
    Session { step: FetchStep, message: String },

    #[error("{step} did not finish within {after:?}")]
    Timeout { step: FetchStep, after: Duration },

    #[error("{step}: element {selector} not found or not clickable")]
    ElementNotFound { step: FetchStep, selector: String },

    #[error("refusing to overwrite existing file {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled while {state}")]
    Cancelled { state: FetchState },
}

impl FetchError {
    /// Attribute a driver failure to the step that issued the command.
    pub fn from_driver(step: FetchStep, err: DriverError) -> Self {
        match err {
            DriverError::Timeout { waited, .. } => FetchError::Timeout {
                step,
                after: waited,
            },
            DriverError::ElementNotFound(selector) => FetchError::ElementNotFound {
                step,
                selector: selector.to_string(),
            },
            DriverError::Launch(message) | DriverError::Command(message) => {
                FetchError::Session { step, message }
            }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly name, used in logs and batch summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidInput(_) => "invalid_input",
            FetchError::Session { .. } => "session",
            FetchError::Timeout { .. } => "timeout",
            FetchError::ElementNotFound { .. } => "element_not_found",
            FetchError::DestinationExists(_) => "destination_exists",
            FetchError::Io { .. } => "io",
            FetchError::Cancelled { .. } => "cancelled",
        }
    }
}
