use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write report: {0}")]
    Output(#[source] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}: no header row starting with a date or time column")]
    MissingHeader(String),

    #[error("{input}: no column named {column:?} (have: {available})")]
    MissingColumn {
        input: String,
        column: String,
        available: String,
    },

    #[error("{0}: no usable observations")]
    Empty(String),
}
