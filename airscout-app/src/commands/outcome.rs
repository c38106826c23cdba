use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// One machine-readable line per target, printed as JSON.
#[derive(Debug, Serialize)]
pub(crate) struct Outcome<'a> {
    pub target: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> Outcome<'a> {
    pub fn ok(target: String, path: &'a Path) -> Self {
        Self {
            target,
            status: "ok",
            path: Some(path),
            error: None,
        }
    }

    pub fn failed(target: String, status: &'static str, error: impl ToString) -> Self {
        Self {
            target,
            status,
            path: None,
            error: Some(error.to_string()),
        }
    }
}

pub(crate) fn print_stdout(lines: &[Outcome<'_>]) -> Result<()> {
    for line in lines {
        println!("{}", serde_json::to_string(line)?);
    }
    Ok(())
}

pub(crate) fn print_stderr(lines: &[Outcome<'_>]) -> Result<()> {
    for line in lines {
        eprintln!("{}", serde_json::to_string(line)?);
    }
    Ok(())
}
