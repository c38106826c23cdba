use crate::error::FetchError;
use regex::Regex;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

/// Suffixes browsers give a file while it is still being written.
const IN_PROGRESS_SUFFIXES: &[&str] = &["part", "crdownload", "download", "partial"];

/// Watches a download directory for the file produced by one trigger.
///
/// Take the snapshot before triggering; anything already present is never
/// reported as new.
#[derive(Debug)]
pub struct DownloadWatch {
    dir: PathBuf,
    pattern: Regex,
    seen: HashSet<OsString>,
}

struct Listed {
    name: OsString,
    path: PathBuf,
    stamp: SystemTime,
}

impl DownloadWatch {
    pub async fn snapshot(dir: &Path, pattern: Regex) -> Result<Self, FetchError> {
        let seen = list(dir).await?.into_iter().map(|e| e.name).collect();
        Ok(Self {
            dir: dir.to_path_buf(),
            pattern,
            seen,
        })
    }

    /// Newest finished file that was not in the snapshot, if any.
    pub async fn poll(&self) -> Result<Option<PathBuf>, FetchError> {
        let listing = list(&self.dir).await?;
        let present: HashSet<&OsStr> = listing.iter().map(|e| e.name.as_os_str()).collect();

        let mut newest: Option<&Listed> = None;
        for entry in &listing {
            if self.seen.contains(&entry.name) {
                continue;
            }
            let Some(name) = entry.name.to_str() else {
                continue;
            };
            if !self.pattern.is_match(name) || is_in_progress(name) {
                continue;
            }
            let still_writing = IN_PROGRESS_SUFFIXES
                .iter()
                .any(|suffix| present.contains(OsStr::new(&format!("{name}.{suffix}"))));
            if still_writing {
                continue;
            }
            match newest {
                Some(best) if best.stamp >= entry.stamp => {}
                _ => newest = Some(entry),
            }
        }
        Ok(newest.map(|e| e.path.clone()))
    }

    /// Poll until a new file shows up. Unbounded; callers wrap it in a timeout.
    pub async fn wait_for_new(&self, every: Duration) -> Result<PathBuf, FetchError> {
        loop {
            if let Some(path) = self.poll().await? {
                tracing::debug!(target: "fetch.watch", path = %path.display(), "download.detected");
                return Ok(path);
            }
            tokio::time::sleep(every).await;
        }
    }
}

fn is_in_progress(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| IN_PROGRESS_SUFFIXES.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

async fn list(dir: &Path) -> Result<Vec<Listed>, FetchError> {
    let mut rd = fs::read_dir(dir).await.map_err(|e| FetchError::io(dir, e))?;
    let mut out = Vec::new();
    while let Some(entry) = rd.next_entry().await.map_err(|e| FetchError::io(dir, e))? {
        // Browsers rename temp files under us; a vanished entry is simply skipped.
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let stamp = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        out.push(Listed {
            name: entry.file_name(),
            path: entry.path(),
            stamp,
        });
    }
    Ok(out)
}

/// Rename `src` to `name` inside `dir` without ever replacing an existing file.
///
/// When `name` does not already end in the downloaded file's extension, that
/// extension is appended. An occupied destination yields
/// [`FetchError::DestinationExists`] and leaves `src` where it was.
pub async fn rename_no_clobber(src: &Path, dir: &Path, name: &str) -> Result<PathBuf, FetchError> {
    let file_name = match src.extension().and_then(OsStr::to_str) {
        Some(ext) if !name.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())) => {
            format!("{name}.{ext}")
        }
        _ => name.to_string(),
    };
    let dest = dir.join(file_name);
    if dest == src {
        return Ok(dest);
    }

    match fs::hard_link(src, &dest).await {
        Ok(()) => {
            fs::remove_file(src).await.map_err(|e| FetchError::io(src, e))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(FetchError::DestinationExists(dest));
        }
        Err(link_err) => {
            // Filesystems without hard links: check, then plain rename.
            tracing::debug!(target: "fetch.watch", error = %link_err, "rename.hard_link_unsupported");
            if fs::try_exists(&dest).await.map_err(|e| FetchError::io(&dest, e))? {
                return Err(FetchError::DestinationExists(dest));
            }
            fs::rename(src, &dest).await.map_err(|e| FetchError::io(&dest, e))?;
        }
    }
    Ok(dest)
}
