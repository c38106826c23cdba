#![allow(dead_code)]

use airscout_common::observability::{LogConfig, LogFormat};
use airscout_drivers::{BrowserSession, DriverError, SessionProvider, Selector};
use airscout_fetch::Timeouts;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

static INIT_PATH: OnceLock<PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "airscout-tests",
            log_dir: Some(std::env::temp_dir().join("airscout-tests")),
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "debug".to_string(),
        };
        airscout_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Buttons whose click starts a file transfer on either site.
const DOWNLOAD_CONTROLS: &[&str] = &[
    "div.histui.ui.large.primary.button",
    "[title='Download CSV']",
];

/// Side channel shared by a provider and every session it opens.
#[derive(Clone, Default)]
pub struct Probe {
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub downloads: Arc<AtomicUsize>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Probe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// In-memory browser.
///
/// Pages whose URL mentions `atlantis` have no usable controls; pages
/// mentioning `slow` never finish loading. Clicking a download control
/// writes a CSV into the session's download directory unless the provider
/// was built with `silent_downloads`.
#[derive(Clone, Default)]
pub struct FakeProvider {
    pub probe: Probe,
    pub fail_open: bool,
    pub silent_downloads: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn open(&self, download_dir: &Path) -> Result<Box<dyn BrowserSession>, DriverError> {
        if self.fail_open {
            return Err(DriverError::Launch("webdriver refused connection".into()));
        }
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            probe: self.probe.clone(),
            download_dir: download_dir.to_path_buf(),
            silent_downloads: self.silent_downloads,
            url: String::new(),
        }))
    }
}

struct FakeSession {
    probe: Probe,
    download_dir: PathBuf,
    silent_downloads: bool,
    url: String,
}

impl FakeSession {
    fn record(&self, call: String) {
        self.probe.calls.lock().unwrap().push(call);
    }

    async fn page_ready(&self, selector: &Selector) -> Result<(), DriverError> {
        if self.url.contains("slow") {
            std::future::pending::<()>().await;
        }
        if self.url.contains("atlantis") {
            return Err(DriverError::ElementNotFound(selector.clone()));
        }
        Ok(())
    }

    fn pressed(&self, selector: &Selector) {
        let is_download = matches!(selector, Selector::Css(s) if DOWNLOAD_CONTROLS.contains(&s.as_str()));
        if is_download && !self.silent_downloads {
            let n = self.probe.downloads.fetch_add(1, Ordering::SeqCst);
            let path = self.download_dir.join(format!("export-{n}.csv"));
            std::fs::write(path, "date,value\n2020-01-01,1.0\n").unwrap();
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(format!("goto {url}"));
        self.url = url.to_string();
        Ok(())
    }

    async fn refresh(&mut self) -> Result<(), DriverError> {
        self.record("refresh".into());
        Ok(())
    }

    async fn wait_until_gone(&mut self, selector: &Selector, _: Duration) -> Result<(), DriverError> {
        self.record(format!("gone {selector}"));
        Ok(())
    }

    async fn wait_until_present(&mut self, selector: &Selector, _: Duration) -> Result<(), DriverError> {
        self.record(format!("present {selector}"));
        self.page_ready(selector).await
    }

    async fn wait_until_clickable(&mut self, selector: &Selector, _: Duration) -> Result<(), DriverError> {
        self.record(format!("clickable {selector}"));
        self.page_ready(selector).await
    }

    async fn click(&mut self, selector: &Selector) -> Result<(), DriverError> {
        self.record(format!("click {selector}"));
        self.pressed(selector);
        Ok(())
    }

    async fn script_click(&mut self, selector: &Selector) -> Result<(), DriverError> {
        self.record(format!("script_click {selector}"));
        self.pressed(selector);
        Ok(())
    }

    async fn type_text(&mut self, selector: &Selector, text: &str) -> Result<(), DriverError> {
        self.record(format!("type {selector} {}", text.len()));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        navigate: Duration::from_secs(2),
        interactive: Duration::from_millis(200),
        trigger: Duration::from_secs(2),
        select_format: Duration::from_secs(2),
        download: Duration::from_millis(300),
        poll: Duration::from_millis(10),
    }
}

pub fn csv_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".csv"))
        .collect();
    names.sort();
    names
}
