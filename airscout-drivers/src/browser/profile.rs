use airscout_common::BrowserKind;
use serde_json::{json, Map, Value};
use std::path::Path;
use webdriver::capabilities::Capabilities;

/// MIME types the archive and portal sites serve their exports with.
const SAVE_WITHOUT_ASKING: &str =
    "text/csv,application/csv,text/comma-separated-values,application/x-gzip,application/octet-stream";

/// Launch options for one browser session.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub kind: BrowserKind,
    pub headless: bool,
}

impl BrowserProfile {
    pub fn new(kind: BrowserKind, headless: bool) -> Self {
        Self { kind, headless }
    }

    /// Build WebDriver capabilities that send every download straight into
    /// `download_dir` without a save dialog.
    pub fn capabilities(&self, download_dir: &Path) -> Capabilities {
        let dir = download_dir.to_string_lossy().to_string();
        let mut caps = Capabilities::new();
        match self.kind {
            BrowserKind::Chrome => {
                let mut args = vec![
                    json!("--disable-dev-shm-usage"),
                    json!("--no-sandbox"),
                    json!("--window-size=1440,900"),
                ];
                if self.headless {
                    args.push(json!("--headless=new"));
                    args.push(json!("--disable-gpu"));
                }
                let opts = json!({
                    "args": args,
                    "prefs": {
                        "download.default_directory": dir,
                        "download.prompt_for_download": false,
                        "download.directory_upgrade": true,
                        "safebrowsing.enabled": true,
                    },
                });
                caps.insert("goog:chromeOptions".to_string(), opts);
            }
            BrowserKind::Firefox => {
                let mut prefs = Map::new();
                prefs.insert("browser.download.folderList".into(), json!(2));
                prefs.insert("browser.download.dir".into(), json!(dir));
                prefs.insert(
                    "browser.download.manager.showWhenStarting".into(),
                    json!(false),
                );
                prefs.insert(
                    "browser.helperApps.neverAsk.saveToDisk".into(),
                    json!(SAVE_WITHOUT_ASKING),
                );
                let args: Vec<Value> = if self.headless {
                    vec![json!("-headless")]
                } else {
                    Vec::new()
                };
                caps.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({ "prefs": prefs, "args": args }),
                );
            }
        }
        caps
    }
}
