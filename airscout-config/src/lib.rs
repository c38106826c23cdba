//! Loader for `airscout.yaml` with environment overlays.
//!
//! Sources are merged in order: YAML files and inline snippets in the order
//! they were attached, then `AIRSCOUT__SECTION__KEY` environment variables,
//! which win over any file. Afterwards every string value has `${VAR}`
//! placeholders expanded, so secrets can live in the environment while the
//! file only references them:
//!
//! ```yaml
//! geocoder:
//!   api_key: "${GOOGLE_MAPS_API_KEY}"
//!   region: cn
//! portal:
//!   credentials:
//!     username: "${EARTHDATA_USER}"
//!     password: "${EARTHDATA_PASSWORD}"
//! downloads:
//!   directory: ~/airscout/downloads
//! places: [Beijing, Shanghai, Guangzhou]
//! ```
use airscout_common::{BrowserKind, Credentials};
use airscout_common::observability::LogFormat;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "AIRSCOUT";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Deserialize)]
pub struct AirscoutConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub downloads: DownloadSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Default place list used when the CLI is not given any.
    #[serde(default)]
    pub places: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeocoderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geocoder_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_geocoder_endpoint(),
            region: default_region(),
            timeout_secs: default_geocoder_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub kind: BrowserKind,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            kind: BrowserKind::default(),
            webdriver_url: default_webdriver_url(),
            headless: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArchiveSettings {
    #[serde(default = "default_archive_url")]
    pub base_url: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: default_archive_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PortalSettings {
    #[serde(default = "default_portal_url")]
    pub base_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: default_portal_url(),
            credentials: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadSettings {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl DownloadSettings {
    /// Configured directory with `~/` expanded, or `./downloads`.
    pub fn resolved_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => match shellexpand::tilde(&dir.to_string_lossy()) {
                std::borrow::Cow::Borrowed(_) => dir.clone(),
                std::borrow::Cow::Owned(s) => PathBuf::from(s),
            },
            None => PathBuf::from("downloads"),
        }
    }
}

/// Upper bounds for each orchestrator step, in seconds unless noted.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_navigate_secs")]
    pub navigate_secs: u64,
    #[serde(default = "default_interactive_secs")]
    pub interactive_secs: u64,
    /// Portal plots can take a very long time to render.
    #[serde(default = "default_trigger_secs")]
    pub trigger_secs: u64,
    #[serde(default = "default_select_format_secs")]
    pub select_format_secs: u64,
    #[serde(default = "default_download_secs")]
    pub download_secs: u64,
    #[serde(default = "default_poll_millis")]
    pub poll_millis: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            navigate_secs: default_navigate_secs(),
            interactive_secs: default_interactive_secs(),
            trigger_secs: default_trigger_secs(),
            select_format_secs: default_select_format_secs(),
            download_secs: default_download_secs(),
            poll_millis: default_poll_millis(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::default(),
            stderr: false,
            filter: default_log_filter(),
        }
    }
}

fn default_geocoder_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/geocode/".into()
}
fn default_region() -> String {
    "cn".into()
}
fn default_geocoder_timeout() -> u64 {
    15
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_archive_url() -> String {
    "https://aqicn.org/historical/".into()
}
fn default_portal_url() -> String {
    "https://giovanni.gsfc.nasa.gov/giovanni/".into()
}
fn default_navigate_secs() -> u64 {
    120
}
fn default_interactive_secs() -> u64 {
    60
}
fn default_trigger_secs() -> u64 {
    1800
}
fn default_select_format_secs() -> u64 {
    30
}
fn default_download_secs() -> u64 {
    300
}
fn default_poll_millis() -> u64 {
    500
}
fn default_log_filter() -> String {
    "info".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
///
/// The environment source is attached in [`load`](Self::load), after every
/// file, so `AIRSCOUT__SECTION__KEY` always overrides the same key in YAML.
pub struct AirscoutConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    environment: Environment,
}

impl Default for AirscoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AirscoutConfigLoader {
    /// Empty loader; every section has defaults and `AIRSCOUT__` overrides
    /// are applied on [`load`](Self::load).
    ///
    /// ```
    /// use airscout_config::AirscoutConfigLoader;
    ///
    /// let config = AirscoutConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nplaces: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.geocoder.region, "cn");
    /// assert_eq!(config.timeouts.navigate_secs, 120);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            environment: Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, for environment-only deployments.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use airscout_common::BrowserKind;
    /// use airscout_config::AirscoutConfigLoader;
    ///
    /// let cfg = AirscoutConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// browser:
    ///   kind: firefox
    ///   webdriver_url: "http://localhost:4444"
    ///   headless: true
    /// places: [Baotou, Shenzhen, Beijing]
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.browser.kind, BrowserKind::Firefox);
    /// assert!(cfg.browser.headless);
    /// assert_eq!(cfg.places, vec!["Baotou", "Shenzhen", "Beijing"]);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded before the typed structs are built.
    /// Typing goes through `config`'s own deserializer, so an environment
    /// value such as `"true"` or `"5"` still lands in a `bool` or `u64`
    /// field, and a numeric-looking password stays a string.
    ///
    /// ```
    /// use airscout_config::AirscoutConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_MAPS_KEY", "injected-from-env"); }
    ///
    /// let config = AirscoutConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// geocoder:
    ///   api_key: "${DOC_MAPS_KEY}"
    ///   region: br
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.geocoder.api_key.as_deref(), Some("injected-from-env"));
    /// assert_eq!(config.geocoder.region, "br");
    ///
    /// unsafe { std::env::remove_var("DOC_MAPS_KEY"); }
    /// ```
    pub fn load(self) -> Result<AirscoutConfig, ConfigError> {
        let merged = self.builder.add_source(self.environment).build()?;

        let mut raw: Value = merged.try_deserialize()?;
        expand_env_in_value(&mut raw);

        Config::try_from(&raw)?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Chengdu")), ("REGION", Some("cn"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${REGION}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Chengdu", { "loc": "Chengdu-cn" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST_AIRSCOUT}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST_AIRSCOUT}"));
    }

    #[test]
    fn download_dir_defaults_and_expands() {
        let none = DownloadSettings::default();
        assert_eq!(none.resolved_directory(), PathBuf::from("downloads"));

        let plain = DownloadSettings {
            directory: Some(PathBuf::from("/data/aq")),
        };
        assert_eq!(plain.resolved_directory(), PathBuf::from("/data/aq"));
    }
}
