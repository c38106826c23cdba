use std::sync::OnceLock;

use airscout_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let format = std::env::var("AIRSCOUT_LOG_FORMAT")
            .ok()
            .and_then(|raw| raw.parse::<LogFormat>().ok())
            .unwrap_or_default();
        let config = LogConfig {
            app_name: "airscout-tests",
            log_dir: Some(std::env::temp_dir().join("airscout-tests")),
            emit_stderr: true,
            format,
            default_filter: "debug".to_string(),
        };

        airscout_common::observability::init_logging(config).unwrap_or_default()
    });
}
