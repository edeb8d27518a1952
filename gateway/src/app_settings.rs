use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use converters::config::{BackendPaths, Settings};

#[derive(Clone, Deserialize)]
pub struct AppSettings {
    pub application: WebServerConfig,
    pub converters: ConvertersConfig,
}

#[derive(Clone, Deserialize)]
pub struct WebServerConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

/// `config::Environment` maps `APP_CONVERTERS__MAX_FILE_SIZE` onto
/// `max_file_size` and so on.
#[derive(Clone, Deserialize)]
pub struct ConvertersConfig {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_file_size: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_concurrent_jobs: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_queued_jobs: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_resource_count: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_restarts: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub restart_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pdf_render_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub browser_launch_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub browser_restart_interval_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub office_launch_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub office_base_port: u16,
    pub temp_root: String,
    pub browser_executable: Option<String>,
    pub office_executable: String,
    pub markup_executable: Option<String>,
    pub transport_executable: String,
}

impl ConvertersConfig {
    pub fn into_settings(self) -> Settings {
        Settings {
            max_file_size: self.max_file_size,
            max_concurrent_jobs: self.max_concurrent_jobs,
            max_queued_jobs: self.max_queued_jobs,
            max_resource_count: self.max_resource_count,
            max_restarts: self.max_restarts,
            restart_delay: Duration::from_millis(self.restart_delay_ms),
            pdf_render_timeout: Duration::from_millis(self.pdf_render_timeout_ms),
            browser_launch_timeout: Duration::from_millis(self.browser_launch_timeout_ms),
            browser_restart_interval: Duration::from_millis(self.browser_restart_interval_ms),
            office_launch_timeout: Duration::from_millis(self.office_launch_timeout_ms),
            office_base_port: self.office_base_port,
            temp_root: PathBuf::from(self.temp_root),
            backends: BackendPaths {
                browser_executable: self.browser_executable.map(PathBuf::from),
                office_executable: PathBuf::from(self.office_executable),
                markup_executable: self.markup_executable.map(PathBuf::from),
                transport_executable: PathBuf::from(self.transport_executable),
            },
        }
    }
}

pub fn get_app_settings() -> Result<AppSettings, config::ConfigError> {
    let mut base_path =
        std::env::current_dir().expect("Failed to determine current dir while loading config");

    // During integration tests, cargo invokes the binary from within the
    // crate directory, which changes the `current_dir`.
    // It's safe to pop out the crate directory from the path.
    let crate_name = env!("CARGO_CRATE_NAME");
    if base_path.ends_with(crate_name) {
        base_path.pop();
    }

    let config_dir = base_path.join("resources").join("config");
    let env_config_file = std::env::var("ENV_CONFIG_FILE").ok();

    let builder =
        config::Config::builder().add_source(config::File::from(config_dir.join("base.yml")));

    let builder = match env_config_file {
        Some(file_path) => builder.add_source(config::File::from(PathBuf::from(file_path))),
        None => builder,
    };

    let builder = builder
        .add_source(
            // APP_APPLICATION__PORT=3000, APP_CONVERTERS__MAX_CONCURRENT_JOBS=4, etc.
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    builder.try_deserialize::<AppSettings>()
}
