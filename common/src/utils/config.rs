use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Runtime environment the service is deployed in.
///
/// `development` prefers coupon files from the local directory and falls back
/// to remote download; `production` always downloads.
#[derive(Clone, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

/// Selects the backend for the coupon count store.
#[derive(Clone, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CountStoreKind {
    /// In-memory hash map (default).
    #[default]
    Memory,
    /// SurrealDB-backed persistent store.
    Surreal,
}

/// Application configuration loaded from the environment and optional config file.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub app_env: AppEnv,
    #[serde(default = "default_local_coupon_dir")]
    pub local_coupon_dir: String,
    /// Decompression cap per source, in MiB.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_coupon_file_urls")]
    pub coupon_file_urls: Vec<String>,
    #[serde(default)]
    pub count_store: CountStoreKind,
    #[serde(default)]
    pub surrealdb_address: Option<String>,
    #[serde(default)]
    pub surrealdb_username: Option<String>,
    #[serde(default)]
    pub surrealdb_password: Option<String>,
    #[serde(default)]
    pub surrealdb_namespace: Option<String>,
    #[serde(default)]
    pub surrealdb_database: Option<String>,
}

fn default_port() -> u16 {
    8080
}

/// Default directory searched for local `.gz` coupon files in development.
fn default_local_coupon_dir() -> String {
    "./local_coupons".to_string()
}

/// Default decompression cap (2 GiB expressed in MiB).
fn default_max_file_size_mb() -> u64 {
    2048
}

/// The baked-in coupon corpus; overridable via config and at engine construction.
fn default_coupon_file_urls() -> Vec<String> {
    vec![
        "https://orderfoodonline-files.s3.ap-southeast-2.amazonaws.com/couponbase1.gz".to_string(),
        "https://orderfoodonline-files.s3.ap-southeast-2.amazonaws.com/couponbase2.gz".to_string(),
        "https://orderfoodonline-files.s3.ap-southeast-2.amazonaws.com/couponbase3.gz".to_string(),
    ]
}

impl AppConfig {
    /// The decompression cap in bytes.
    pub fn max_decompressed_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            app_env: AppEnv::default(),
            local_coupon_dir: default_local_coupon_dir(),
            max_file_size_mb: default_max_file_size_mb(),
            coupon_file_urls: default_coupon_file_urls(),
            count_store: CountStoreKind::default(),
            surrealdb_address: None,
            surrealdb_username: None,
            surrealdb_password: None,
            surrealdb_namespace: None,
            surrealdb_database: None,
        }
    }
}

/// Loads the application configuration from the environment and optional config file.
#[allow(clippy::module_name_repetitions)]
pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("coupon_file_urls"),
        )
        .build()?;

    config.try_deserialize()
}
