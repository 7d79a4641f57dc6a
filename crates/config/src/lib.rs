use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "relaycast.toml",
    "config/relaycast.toml",
    "crates/config/relaycast.toml",
    "../relaycast.toml",
    "../config/relaycast.toml",
    "../crates/config/relaycast.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub relay: RelayConfig,
    pub augmentation: AugmentationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

/// Settings for the relay itself: where decode diagnostics are broadcast and
/// how the in-process queue and worker pool are sized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Group that receives the diagnostic broadcast when a queued payload
    /// cannot be decoded.
    #[serde(default = "RelayConfig::default_diagnostic_group")]
    pub diagnostic_group: String,
    #[serde(default = "RelayConfig::default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "RelayConfig::default_workers")]
    pub workers: usize,
}

impl RelayConfig {
    fn default_diagnostic_group() -> String {
        "default".to_string()
    }

    const fn default_queue_capacity() -> usize {
        256
    }

    const fn default_workers() -> usize {
        2
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            diagnostic_group: Self::default_diagnostic_group(),
            queue_capacity: Self::default_queue_capacity(),
            workers: Self::default_workers(),
        }
    }
}

/// Configuration options for the generative-text backend integration.
///
/// ```
/// use relaycast_config::AugmentationConfig;
///
/// let augmentation = AugmentationConfig::default();
/// assert_eq!(augmentation.base_url, "https://openrouter.ai/api/v1");
/// assert_eq!(augmentation.request_timeout_seconds, 30);
/// assert!(augmentation.api_key.is_none());
/// assert!(augmentation.deployment.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "AugmentationConfig::default_base_url")]
    pub base_url: String,
    /// Target model/deployment identifier. Required before any augmentation
    /// call can be issued; left unset the pipeline degrades to a placeholder
    /// response instead of calling out.
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default = "AugmentationConfig::default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "AugmentationConfig::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "AugmentationConfig::default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "AugmentationConfig::default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Hard per-call deadline for one backend request.
    #[serde(default = "AugmentationConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl AugmentationConfig {
    fn default_base_url() -> String {
        "https://openrouter.ai/api/v1".to_string()
    }

    const fn default_max_output_tokens() -> u32 {
        200
    }

    const fn default_max_retries() -> u32 {
        3
    }

    const fn default_retry_base_delay_ms() -> u64 {
        200
    }

    const fn default_retry_max_delay_ms() -> u64 {
        5_000
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            deployment: None,
            max_output_tokens: Self::default_max_output_tokens(),
            max_retries: Self::default_max_retries(),
            retry_base_delay_ms: Self::default_retry_base_delay_ms(),
            retry_max_delay_ms: Self::default_retry_max_delay_ms(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use relaycast_config::load;
///
/// std::env::remove_var("RELAYCAST_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default(
            "relay.diagnostic_group",
            defaults.relay.diagnostic_group.clone(),
        )
        .unwrap()
        .set_default(
            "relay.queue_capacity",
            i64::try_from(defaults.relay.queue_capacity).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "relay.workers",
            i64::try_from(defaults.relay.workers).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default("augmentation.base_url", defaults.augmentation.base_url.clone())
        .unwrap()
        .set_default(
            "augmentation.max_output_tokens",
            i64::from(defaults.augmentation.max_output_tokens),
        )
        .unwrap()
        .set_default(
            "augmentation.max_retries",
            i64::from(defaults.augmentation.max_retries),
        )
        .unwrap()
        .set_default(
            "augmentation.retry_base_delay_ms",
            i64::try_from(defaults.augmentation.retry_base_delay_ms).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "augmentation.retry_max_delay_ms",
            i64::try_from(defaults.augmentation.retry_max_delay_ms).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "augmentation.request_timeout_seconds",
            i64::try_from(defaults.augmentation.request_timeout_seconds).unwrap_or(i64::MAX),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("RELAYCAST").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("RELAYCAST_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via RELAYCAST_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded relaycast configuration");
    Ok(config)
}
