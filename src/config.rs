use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::http::header_map;
use crate::interval::{BROAD_CADENCE, FOCUSED_CADENCE, JitterProfile};
use crate::models::{DetailHeaders, FamilyKey, SearchRequests};
use crate::utils::error::{AppError, Result};

const DISCORD_WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";
// One day; larger waits or windows are configuration mistakes.
const MAX_CADENCE_SECS: f64 = 86_400.0;
const MAX_WATCH_WINDOW_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub families: Vec<FamilyConfig>,
    #[serde(default)]
    pub retailers: HashMap<String, RetailerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub resources_dir: PathBuf,
    /// Name of a file under `resources/alert_profiles/` listing extra families.
    #[serde(default)]
    pub alert_profile: Option<String>,
    #[serde(default = "default_watch_window")]
    pub watch_window_secs: u64,
    #[serde(default = "default_broad_cadence")]
    pub broad_cadence: JitterProfile,
    #[serde(default = "default_focused_cadence")]
    pub focused_cadence: JitterProfile,
}

impl MonitorConfig {
    pub fn watch_window(&self) -> Duration {
        Duration::from_secs(self.watch_window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout: u64,
    pub connect_timeout: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            connect_timeout: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub use_tls: bool,
    pub recipients: Vec<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Restock Watcher".to_string(),
            use_tls: true,
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "Restock Watcher".to_string(),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "restock-watcher.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: "127.0.0.1:9001".to_string(),
        }
    }
}

/// One product family to monitor at one retailer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct FamilyConfig {
    #[serde(alias = "vendor")]
    #[validate(length(min = 1, message = "retailer must not be empty"))]
    pub retailer: String,
    #[validate(length(min = 1, message = "product must not be empty"))]
    pub product: String,
}

impl FamilyConfig {
    pub fn key(&self) -> FamilyKey {
        FamilyKey::new(self.retailer.clone(), self.product.clone())
    }
}

/// Per-retailer overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetailerConfig {
    /// Replaces the built-in "can be ordered now" pattern.
    #[serde(default)]
    pub stock_pattern: Option<String>,
}

fn default_watch_window() -> u64 {
    300
}

fn default_broad_cadence() -> JitterProfile {
    BROAD_CADENCE
}

fn default_focused_cadence() -> JitterProfile {
    FOCUSED_CADENCE
}

impl AppConfig {
    pub fn from_dir(dir: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::from(dir.join("default")))
            .add_source(File::from(dir.join(&run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::from(dir.join("local")).required(false))
            .add_source(Environment::with_prefix("RESTOCK").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.monitor.watch_window_secs == 0 {
            return Err(ConfigError::Message("monitor.watch_window_secs must be greater than 0".into()));
        }
        if self.monitor.watch_window_secs > MAX_WATCH_WINDOW_SECS {
            return Err(ConfigError::Message(format!(
                "monitor.watch_window_secs must not exceed {}",
                MAX_WATCH_WINDOW_SECS
            )));
        }

        for (tier, cadence) in [
            ("broad_cadence", &self.monitor.broad_cadence),
            ("focused_cadence", &self.monitor.focused_cadence),
        ] {
            let fields = [
                ("floor_secs", cadence.floor_secs),
                ("uniform_spread_secs", cadence.uniform_spread_secs),
                ("gaussian_mean_secs", cadence.gaussian_mean_secs),
                ("gaussian_std_dev_secs", cadence.gaussian_std_dev_secs),
            ];
            for (field, value) in fields {
                if !value.is_finite() || value.abs() > MAX_CADENCE_SECS {
                    return Err(ConfigError::Message(format!(
                        "monitor.{}.{} must be a number of seconds within ±{}",
                        tier, field, MAX_CADENCE_SECS
                    )));
                }
            }
            if cadence.floor_secs < 0.0
                || cadence.uniform_spread_secs < 0.0
                || cadence.gaussian_std_dev_secs < 0.0
            {
                return Err(ConfigError::Message(format!(
                    "monitor.{} values must not be negative",
                    tier
                )));
            }
        }

        if self.http.request_timeout == 0 {
            return Err(ConfigError::Message("http.request_timeout must be greater than 0".into()));
        }

        if self.notifications.smtp.enabled {
            if self.notifications.smtp.port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if self.notifications.smtp.from_address.is_none() {
                return Err(ConfigError::Message("SMTP from_address is required when email is enabled".into()));
            }
            if self.notifications.smtp.recipients.is_empty() {
                return Err(ConfigError::Message("SMTP recipients must not be empty when email is enabled".into()));
            }
        }

        if let Some(url) = &self.notifications.discord.webhook_url {
            if !url.starts_with(DISCORD_WEBHOOK_PREFIX) {
                return Err(ConfigError::Message("Invalid Discord webhook URL".into()));
            }
        }

        if self.families.is_empty() && self.monitor.alert_profile.is_none() {
            return Err(ConfigError::Message(
                "At least one family or an alert_profile must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for family in &self.families {
            family
                .validate()
                .map_err(|e| ConfigError::Message(format!("Invalid family entry: {}", e)))?;
            if !seen.insert(family.key()) {
                return Err(ConfigError::Message(format!(
                    "Family {} is configured twice",
                    family.key()
                )));
            }
        }

        Ok(())
    }

    pub fn resources(&self) -> ResourceLayout {
        ResourceLayout::new(&self.monitor.resources_dir)
    }

    /// Configured families plus those listed in the alert profile, without duplicates.
    pub fn all_families(&self) -> Result<Vec<FamilyConfig>> {
        let mut families = self.families.clone();
        if let Some(profile) = &self.monitor.alert_profile {
            for family in self.resources().load_alert_profile(profile)? {
                if !families.contains(&family) {
                    families.push(family);
                }
            }
        }
        Ok(families)
    }
}

/// On-disk layout of the resources tree.
#[derive(Debug, Clone)]
pub struct ResourceLayout {
    root: PathBuf,
}

impl ResourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn retailer_dir(&self, retailer: &str) -> PathBuf {
        self.root.join("retailers").join(retailer)
    }

    pub fn profile_path(&self, family: &FamilyKey) -> PathBuf {
        self.retailer_dir(&family.retailer)
            .join("data")
            .join(format!("{}.json", family.product))
    }

    pub fn search_requests_path(&self, family: &FamilyKey) -> PathBuf {
        self.retailer_dir(&family.retailer)
            .join("requests")
            .join("search")
            .join(format!("{}.json", family.product))
    }

    pub fn detail_headers_path(&self, retailer: &str) -> PathBuf {
        self.retailer_dir(retailer)
            .join("requests")
            .join("product")
            .join("product_page.json")
    }

    pub fn alert_profile_path(&self, name: &str) -> PathBuf {
        self.root.join("alert_profiles").join(format!("{}.json", name))
    }

    pub fn load_search_requests(&self, family: &FamilyKey) -> Result<SearchRequests> {
        let path = self.search_requests_path(family);
        let requests: SearchRequests = read_template(&path)?;

        requests
            .validate()
            .map_err(|e| AppError::RequestTemplate(format!("{}: {}", path.display(), e)))?;
        if let Some(cookies) = &requests.cookies {
            header_map(&cookies.headers)?;
        }
        header_map(&requests.search.headers)?;

        Ok(requests)
    }

    pub fn load_detail_headers(&self, retailer: &str) -> Result<DetailHeaders> {
        let headers: DetailHeaders = read_template(&self.detail_headers_path(retailer))?;
        header_map(&headers)?;
        Ok(headers)
    }

    pub fn load_alert_profile(&self, name: &str) -> Result<Vec<FamilyConfig>> {
        let path = self.alert_profile_path(name);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Validation(format!("alert profile {}: {}", path.display(), e)))?;
        let families: Vec<FamilyConfig> = serde_json::from_str(&text)?;
        for family in &families {
            family.validate()?;
        }
        Ok(families)
    }
}

fn read_template<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::RequestTemplate(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| AppError::RequestTemplate(format!("{}: {}", path.display(), e)))
}
