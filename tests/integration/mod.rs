// Integration tests for Restock Watcher
// These tests drive full search cycles against a mock retailer

pub mod scheduler_tests;
pub mod search_cycle_tests;

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use restock_watcher::AppConfig;
use restock_watcher::config::{
    FamilyConfig, HttpConfig, LoggingConfig, MetricsConfig, MonitorConfig, NotificationsConfig,
    ResourceLayout,
};
use restock_watcher::interval::JitterProfile;
use restock_watcher::models::{FamilyKey, FamilyProfile, Variant};
use restock_watcher::plugins::PluginManager;
use restock_watcher::plugins::retailers::AlternateRetailer;
use restock_watcher::plugins::traits::{NotificationReport, NotifierPlugin, StockAlert};

/// Near-instant waits so a watch window of one second sees many ticks.
pub fn fast_cadence() -> JitterProfile {
    JitterProfile {
        floor_secs: 0.01,
        uniform_spread_secs: 0.0,
        gaussian_mean_secs: 0.0,
        gaussian_std_dev_secs: 0.0,
    }
}

/// Path segment a product page is served under.
pub fn slug(name: &str) -> String {
    name.replace(' ', "-")
}

/// Search listing in the retailer's markup: (name, delivery text, price text).
pub fn listing_html(rows: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<html><body><div class=\"listing\">");
    for (name, delivery, price) in rows {
        let slug = slug(name);
        html.push_str(&format!(
            r#"<a class="productBox" href="/product/{slug}">
                 <div class="product-name">{name}</div>
                 <div class="delivery-info">{delivery}</div>
                 <span class="price">{price}</span>
               </a>"#
        ));
    }
    html.push_str("</div></body></html>");
    html
}

pub fn product_page(available: bool) -> String {
    if available {
        r#"<html><body><a class="btn" title="In den Warenkorb" href="/cart">In den Warenkorb</a></body></html>"#.to_string()
    } else {
        r#"<html><body><div class="stock">Derzeit nicht lieferbar</div></body></html>"#.to_string()
    }
}

pub fn variant(id: &str, name: &str, stock: bool, target: bool, priority: i64) -> Variant {
    let mut v = Variant::new(id, name);
    v.stock = stock;
    v.target = target;
    v.priority = priority;
    v
}

/// Notifier that keeps every alert it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<StockAlert>>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<StockAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    fn description(&self) -> &str {
        "Keeps alerts in memory for assertions"
    }

    async fn notify(&self, alert: &StockAlert) -> NotificationReport {
        self.alerts.lock().unwrap().push(alert.clone());
        NotificationReport::delivered_to("recorder")
    }
}

/// A mock retailer plus the resources tree that points at it.
pub struct TestRetailer {
    pub server: MockServer,
    pub dir: TempDir,
    pub notifier: RecordingNotifier,
}

impl TestRetailer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let retailer = Self {
            server,
            dir,
            notifier: RecordingNotifier::default(),
        };
        retailer.write_detail_headers();
        retailer
    }

    pub fn layout(&self) -> ResourceLayout {
        ResourceLayout::new(self.dir.path())
    }

    pub fn family(&self, product: &str) -> FamilyKey {
        FamilyKey::new(AlternateRetailer::KEY, product)
    }

    pub fn search_path(product: &str) -> String {
        format!("/listing/{}", product)
    }

    pub fn write_profile(&self, product: &str, variants: Vec<Variant>) {
        let path = self.layout().profile_path(&self.family(product));
        write_json(&path, &serde_json::to_value(FamilyProfile::from_variants(variants)).unwrap());
    }

    pub fn read_profile(&self, product: &str) -> FamilyProfile {
        let path = self.layout().profile_path(&self.family(product));
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    pub fn write_requests(&self, product: &str) {
        let uri = self.server.uri();
        let path = self.layout().search_requests_path(&self.family(product));
        write_json(
            &path,
            &json!({
                "cookies": {
                    "url": format!("{}/", uri),
                    "headers": {"Accept": "text/html"}
                },
                "search": {
                    "url": format!("{}{}", uri, Self::search_path(product)),
                    "headers": {"X-Requested-With": "XMLHttpRequest"},
                    "data": {"q": product}
                }
            }),
        );
    }

    fn write_detail_headers(&self) {
        let path = self.layout().detail_headers_path(AlternateRetailer::KEY);
        write_json(&path, &json!({"Accept": "text/html"}));
    }

    /// Adds a family with its profile and request templates.
    pub fn add_family(&self, product: &str, variants: Vec<Variant>) {
        self.write_profile(product, variants);
        self.write_requests(product);
    }

    pub async fn mount_listing(&self, product: &str, html: String) {
        Mock::given(method("POST"))
            .and(path(Self::search_path(product)))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_product_page(&self, name: &str, available: bool) {
        Mock::given(method("GET"))
            .and(path(format!("/product/{}", slug(name))))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_page(available)))
            .mount(&self.server)
            .await;
    }

    pub fn config(&self, products: &[&str]) -> AppConfig {
        AppConfig {
            monitor: MonitorConfig {
                resources_dir: self.dir.path().to_path_buf(),
                alert_profile: None,
                watch_window_secs: 1,
                broad_cadence: fast_cadence(),
                focused_cadence: fast_cadence(),
            },
            http: HttpConfig {
                request_timeout: 5,
                connect_timeout: 5,
                user_agent: "RestockWatcher-Test/1.0".to_string(),
            },
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            families: products
                .iter()
                .map(|p| FamilyConfig {
                    retailer: AlternateRetailer::KEY.to_string(),
                    product: p.to_string(),
                })
                .collect(),
            retailers: HashMap::new(),
        }
    }

    /// Plugin registry with the real retailer parser and the recording notifier.
    pub async fn plugins(&self) -> PluginManager {
        let plugins = PluginManager::new();
        plugins.register_retailer(Arc::new(AlternateRetailer::new())).await;
        plugins.register_notifier(Arc::new(self.notifier.clone())).await;
        plugins
    }
}

fn write_json(path: &Path, value: &serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}
