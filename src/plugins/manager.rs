use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::{DiscordNotifier, EmailNotifier, LogNotifier, NotifierGroup};
use super::retailers::AlternateRetailer;
use super::traits::{NotifierPlugin, RetailerPlugin};
use crate::config::AppConfig;
use crate::utils::error::{AppError, Result};

pub type RetailerPluginArc = Arc<dyn RetailerPlugin>;
pub type NotifierPluginArc = Arc<dyn NotifierPlugin>;

/// Registry of retailer parsers (keyed by retailer name) and notifiers (keyed by plugin type).
#[derive(Clone)]
pub struct PluginManager {
    retailers: Arc<RwLock<HashMap<String, RetailerPluginArc>>>,
    notifiers: Arc<RwLock<HashMap<String, NotifierPluginArc>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            retailers: Arc::new(RwLock::new(HashMap::new())),
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the built-in retailers and the notifiers the configuration enables.
    ///
    /// A dry run only ever logs alerts.
    pub async fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let manager = Self::new();

        let alternate = match config
            .retailers
            .get(AlternateRetailer::KEY)
            .and_then(|r| r.stock_pattern.as_deref())
        {
            Some(pattern) => AlternateRetailer::with_stock_pattern(pattern)?,
            None => AlternateRetailer::new(),
        };
        manager.register_retailer(Arc::new(alternate)).await;

        if !dry_run {
            let notifications = &config.notifications;
            if notifications.smtp.enabled {
                manager
                    .register_notifier(Arc::new(EmailNotifier::new(&notifications.smtp)?))
                    .await;
            }
            if let Some(url) = &notifications.discord.webhook_url {
                manager
                    .register_notifier(Arc::new(DiscordNotifier::new(url.clone(), &notifications.discord)))
                    .await;
            }
        }

        if manager.list_notifier_types().await.is_empty() {
            tracing::info!("No alert delivery configured, alerts will only be logged");
            manager.register_notifier(Arc::new(LogNotifier::new())).await;
        }

        Ok(manager)
    }

    /// Register a retailer plugin
    pub async fn register_retailer(&self, plugin: RetailerPluginArc) {
        let key = plugin.retailer_key().to_string();
        let mut retailers = self.retailers.write().await;
        retailers.insert(key, plugin);
    }

    /// Register a notifier plugin
    pub async fn register_notifier(&self, plugin: NotifierPluginArc) {
        let plugin_type = plugin.plugin_type().to_string();
        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(plugin_type, plugin);
    }

    pub async fn retailer(&self, key: &str) -> Result<RetailerPluginArc> {
        let retailers = self.retailers.read().await;
        retailers
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::UnknownRetailer(key.to_string()))
    }

    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(plugin_type)
    }

    pub async fn list_retailer_keys(&self) -> Vec<String> {
        let retailers = self.retailers.read().await;
        let mut keys: Vec<String> = retailers.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        let mut types: Vec<String> = notifiers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Every registered notifier behind one handle, in plugin-type order.
    pub async fn notifier_group(&self) -> NotifierGroup {
        let notifiers = self.notifiers.read().await;
        let mut members: Vec<(&String, &NotifierPluginArc)> = notifiers.iter().collect();
        members.sort_by(|a, b| a.0.cmp(b.0));
        NotifierGroup::new(members.into_iter().map(|(_, n)| n.clone()).collect())
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
