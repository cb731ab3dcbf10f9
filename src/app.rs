use std::sync::Arc;

use crate::config::AppConfig;
use crate::http::ReqwestSession;
use crate::interval::IntervalGenerator;
use crate::plugins::{NotifierPlugin, PluginManager};
use crate::scheduler::MonitorScheduler;
use crate::search::{LoopSettings, SearchLoop, SearchLoopParts};
use crate::store::{JsonProfileStore, MemoryStore, VariantStore};
use crate::utils::error::Result;

/// Builds one search loop per configured family.
///
/// Any missing profile, request template or unknown retailer fails the whole
/// startup. A dry run reads profiles from disk but never writes them back.
pub async fn build_scheduler(config: &AppConfig, plugins: &PluginManager, dry_run: bool) -> Result<MonitorScheduler> {
    let layout = config.resources();
    let disk_store = JsonProfileStore::new(layout.clone());
    let notifier: Arc<dyn NotifierPlugin> = Arc::new(plugins.notifier_group().await);
    let settings = LoopSettings {
        watch_window: config.monitor.watch_window(),
    };

    let mut scheduler = MonitorScheduler::new(IntervalGenerator::with_profiles(
        config.monitor.broad_cadence,
        config.monitor.focused_cadence,
    ));

    for family_config in config.all_families()? {
        let family = family_config.key();
        let retailer = plugins.retailer(&family.retailer).await?;
        let requests = layout.load_search_requests(&family)?;
        let detail_headers = layout.load_detail_headers(&family.retailer)?;

        let store: Box<dyn VariantStore> = if dry_run {
            let profile = disk_store.load(&family)?;
            Box::new(MemoryStore::new().with_profile(family.clone(), profile))
        } else {
            Box::new(disk_store.clone())
        };

        let session = ReqwestSession::new(&config.http)?;
        if let Some(cookies) = &requests.cookies {
            if let Err(e) = session.bootstrap(cookies).await {
                tracing::warn!("Could not fetch session cookies for {}: {}", family, e);
            }
        }

        let search = SearchLoop::new(
            SearchLoopParts {
                family,
                store,
                retailer,
                http: Box::new(session),
                requests,
                detail_headers,
                notifier: notifier.clone(),
            },
            settings,
        )?;
        scheduler.add_family(search);
    }

    Ok(scheduler)
}
