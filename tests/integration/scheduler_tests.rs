use super::*;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use restock_watcher::app::build_scheduler;
use restock_watcher::interval::BROAD_CADENCE;

#[tokio::test]
async fn test_scheduler_runs_every_family() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family("RTX-3080", vec![variant("product0", "CardA", false, false, 0)]);
    retailer.add_family("RTX-3070", vec![variant("product0", "CardB", true, false, 0)]);
    retailer
        .mount_listing("RTX-3080", listing_html(&[("CardA", "Auf Lager", "€ 699,00")]))
        .await;
    retailer.mount_listing("RTX-3070", listing_html(&[])).await;

    let plugins = retailer.plugins().await;
    let config = retailer.config(&["RTX-3080", "RTX-3070"]);
    let mut scheduler = build_scheduler(&config, &plugins, false).await?;
    assert_eq!(scheduler.family_count(), 2);
    let families: Vec<String> = scheduler.loops().iter().map(|l| l.family().to_string()).collect();
    assert_eq!(families, vec!["alternate/RTX-3080", "alternate/RTX-3070"]);

    let reports = scheduler.run_once(&CancellationToken::new()).await;
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].family.product, "RTX-3080");
    assert_eq!(reports[0].in_stock, 1);
    assert_eq!(reports[1].family.product, "RTX-3070");
    assert_eq!(reports[1].in_stock, 0);
    assert!(scheduler.loops()[0].profile().get("product0").unwrap().stock);
    assert!(!scheduler.loops()[1].profile().get("product0").unwrap().stock);

    let stats = scheduler.stats();
    assert_eq!(stats.families, 2);
    assert_eq!(stats.completed_cycles, 2);
    assert_eq!(stats.per_family["alternate/RTX-3080"].transitions, 1);
    assert_eq!(stats.per_family["alternate/RTX-3070"].run_count, 1);
    println!("Scheduler stats: {:?}", stats);

    Ok(())
}

#[tokio::test]
async fn test_scheduler_stops_on_cancel() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family("RTX-3080", vec![variant("product0", "CardA", false, false, 0)]);
    retailer.mount_listing("RTX-3080", listing_html(&[])).await;

    // Real broad cadence: the driver sleeps for seconds after the first cycle
    let mut config = retailer.config(&["RTX-3080"]);
    config.monitor.broad_cadence = BROAD_CADENCE;
    let plugins = retailer.plugins().await;
    let mut scheduler = build_scheduler(&config, &plugins, false).await?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    tokio::time::timeout(Duration::from_secs(5), scheduler.run(&cancel)).await?;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(scheduler.stats().completed_cycles, 1);
    println!("✓ Scheduler stopped {:?} after start", started.elapsed());

    Ok(())
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family("RTX-3080", vec![variant("product0", "CardA", false, false, 0)]);

    let plugins = retailer.plugins().await;
    let mut scheduler = build_scheduler(&retailer.config(&["RTX-3080"]), &plugins, false).await?;

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(scheduler.run_once(&cancel).await.is_empty());
    scheduler.run(&cancel).await;
    assert_eq!(scheduler.stats().completed_cycles, 0);

    Ok(())
}
