use super::*;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use restock_watcher::app::build_scheduler;
use restock_watcher::scheduler::MonitorScheduler;
use restock_watcher::watcher::WatchOutcome;

const FAMILY: &str = "RTX-3080";

async fn scheduler_for(retailer: &TestRetailer) -> anyhow::Result<MonitorScheduler> {
    let plugins = retailer.plugins().await;
    Ok(build_scheduler(&retailer.config(&[FAMILY]), &plugins, false).await?)
}

#[tokio::test]
async fn test_missing_row_marks_variant_out_of_stock() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(
        FAMILY,
        vec![
            variant("product0", "CardA", true, true, 0),
            variant("product1", "CardB", false, false, 0),
        ],
    );
    retailer
        .mount_listing(FAMILY, listing_html(&[("CardB", "Artikel kann bestellt werden", "€ 749,00")]))
        .await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let report = scheduler.run_once(&CancellationToken::new()).await.remove(0);

    assert!(report.fetched);
    assert!(report.promoted.is_none());
    assert_eq!(report.transitions, vec!["product1".to_string()]);

    let saved = retailer.read_profile(FAMILY);
    let card_a = saved.get("product0").unwrap();
    assert!(!card_a.stock);
    assert!(!card_a.alert);
    assert!(card_a.time_updated.is_none());
    let card_b = saved.get("product1").unwrap();
    assert!(card_b.stock);
    assert_eq!(card_b.price, 749.0);
    assert!(saved.time_updated.is_some());
    assert!(retailer.notifier.alerts().is_empty());
    println!("✓ Missing row flipped CardA out of stock without alerting");

    Ok(())
}

#[tokio::test]
async fn test_non_target_restock_is_not_watched() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(FAMILY, vec![variant("product0", "CardA", false, false, 0)]);
    retailer
        .mount_listing(FAMILY, listing_html(&[("CardA", "Auf Lager", "€ 699,00")]))
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/product/{}", slug("CardA"))))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page(true)))
        .expect(0)
        .mount(&retailer.server)
        .await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let report = scheduler.run_once(&CancellationToken::new()).await.remove(0);

    assert_eq!(report.transitions, vec!["product0".to_string()]);
    assert!(report.promoted.is_none());
    assert!(report.watch_outcome.is_none());
    assert!(retailer.notifier.alerts().is_empty());

    let saved = retailer.read_profile(FAMILY);
    assert!(saved.get("product0").unwrap().alert);

    Ok(())
}

#[tokio::test]
async fn test_already_in_stock_does_not_alert() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(FAMILY, vec![variant("product0", "CardA", true, true, 0)]);
    retailer
        .mount_listing(FAMILY, listing_html(&[("CardA", "Auf Lager", "€ 699,00")]))
        .await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let report = scheduler.run_once(&CancellationToken::new()).await.remove(0);

    assert!(report.fetched);
    assert!(report.transitions.is_empty());
    assert!(report.promoted.is_none());
    assert!(retailer.notifier.alerts().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_priority_picks_single_target() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(
        FAMILY,
        vec![
            variant("product0", "CardA", false, true, 2),
            variant("product1", "CardB", false, true, 1),
            variant("product2", "CardC", false, false, 0),
        ],
    );
    retailer
        .mount_listing(
            FAMILY,
            listing_html(&[
                ("CardA", "Auf Lager", "€ 999,00"),
                ("CardB", "Auf Lager", "€ 1.099,00"),
                ("CardC", "Auf Lager", "€ 599,00"),
            ]),
        )
        .await;
    retailer.mount_product_page("CardB", true).await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let report = scheduler.run_once(&CancellationToken::new()).await.remove(0);

    assert_eq!(report.transitions.len(), 3);
    assert_eq!(report.promoted.as_deref(), Some("product1"));
    assert_eq!(report.watch_outcome, Some(WatchOutcome::AlertTriggered));

    let alerts = retailer.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].name, "CardB");
    assert_eq!(alerts[0].formatted_price(), "1099.00");
    println!("✓ Lowest priority value won the arbitration");

    Ok(())
}

#[tokio::test]
async fn test_watch_expires_when_page_never_shows_cart() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(FAMILY, vec![variant("product0", "CardA", false, true, 0)]);
    retailer
        .mount_listing(FAMILY, listing_html(&[("CardA", "Auf Lager", "€ 699,00")]))
        .await;
    retailer.mount_product_page("CardA", false).await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let report = scheduler.run_once(&CancellationToken::new()).await.remove(0);

    assert_eq!(report.promoted.as_deref(), Some("product0"));
    assert_eq!(report.watch_outcome, Some(WatchOutcome::Expired));
    assert!(report.notification.is_none());
    assert!(retailer.notifier.alerts().is_empty());

    let page_hits = retailer
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/product/CardA")
        .count();
    assert!(page_hits > 1, "watcher polled the product page {} times", page_hits);

    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_still_persists() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(FAMILY, vec![variant("product0", "CardA", true, false, 0)]);
    Mock::given(method("POST"))
        .and(path(TestRetailer::search_path(FAMILY)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&retailer.server)
        .await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let report = scheduler.run_once(&CancellationToken::new()).await.remove(0);

    assert!(!report.fetched);
    assert!(report.persisted);

    let saved = retailer.read_profile(FAMILY);
    assert!(saved.time_updated.is_some());
    assert!(saved.get("product0").unwrap().stock);
    assert_eq!(scheduler.stats().failed_fetches, 1);
    println!("✓ Held stock state saved after a failed download");

    Ok(())
}

#[tokio::test]
async fn test_stale_alert_flags_rearbitrate_after_failed_fetch() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(FAMILY, vec![variant("product0", "CardA", false, true, 0)]);

    // First search succeeds, every later one fails
    Mock::given(method("POST"))
        .and(path(TestRetailer::search_path(FAMILY)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_html(&[("CardA", "Auf Lager", "€ 699,00")])),
        )
        .up_to_n_times(1)
        .mount(&retailer.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestRetailer::search_path(FAMILY)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&retailer.server)
        .await;
    retailer.mount_product_page("CardA", false).await;

    let mut scheduler = scheduler_for(&retailer).await?;
    let cancel = CancellationToken::new();

    let first = scheduler.run_once(&cancel).await.remove(0);
    assert!(first.fetched);
    assert_eq!(first.watch_outcome, Some(WatchOutcome::Expired));

    let second = scheduler.run_once(&cancel).await.remove(0);
    assert!(!second.fetched);
    assert!(second.transitions.is_empty());
    assert_eq!(second.promoted.as_deref(), Some("product0"));
    assert_eq!(second.watch_outcome, Some(WatchOutcome::Expired));
    println!("✓ Held alert flag promoted the target again after a failed download");

    Ok(())
}

#[tokio::test]
async fn test_relative_urls_resolved_against_listing() -> anyhow::Result<()> {
    let retailer = TestRetailer::start().await;
    retailer.add_family(FAMILY, vec![variant("product0", "CardA", false, false, 0)]);
    retailer
        .mount_listing(FAMILY, listing_html(&[("CardA", "Auf Lager", "€ 699,00")]))
        .await;

    let mut scheduler = scheduler_for(&retailer).await?;
    scheduler.run_once(&CancellationToken::new()).await;

    let saved = retailer.read_profile(FAMILY);
    assert_eq!(
        saved.get("product0").unwrap().url,
        format!("{}/product/CardA", retailer.server.uri())
    );

    Ok(())
}
