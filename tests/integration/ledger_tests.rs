use super::*;
use std::sync::Arc;
use uatu_stockwatch::StockWatcher;

#[tokio::test]
async fn test_repeated_failure_keeps_one_record() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let errors = dir.path().join("errors.json");
    let page = target("Gamestop", "PS5 Bundle", 0);

    for minute in [1, 2] {
        let browser = StubBrowser::new(vec![(&page, PageBehaviour::NavigationFails)]);
        let watcher = StockWatcher::new(
            test_config(&errors, vec![page.clone()]),
            Arc::new(RecordingNotifier::default()),
        );
        watcher.run_at(Box::new(browser), at_minute(minute)).await?;
    }

    let ledger = read_ledger(&errors);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].observed_at, Some(at_minute(2)));
    Ok(())
}

#[tokio::test]
async fn test_legacy_ledger_is_read_and_rewritten() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let errors = dir.path().join("errors.json");
    std::fs::write(
        &errors,
        r##"[{
            "config": {
                "vendor": "Adorama",
                "product": "Sony A7 IV",
                "url": "https://store.example.org/adorama/legacy",
                "xpath": "//*[@id='add-to-cart']",
                "selector": "#add-to-cart",
                "unavailableIndicator": "Sold Out"
            },
            "error": "Error navigating to website."
        }]"##,
    )?;

    let page = target("Adorama", "Sony A7 IV", 1);
    let browser = StubBrowser::new(vec![(&page, PageBehaviour::Text("Sold Out".to_string()))]);
    let watcher = StockWatcher::new(test_config(&errors, vec![page]), Arc::new(RecordingNotifier::default()));
    watcher.run_at(Box::new(browser), at_minute(5)).await?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&errors)?)?;
    assert_eq!(raw[0]["target"]["url"], "https://store.example.org/adorama/legacy");
    assert!(raw[0].get("config").is_none());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_ledger_does_not_block_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let errors = dir.path().join("errors.json");
    std::fs::write(&errors, "[{\"truncated\": ")?;

    let page = target("Dell", "Alienware R12", 0);
    let browser = StubBrowser::new(vec![(&page, PageBehaviour::NavigationFails)]);
    let watcher = StockWatcher::new(test_config(&errors, vec![page.clone()]), Arc::new(RecordingNotifier::default()));
    let report = watcher.run_at(Box::new(browser), at_minute(9)).await?;

    assert_eq!(report.ledger_size, 1);
    assert_eq!(read_ledger(&errors)[0].target, page);
    Ok(())
}
