use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use uatu_stockwatch::config::AppConfig;
use uatu_stockwatch::plugins::build_notifier;
use uatu_stockwatch::scraper::ChromeSession;
use uatu_stockwatch::{logging, StockWatcher};

/// Checks every configured product page once and reports stock changes.
#[derive(Parser, Debug)]
#[command(name = "uatu-stockwatch", version, about)]
struct Cli {
    /// Path to the JSON config file listing the pages to watch
    #[arg(short, long, default_value = "config/config.json")]
    config: PathBuf,

    /// Override the number of pages checked at once
    #[arg(short, long)]
    parallelism: Option<usize>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headful: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(parallelism) = cli.parallelism {
        config.checker.parallelism = parallelism;
    }
    if cli.headful {
        config.scraper.headless = false;
    }

    let _guard = logging::init(&config.paths.log_dir)?;
    info!("Start...");
    config.validate().context("Invalid configuration")?;

    let webhook = config.load_webhook().context("Failed to load webhook")?;
    let notifier = build_notifier(&config.notifications, webhook);

    let session = ChromeSession::launch(config.scraper.clone())
        .await
        .context("Failed to launch browser")?;

    let watcher = StockWatcher::new(config, notifier);
    let report = watcher.run(Box::new(session)).await?;

    info!(
        "Checked {} page(s): {} in stock, {} layout change(s), {} unchanged, {} failed; {} error(s) on record{}",
        report.checked,
        report.in_stock,
        report.structure_changed,
        report.unchanged,
        report.failed,
        report.ledger_size,
        if report.error_alert_sent { ", alert sent" } else { "" }
    );
    info!("End.");

    Ok(())
}
