// src/main.rs
use clap::Parser;
use merchant_extractor::collector::Collector;
use merchant_extractor::config::AppConfig;
use merchant_extractor::device::AdbDevice;
use merchant_extractor::extractors::{
    read_phone_numbers, CardLocator, DetailInfo, DetailLocator, MerchantCard, PageAnalysis,
    PageStateClassifier,
};
use merchant_extractor::storage::StorageManager;
use merchant_extractor::tree::{ScreenSize, UiNode};
use merchant_extractor::utils::{self, AppError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

/// Collects merchant names, addresses and phone numbers from a map app's
/// search results on an Android device
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Search category currently shown on the device (e.g. 鲜花店)
    #[arg(short, long)]
    category: Option<String>,

    /// Stop after this many merchants (overrides the config file)
    #[arg(short, long)]
    max_count: Option<usize>,

    /// adb serial of the device to drive (defaults to the first connected one)
    #[arg(short, long)]
    serial: Option<String>,

    /// Path to the adb executable
    #[arg(long, default_value = "adb")]
    adb: String,

    /// YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output directory for collected records
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Debug mode - verbose decisions and saved UI snapshots
    #[arg(short, long)]
    debug: bool,

    /// Save a screenshot of every merchant detail page
    #[arg(long)]
    screenshots: bool,

    /// Analyze a saved UI dump instead of driving a device
    #[arg(long, value_name = "DUMP_XML")]
    analyze: Option<PathBuf>,

    /// Screen size assumed by --analyze
    #[arg(long, default_value_t = 1080)]
    screen_width: i32,
    #[arg(long, default_value_t = 2400)]
    screen_height: i32,
}

/// Everything the extractors see in one snapshot.
#[derive(Serialize)]
struct SnapshotAnalysis {
    page: PageAnalysis,
    cards: Vec<MerchantCard>,
    detail: DetailInfo,
    phones: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments, then setup logging (reads RUST_LOG env var)
    let args = Args::parse();
    utils::logging::setup_logging(args.debug);
    tracing::info!("Starting with args: {:?}", args);

    // 2. Load configuration and apply command-line overrides
    let mut config = AppConfig::load(&args.config)?;
    if args.debug {
        config.debug.enabled = true;
        config.debug.save_snapshots = true;
    }
    if args.screenshots {
        config.collection.capture_screenshots = true;
    }
    if let Some(max) = args.max_count {
        config.collection.max_count = max;
    }

    // 3. Offline analysis of a saved dump
    if let Some(dump) = &args.analyze {
        let screen = ScreenSize::new(args.screen_width, args.screen_height);
        return analyze_dump(dump, screen, &config);
    }

    let category = args
        .category
        .clone()
        .ok_or_else(|| AppError::Config("--category is required unless --analyze is given".to_string()))?;

    // 4. Pick the device
    let serial = match &args.serial {
        Some(serial) => serial.clone(),
        None => {
            let serials = AdbDevice::connected_serials(&args.adb).await?;
            tracing::info!("Connected devices: {:?}", serials);
            serials
                .into_iter()
                .next()
                .ok_or_else(|| AppError::Config("No Android device connected".to_string()))?
        }
    };
    let device = AdbDevice::new(Some(serial)).with_adb_path(&args.adb);

    // 5. Initialize storage and the collector
    let mut storage = StorageManager::new(&args.output_dir)?;
    let mut collector = Collector::new(device, &config).await?;
    if config.collection.capture_screenshots {
        collector = collector.with_screenshot_dir(args.output_dir.join("screenshots"));
    }

    let cancel = collector.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current merchant");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    // 6. Collect
    let report = collector
        .collect_category(&category, config.collection.max_count, &mut storage)
        .await?;
    let summary_path = storage.save_run_summary(&report)?;

    tracing::info!(
        "Processing finished. Collected: {}, already stored: {}, skipped: {}, stopped by {}",
        report.stats.collected,
        report.stats.already_stored,
        report.stats.cards_seen - report.stats.collected,
        report.stop_reason
    );
    tracing::info!("Records in {}, summary in {}", storage.records_path(&category).display(), summary_path.display());

    Ok(())
}

fn analyze_dump(path: &Path, screen: ScreenSize, config: &AppConfig) -> Result<(), AppError> {
    let xml = std::fs::read_to_string(path)?;
    let root = UiNode::parse_tree(&xml)?;
    let debug = config.debug.enabled;

    let analysis = SnapshotAnalysis {
        page: PageStateClassifier::new(screen, config.page_state.clone()).classify_tree(&root),
        cards: CardLocator::new(screen, config.locator.clone(), debug).find_cards_in(&root),
        detail: DetailLocator::new(screen, config.detail.clone(), debug).extract_from(&root),
        phones: read_phone_numbers(&root),
    };

    let json = serde_json::to_string_pretty(&analysis)
        .map_err(|e| AppError::Config(format!("Could not render analysis: {}", e)))?;
    println!("{}", json);
    Ok(())
}
