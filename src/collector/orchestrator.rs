// src/collector/orchestrator.rs

// --- Imports ---
use crate::classifiers::text::names_match;
use crate::collector::models::{
    CardOutcome, CollectionReport, CollectionStats, MerchantRecord, StopReason, Uncollectible,
};
use crate::config::{secs, AppConfig, CollectionSettings, DebugSettings};
use crate::device::Device;
use crate::extractors::{
    read_phone_numbers, CardLocator, DetailLocator, MerchantCard, PageState, PageStateClassifier,
};
use crate::storage::{category_slug, RecordSink};
use crate::tree::{Point, ScreenSize, UiNode};
use crate::utils::error::CollectError;
use crate::utils::snapshot_debug;
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where the collector is in its per-card cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    ParsingList,
    Tapping,
    VerifyingTap,
    ExtractingDetail,
    ReturningToList,
    Stopped,
}

/// A parsed snapshot together with its raw XML.
struct Snapshot {
    xml: String,
    root: UiNode,
}

/// Drives one device through a category's result list.
pub struct Collector<D: Device> {
    device: D,
    screen: ScreenSize,
    cards: CardLocator,
    detail: DetailLocator,
    pages: PageStateClassifier,
    settings: CollectionSettings,
    debug: DebugSettings,
    screenshot_dir: Option<PathBuf>,
    cancel: Arc<AtomicBool>,
    state: CollectorState,
}

impl<D: Device> Collector<D> {
    /// Queries the screen size once and builds the locators for it.
    pub async fn new(mut device: D, config: &AppConfig) -> Result<Self, CollectError> {
        let screen = device.screen_size().await?;
        if screen.width <= 0 || screen.height <= 0 {
            return Err(CollectError::InvalidScreen { width: screen.width, height: screen.height });
        }
        tracing::info!("Device screen {}x{}", screen.width, screen.height);

        let debug = config.debug.enabled;
        Ok(Self {
            device,
            screen,
            cards: CardLocator::new(screen, config.locator.clone(), debug),
            detail: DetailLocator::new(screen, config.detail.clone(), debug),
            pages: PageStateClassifier::new(screen, config.page_state.clone()),
            settings: config.collection.clone(),
            debug: config.debug.clone(),
            screenshot_dir: None,
            cancel: Arc::new(AtomicBool::new(false)),
            state: CollectorState::Idle,
        })
    }

    /// Screenshots of detail pages go here when capturing is enabled.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Set to `true` to stop at the next merchant or page boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Collects up to `max_count` merchants and returns them.
    pub async fn collect_all_merchants_in_category(
        &mut self,
        category: &str,
        max_count: usize,
    ) -> Result<Vec<MerchantRecord>, CollectError> {
        let mut records: Vec<MerchantRecord> = Vec::new();
        self.collect_category(category, max_count, &mut records).await?;
        Ok(records)
    }

    /// Walks the result list page by page, visiting each unseen card and
    /// handing collected records to `sink`.
    pub async fn collect_category<S: RecordSink>(
        &mut self,
        category: &str,
        max_count: usize,
        sink: &mut S,
    ) -> Result<CollectionReport, CollectError> {
        tracing::info!("Collecting category {:?} (max {})", category, max_count);
        let started_at = Utc::now();

        let mut processed_names: HashSet<String> = HashSet::new();
        let mut records: Vec<MerchantRecord> = Vec::new();
        let mut stats = CollectionStats::default();
        let mut pages = 0usize;
        let mut stagnant_pages = 0u32;
        let mut previous_xml: Option<String> = None;

        let stop_reason = loop {
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }
            if records.len() >= max_count {
                break StopReason::QuotaReached;
            }

            self.transition(CollectorState::ParsingList);
            let Some(snapshot) = self.snapshot().await? else {
                tracing::warn!("No readable list snapshot; treating as end of list");
                break StopReason::EndOfList;
            };
            if previous_xml.as_deref() == Some(snapshot.xml.as_str()) {
                tracing::info!("List did not move after swiping; end of list");
                break StopReason::EndOfList;
            }
            pages += 1;
            self.save_debug_snapshot(&format!("list_page_{}", pages), &snapshot.xml);

            let cards = self.cards.find_cards_in(&snapshot.root);
            if cards.is_empty() {
                tracing::info!("No merchant cards on page {}; end of list", pages);
                break StopReason::EndOfList;
            }
            let end_marker = self.pages.is_end_of_list(&snapshot.root);
            tracing::info!("Page {}: {} card(s)", pages, cards.len());

            let mut new_on_page = 0usize;
            let mut stop_now = None;
            for card in &cards {
                if processed_names.contains(&card.name) {
                    tracing::debug!("  #{} {:?} already processed", card.index, card.name);
                    continue;
                }
                if self.is_cancelled() {
                    stop_now = Some(StopReason::Cancelled);
                    break;
                }

                let outcome = self.visit_card(card, category, &mut stats).await?;
                stats.record(&outcome);
                if let CardOutcome::Collected(record) = outcome {
                    processed_names.insert(card.name.clone());
                    if !sink.save_record(&record)? {
                        stats.already_stored += 1;
                    }
                    tracing::info!(
                        "  Collected {:?} ({} phone(s), address {:?})",
                        record.name,
                        record.phones.len(),
                        record.address
                    );
                    records.push(record);
                    new_on_page += 1;
                }

                if records.len() >= max_count {
                    stop_now = Some(StopReason::QuotaReached);
                    break;
                }
            }
            if let Some(reason) = stop_now {
                break reason;
            }

            if new_on_page == 0 {
                stagnant_pages += 1;
                tracing::info!("No new merchants on page {} ({} in a row)", pages, stagnant_pages);
                if stagnant_pages >= self.settings.max_stagnant_pages {
                    break StopReason::Stagnation;
                }
            } else {
                stagnant_pages = 0;
            }

            if end_marker {
                tracing::info!("End-of-list marker on page {}", pages);
                break StopReason::EndOfList;
            }

            // Visits can leave the list in a different state than it was parsed in.
            previous_xml = self.snapshot().await?.map(|s| s.xml);
            self.scroll_to_next_page().await?;
        };

        self.transition(CollectorState::Stopped);
        tracing::info!(
            "Category {:?} finished: {} record(s) over {} page(s), stopped by {}",
            category,
            records.len(),
            pages,
            stop_reason
        );

        Ok(CollectionReport {
            category: category.to_string(),
            records,
            stop_reason,
            stats,
            pages,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Tap, verify, extract, return. Only a failed return to the list is an error.
    async fn visit_card(
        &mut self,
        card: &MerchantCard,
        category: &str,
        stats: &mut CollectionStats,
    ) -> Result<CardOutcome, CollectError> {
        tracing::info!(
            "Visiting #{} {:?} at {} (confidence {:.2})",
            card.index,
            card.name,
            card.click_point,
            card.confidence
        );

        self.transition(CollectorState::Tapping);
        if self.debug.enabled && self.debug.pause_before_click > 0.0 {
            self.settle(self.debug.pause_before_click).await;
        }
        self.device.tap(card.click_point).await?;
        self.settle(self.settings.wait_after_click).await;

        self.transition(CollectorState::VerifyingTap);
        let detail_page = match self.snapshot().await? {
            Some(snap) if self.pages.is_detail_page(&snap.root) => snap,
            other => {
                let seen = other
                    .as_ref()
                    .map(|s| self.pages.classify_tree(&s.root).state)
                    .unwrap_or(PageState::Unknown);
                tracing::warn!("Tap on {:?} led to a {} page, skipping", card.name, seen);
                if let Some(snap) = &other {
                    self.save_debug_snapshot(&format!("mismatch_{}", card.name), &snap.xml);
                }
                self.return_to_list(&card.name).await?;
                return Ok(CardOutcome::NavigationMismatch);
            }
        };

        self.transition(CollectorState::ExtractingDetail);
        let info = self.detail.extract_from(&detail_page.root);
        if let Some(detail_name) = &info.name {
            if !names_match(&card.name, detail_name) {
                stats.name_mismatches += 1;
                tracing::warn!("Card name {:?} differs from detail title {:?}", card.name, detail_name);
            }
        }

        let Some(phone_target) = info.phone_button_pos else {
            tracing::info!("{:?} has no phone affordance, skipping", card.name);
            self.return_to_list(&card.name).await?;
            return Ok(CardOutcome::NoPhoneAffordance);
        };

        let image_refs = self.capture_screenshot(category, card).await;

        let phones = match self.read_phone_dialog(phone_target).await? {
            Ok(phones) => phones,
            Err(reason) => {
                tracing::info!("{:?} phone not obtainable: {:?}", card.name, reason);
                self.return_to_list(&card.name).await?;
                return Ok(CardOutcome::Uncollectible(reason));
            }
        };

        let mut record = MerchantRecord::new(&card.name, info.address.as_deref(), phones, category);
        record.image_refs = image_refs;

        self.return_to_list(&card.name).await?;
        Ok(CardOutcome::Collected(record))
    }

    /// Taps the phone affordance and reads the dialog. The inner `Err` marks a
    /// merchant whose number cannot be obtained; the dialog is dismissed either way.
    async fn read_phone_dialog(
        &mut self,
        target: Point,
    ) -> Result<Result<Vec<String>, Uncollectible>, CollectError> {
        self.device.tap(target).await?;
        self.settle(self.settings.wait_after_phone_tap).await;

        if let Some(snap) = self.snapshot().await? {
            let blocked = if self.pages.is_dialer_page(&snap.root) {
                Some(Uncollectible::DialerHandoff)
            } else if self.pages.is_supply_phone_dialog(&snap.root) {
                Some(Uncollectible::NoListedPhone)
            } else {
                None
            };
            if let Some(reason) = blocked {
                self.dismiss().await?;
                return Ok(Err(reason));
            }
        }

        self.settle(self.settings.wait_before_phone_read).await;
        let phones = match self.snapshot().await? {
            Some(snap) => read_phone_numbers(&snap.root),
            None => Vec::new(),
        };
        if phones.is_empty() {
            tracing::warn!("Phone dialog showed no readable number");
        }
        self.dismiss().await?;
        Ok(Ok(phones))
    }

    async fn dismiss(&mut self) -> Result<(), CollectError> {
        self.device.back().await?;
        self.settle(self.settings.wait_after_dismiss).await;
        Ok(())
    }

    /// Back until the result list shows: at most two presses.
    async fn return_to_list(&mut self, merchant: &str) -> Result<(), CollectError> {
        self.transition(CollectorState::ReturningToList);

        if let Some(snap) = self.snapshot().await? {
            if self.pages.is_list_page(&snap.root) {
                return Ok(());
            }
        }

        let mut last_state = PageState::Unknown;
        for attempt in 1..=2 {
            self.device.back().await?;
            self.settle(self.settings.wait_after_back).await;

            if let Some(snap) = self.snapshot().await? {
                let analysis = self.pages.classify_tree(&snap.root);
                if analysis.features.is_list() {
                    tracing::debug!("Back on the result list after {} press(es)", attempt);
                    return Ok(());
                }
                last_state = analysis.state;
            }
            tracing::warn!("Still not on the result list after back #{} ({})", attempt, last_state);
        }

        tracing::error!("Lost the result list after visiting {:?}", merchant);
        Err(CollectError::NavigationFailure {
            merchant: merchant.to_string(),
            last_state: last_state.to_string(),
        })
    }

    async fn scroll_to_next_page(&mut self) -> Result<(), CollectError> {
        let x = self.screen.x_at(0.5);
        let from = Point::new(x, self.screen.y_at(self.settings.swipe_from_ratio));
        let to = Point::new(x, self.screen.y_at(self.settings.swipe_to_ratio));
        self.device.swipe(from, to, secs(self.settings.swipe_duration)).await?;
        self.settle(self.settings.wait_after_swipe).await;
        Ok(())
    }

    async fn capture_screenshot(&mut self, category: &str, card: &MerchantCard) -> Vec<String> {
        if !self.settings.capture_screenshots {
            return Vec::new();
        }
        let Some(dir) = &self.screenshot_dir else {
            return Vec::new();
        };
        let path = dir.join(category_slug(category)).join(format!(
            "{}_{}.png",
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            card.index
        ));
        match self.device.screenshot(&path).await {
            Ok(()) => vec![path.display().to_string()],
            Err(e) => {
                tracing::warn!("Screenshot of {:?} failed: {}", card.name, e);
                Vec::new()
            }
        }
    }

    async fn snapshot(&mut self) -> Result<Option<Snapshot>, CollectError> {
        let Some(xml) = self.device.ui_tree().await? else {
            return Ok(None);
        };
        match UiNode::parse_tree(&xml) {
            Ok(root) => Ok(Some(Snapshot { xml, root })),
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot: {}", e);
                Ok(None)
            }
        }
    }

    fn save_debug_snapshot(&self, label: &str, xml: &str) {
        if !self.debug.save_snapshots {
            return;
        }
        if let Err(e) = snapshot_debug::save_snapshot(&self.debug.snapshot_dir, label, xml) {
            tracing::warn!("Could not save debug snapshot {}: {}", label, e);
        }
    }

    async fn settle(&self, seconds: f64) {
        if seconds > 0.0 {
            tokio::time::sleep(secs(seconds)).await;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn transition(&mut self, next: CollectorState) {
        if self.state != next {
            tracing::debug!("Collector state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
