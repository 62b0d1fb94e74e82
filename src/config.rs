// src/config.rs
//! Runtime configuration. Loaded once at startup and handed to each component's
//! constructor; nothing re-reads it mid-run.
//!
//! Every threshold below was tuned against real screens of the map app on
//! 1080-pixel-wide phones. Defaults must stay as they are unless re-tuned.

use crate::utils::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inclusive range of ratios (of screen height, card height, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBand {
    pub min: f64,
    pub max: f64,
}

impl RatioBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One scoring tier: values inside `[min, max]` multiply confidence by `factor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTier {
    pub min: f64,
    pub max: f64,
    pub factor: f64,
}

impl ScoreTier {
    pub const fn new(min: f64, max: f64, factor: f64) -> Self {
        Self { min, max, factor }
    }
}

/// Ordered tiers; the first tier containing the value wins, otherwise `fallback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredScore {
    pub tiers: Vec<ScoreTier>,
    pub fallback: f64,
}

impl TieredScore {
    pub fn factor(&self, value: f64) -> f64 {
        self.tiers
            .iter()
            .find(|t| value >= t.min && value <= t.max)
            .map(|t| t.factor)
            .unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceParams {
    /// Keyed on the card's top edge, in pixels.
    pub y_position: TieredScore,
    /// Keyed on card width / screen width. Two good layouts: full width and narrow.
    pub width_ratio: TieredScore,
    /// Keyed on card height, in pixels. Taller cards carry a photo strip.
    pub height: TieredScore,
    /// Keyed on the merchant name length, in characters.
    pub name_length: TieredScore,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            y_position: TieredScore {
                tiers: vec![
                    ScoreTier::new(600.0, 1500.0, 1.0),
                    ScoreTier::new(500.0, 600.0, 0.9),
                    ScoreTier::new(1500.0, 1700.0, 0.95),
                ],
                fallback: 0.7,
            },
            width_ratio: TieredScore {
                tiers: vec![
                    ScoreTier::new(0.90, 0.95, 1.0),
                    ScoreTier::new(0.85, 0.98, 0.95),
                    ScoreTier::new(0.64, 0.70, 0.90),
                    ScoreTier::new(0.60, 0.64, 0.85),
                ],
                fallback: 0.7,
            },
            height: TieredScore {
                tiers: vec![
                    ScoreTier::new(150.0, 250.0, 1.0),
                    ScoreTier::new(100.0, 300.0, 0.95),
                    ScoreTier::new(300.0, 450.0, 0.90),
                ],
                fallback: 0.8,
            },
            name_length: TieredScore {
                tiers: vec![
                    ScoreTier::new(4.0, 20.0, 1.0),
                    ScoreTier::new(3.0, 30.0, 0.9),
                    ScoreTier::new(31.0, f64::MAX, 0.7),
                ],
                fallback: 1.0,
            },
        }
    }
}

/// Card locator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    /// Safe vertical band as ratios of screen height (filters the search bar,
    /// top banners and the bottom navigation). Fixed pixels apply when unset.
    pub safe_y_min_ratio: Option<f64>,
    pub safe_y_max_ratio: Option<f64>,
    pub safe_y_min: i32,
    pub safe_y_max: i32,

    /// Accepts both the full-width (~94%) and the narrow (~66%) card layouts.
    pub min_width_ratio: f64,
    pub max_width_ratio: f64,
    pub min_height: i32,
    pub max_height: i32,

    /// Tap zone inside a card; the right-hand 40% holds favorite/call/route icons.
    pub click_zone_left_ratio: f64,
    pub click_zone_right_ratio: f64,
    pub click_zone_top_ratio: f64,
    pub click_zone_bottom_ratio: f64,

    /// Names sit in the top part of a card.
    pub name_max_relative_y: f64,
    pub name_min_chars: usize,
    pub name_max_chars: usize,
    pub name_target_chars: usize,
    /// Text hitting this many product keywords is a product title.
    pub product_keyword_limit: usize,

    /// Vertical bucket (pixels) used when merging the two extraction strategies.
    pub merge_y_bucket: i32,

    pub confidence: ConfidenceParams,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            safe_y_min_ratio: Some(0.20),
            safe_y_max_ratio: Some(0.75),
            safe_y_min: 500,
            safe_y_max: 1800,
            min_width_ratio: 0.60,
            max_width_ratio: 0.98,
            min_height: 100,
            max_height: 450,
            click_zone_left_ratio: 0.1,
            click_zone_right_ratio: 0.6,
            click_zone_top_ratio: 0.3,
            click_zone_bottom_ratio: 0.7,
            name_max_relative_y: 0.4,
            name_min_chars: 3,
            name_max_chars: 30,
            name_target_chars: 10,
            product_keyword_limit: 3,
            merge_y_bucket: 10,
            confidence: ConfidenceParams::default(),
        }
    }
}

/// Detail page layout, as ratios of screen height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailParams {
    pub photo_band: RatioBand,
    pub name_band: RatioBand,
    pub info_band: RatioBand,
    pub content_band: RatioBand,
    pub name_min_chars: usize,
    pub name_max_chars: usize,
    pub name_target_chars: usize,
    /// Addresses are longer than this many characters.
    pub address_min_chars: usize,
    /// Upper bound for the whole-tree address sweep.
    pub sweep_address_max_chars: usize,
    pub resource_name_min_chars: usize,
}

impl Default for DetailParams {
    fn default() -> Self {
        Self {
            photo_band: RatioBand::new(0.08, 0.25),
            name_band: RatioBand::new(0.25, 0.35),
            info_band: RatioBand::new(0.35, 0.55),
            content_band: RatioBand::new(0.55, 0.85),
            name_min_chars: 4,
            name_max_chars: 30,
            name_target_chars: 12,
            address_min_chars: 10,
            sweep_address_max_chars: 100,
            resource_name_min_chars: 3,
        }
    }
}

/// Page-state classifier regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageStateParams {
    /// Top-right toolbar of the detail page: x1 beyond this ratio of width, y1 above `top_right_max_y`.
    pub top_right_x_ratio: f64,
    pub top_right_max_y: i32,
    /// The result list's ranked-nearby title sits above this row.
    pub list_title_max_y: i32,
    pub min_list_items: usize,
    /// Height band of clickable groups counted as cards when estimating list size.
    pub estimate_min_height: i32,
    pub estimate_max_height: i32,
    pub full_width_layout_ratio: f64,
    pub narrow_layout: RatioBand,
}

impl Default for PageStateParams {
    fn default() -> Self {
        Self {
            top_right_x_ratio: 0.7,
            top_right_max_y: 200,
            list_title_max_y: 300,
            min_list_items: 3,
            estimate_min_height: 100,
            estimate_max_height: 500,
            full_width_layout_ratio: 0.85,
            narrow_layout: RatioBand::new(0.60, 0.75),
        }
    }
}

/// Orchestrator timing and stop conditions. Durations are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub wait_after_click: f64,
    pub wait_after_back: f64,
    pub wait_after_phone_tap: f64,
    pub wait_before_phone_read: f64,
    pub wait_after_dismiss: f64,
    pub wait_after_swipe: f64,
    pub swipe_duration: f64,
    pub swipe_from_ratio: f64,
    pub swipe_to_ratio: f64,
    pub max_stagnant_pages: u32,
    pub max_count: usize,
    pub capture_screenshots: bool,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            wait_after_click: 2.0,
            wait_after_back: 1.5,
            wait_after_phone_tap: 1.5,
            wait_before_phone_read: 1.0,
            wait_after_dismiss: 0.5,
            wait_after_swipe: 1.0,
            swipe_duration: 0.5,
            swipe_from_ratio: 0.8,
            swipe_to_ratio: 0.3,
            max_stagnant_pages: 3,
            max_count: 100,
            capture_screenshots: false,
        }
    }
}

impl CollectionSettings {
    /// All waits set to zero, for scripted devices.
    pub fn without_delays() -> Self {
        Self {
            wait_after_click: 0.0,
            wait_after_back: 0.0,
            wait_after_phone_tap: 0.0,
            wait_before_phone_read: 0.0,
            wait_after_dismiss: 0.0,
            wait_after_swipe: 0.0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub enabled: bool,
    pub save_snapshots: bool,
    pub snapshot_dir: PathBuf,
    pub pause_before_click: f64,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            save_snapshots: false,
            snapshot_dir: PathBuf::from("./debug_snapshots"),
            pause_before_click: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub locator: LocatorParams,
    pub detail: DetailParams,
    pub page_state: PageStateParams,
    pub collection: CollectionSettings,
    pub debug: DebugSettings,
}

impl AppConfig {
    /// Loads the YAML config. A missing file means defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Seconds from config to a sleep duration; negative values mean "no wait".
pub fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}
