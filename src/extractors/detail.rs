// src/extractors/detail.rs

// --- Imports ---
use crate::classifiers::keywords::{self, contains_any};
use crate::classifiers::markup::{sized_text, strip_tags};
use crate::classifiers::text::{
    char_len, is_detail_excluded_name, is_registration_tag, select_detail_name, NameCandidate,
};
use crate::config::{DetailParams, RatioBand};
use crate::tree::{Point, Rect, ScreenSize, UiNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// --- Regex Patterns (Lazy Static) ---
static RATING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+)\s*分").expect("Failed to compile RATING_RE"));
static HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}:\d{2}[-~]\d{2}:\d{2})").expect("Failed to compile HOURS_RE")
});

// --- Data Structures ---
/// Fields scraped from a merchant detail page. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<String>,
    pub business_hours: Option<String>,
    /// Where to tap to open the phone dialog; not the number itself.
    pub phone_button_pos: Option<Point>,
}

impl DetailInfo {
    /// Fills fields still missing here from `other`.
    fn fill_missing(&mut self, other: DetailInfo) {
        self.name = self.name.take().or(other.name);
        self.address = self.address.take().or(other.address);
        self.rating = self.rating.take().or(other.rating);
        self.business_hours = self.business_hours.take().or(other.business_hours);
        self.phone_button_pos = self.phone_button_pos.or(other.phone_button_pos);
    }

    pub fn is_empty(&self) -> bool {
        *self == DetailInfo::default()
    }
}

/// A vertical band resolved to pixel rows (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelBand {
    top: i32,
    bottom: i32,
}

impl PixelBand {
    fn resolve(screen: ScreenSize, band: RatioBand) -> Self {
        Self { top: screen.y_at(band.min), bottom: screen.y_at(band.max) }
    }

    fn holds(&self, rect: &Rect) -> bool {
        rect.y1 >= self.top && rect.y1 <= self.bottom
    }

    fn relative(&self, y: i32) -> f64 {
        let height = self.bottom - self.top;
        if height <= 0 {
            return 0.0;
        }
        f64::from(y - self.top) / f64::from(height)
    }
}

// --- Main Locator Structure ---
pub struct DetailLocator {
    params: DetailParams,
    name_band: PixelBand,
    info_band: PixelBand,
    debug: bool,
}

impl DetailLocator {
    pub fn new(screen: ScreenSize, params: DetailParams, debug: bool) -> Self {
        let name_band = PixelBand::resolve(screen, params.name_band);
        let info_band = PixelBand::resolve(screen, params.info_band);
        tracing::debug!(
            "DetailLocator for {}x{}: photo y {}..{}, name y {}..{}, info y {}..{}, content y {}..{}",
            screen.width,
            screen.height,
            screen.y_at(params.photo_band.min),
            screen.y_at(params.photo_band.max),
            name_band.top,
            name_band.bottom,
            info_band.top,
            info_band.bottom,
            screen.y_at(params.content_band.min),
            screen.y_at(params.content_band.max),
        );
        Self { params, name_band, info_band, debug }
    }

    /// Parses a snapshot and extracts detail fields; an unusable snapshot yields empty info.
    pub fn extract_merchant_info(&self, xml: &str) -> DetailInfo {
        match UiNode::parse_tree(xml) {
            Ok(root) => self.extract_from(&root),
            Err(e) => {
                tracing::warn!("Detail extraction skipped, snapshot unusable: {}", e);
                DetailInfo::default()
            }
        }
    }

    /// Resource identifiers first, then screen regions, then a whole-tree
    /// address sweep. Each field keeps the first value found.
    pub fn extract_from(&self, root: &UiNode) -> DetailInfo {
        let mut info = self.by_resource_id(root);
        info.fill_missing(self.by_region(root));
        if info.address.is_none() {
            info.address = self.sweep_address(root);
        }

        self.log_field("name", info.name.as_deref());
        self.log_field("address", info.address.as_deref());
        self.log_field("rating", info.rating.as_deref());
        self.log_field("hours", info.business_hours.as_deref());
        match info.phone_button_pos {
            Some(p) => tracing::debug!("Detail phone target at {}", p),
            None => tracing::debug!("Detail phone target not found"),
        }
        info
    }

    fn by_resource_id(&self, root: &UiNode) -> DetailInfo {
        let mut info = DetailInfo::default();

        for node in root.iter() {
            let Some(bounds) = node.bounds else {
                continue;
            };
            if keywords::SYSTEM_ID_NAMESPACES
                .iter()
                .any(|ns| node.resource_id.contains(ns))
            {
                continue;
            }
            let id = node.resource_id.to_lowercase();
            let clean = strip_tags(&node.text);

            if info.name.is_none()
                && contains_any(&id, keywords::ID_NAME_KEYWORDS)
                && char_len(&clean) >= self.params.resource_name_min_chars
                && !is_registration_tag(&clean)
            {
                tracing::trace!("Name from resource id {}: {:?}", node.resource_id, clean);
                info.name = Some(clean.clone());
            }

            if info.phone_button_pos.is_none()
                && (contains_any(&id, keywords::ID_PHONE_KEYWORDS)
                    || clean.contains(keywords::PHONE_LABEL)
                    || node.content_desc.contains(keywords::PHONE_LABEL))
            {
                tracing::trace!("Phone target from {:?} ({})", node.resource_id, bounds);
                info.phone_button_pos = Some(bounds.center());
            }

            if info.address.is_none()
                && contains_any(&id, keywords::ID_ADDRESS_KEYWORDS)
                && char_len(&clean) > self.params.address_min_chars
            {
                tracing::trace!("Address from resource id {}: {:?}", node.resource_id, clean);
                info.address = Some(clean);
            }
        }
        info
    }

    fn by_region(&self, root: &UiNode) -> DetailInfo {
        let mut info = DetailInfo {
            name: self.name_from_band(root),
            ..DetailInfo::default()
        };

        for node in root.iter().filter(|n| n.has_text()) {
            let Some(bounds) = node.bounds else {
                continue;
            };
            if !self.info_band.holds(&bounds) {
                continue;
            }
            let clean = strip_tags(&node.text);

            if info.rating.is_none() {
                info.rating = RATING_RE.captures(&clean).map(|c| c[1].to_string());
            }
            if info.business_hours.is_none() {
                info.business_hours = HOURS_RE.captures(&clean).map(|c| c[1].to_string());
            }
            if info.address.is_none()
                && contains_any(&clean, keywords::DETAIL_ADDRESS_KEYWORDS)
                && char_len(&clean) > self.params.address_min_chars
            {
                info.address = Some(clean.clone());
            }
            if info.phone_button_pos.is_none()
                && (clean.contains(keywords::PHONE_LABEL) || clean.contains(keywords::SUPPLY_PHONE_LABEL))
            {
                info.phone_button_pos = Some(bounds.center());
            }
        }
        info
    }

    /// Largest font, then topmost, then closest to the target length.
    fn name_from_band(&self, root: &UiNode) -> Option<String> {
        let mut candidates = Vec::new();
        for node in root.iter().filter(|n| n.has_text()) {
            let Some(bounds) = node.bounds else {
                continue;
            };
            if !self.name_band.holds(&bounds) {
                continue;
            }

            let (text, font_size) = sized_text(&node.text);
            let length = char_len(&text);
            if length < self.params.name_min_chars || length > self.params.name_max_chars {
                continue;
            }
            if is_detail_excluded_name(&text) {
                self.log_skip(&text, "not a merchant title");
                continue;
            }
            candidates.push(NameCandidate::new(text, self.name_band.relative(bounds.y1), font_size));
        }

        let best = select_detail_name(&candidates, self.params.name_target_chars)?;
        Some(best.text.clone())
    }

    fn sweep_address(&self, root: &UiNode) -> Option<String> {
        root.iter()
            .filter(|n| n.has_text() && n.bounds.is_some())
            .map(|n| strip_tags(&n.text))
            .find(|clean| {
                let len = char_len(clean);
                len > self.params.address_min_chars
                    && len < self.params.sweep_address_max_chars
                    && contains_any(clean, keywords::DETAIL_ADDRESS_KEYWORDS)
            })
    }

    fn log_field(&self, field: &str, value: Option<&str>) {
        if self.debug {
            tracing::info!("Detail {}: {:?}", field, value);
        } else {
            tracing::debug!("Detail {}: {:?}", field, value);
        }
    }

    fn log_skip(&self, text: &str, reason: &str) {
        if self.debug {
            tracing::info!("Skipped {:?}: {}", text, reason);
        } else {
            tracing::trace!("Skipped {:?}: {}", text, reason);
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{screen, Node, SCREEN_H, SCREEN_W};

    fn locator() -> DetailLocator {
        DetailLocator::new(ScreenSize::new(SCREEN_W, SCREEN_H), DetailParams::default(), false)
    }

    #[test]
    fn test_phone_button_from_resource_id() {
        let xml = screen(vec![
            Node::text_view("昆明花之源鲜花店", 40, 650, 800, 720),
            Node::new("android.widget.ImageView")
                .id("com.autonavi.minimap:id/phone_btn")
                .bounds(50, 1700, 300, 1780)
                .clickable(),
        ]);
        let info = locator().extract_merchant_info(&xml);
        assert_eq!(info.phone_button_pos, Some(Point::new(175, 1740)));
        assert_eq!(info.name.as_deref(), Some("昆明花之源鲜花店"));
    }

    #[test]
    fn test_region_strategy_fields() {
        let xml = screen(vec![
            Node::text_view("照片(12)", 40, 300, 300, 360),
            Node::text_view("营业中", 40, 640, 300, 700),
            Node::text_view(r##"<font size="48" color="#000000">昆明花之源鲜花店</font>"##, 40, 700, 800, 780),
            Node::text_view("4.6分", 40, 900, 200, 950),
            Node::text_view("营业时间 09:00-21:00", 40, 960, 600, 1010),
            Node::text_view("五华区春城路100号花卉大厦一楼", 40, 1020, 900, 1080),
            Node::button("电话", 50, 1100, 300, 1180),
        ]);
        let info = locator().extract_merchant_info(&xml);
        assert_eq!(info.name.as_deref(), Some("昆明花之源鲜花店"));
        assert_eq!(info.rating.as_deref(), Some("4.6"));
        assert_eq!(info.business_hours.as_deref(), Some("09:00-21:00"));
        assert_eq!(info.address.as_deref(), Some("五华区春城路100号花卉大厦一楼"));
        assert_eq!(info.phone_button_pos, Some(Point::new(175, 1140)));
    }

    #[test]
    fn test_fields_resolve_independently() {
        let xml = screen(vec![
            Node::text_view("花满庭鲜花", 40, 200, 400, 260).id("com.autonavi.minimap:id/shop_title"),
            Node::text_view("收录3年", 40, 270, 400, 300).id("com.autonavi.minimap:id/name_tag"),
            Node::text_view("官渡区关上北路88号花卉市场A区", 40, 1500, 900, 1560),
            Node::text_view("时间 07:30~19:30", 40, 1000, 600, 1040),
            Node::new("android.widget.TextView")
                .id("com.android.systemui:id/phone_signal")
                .bounds(900, 0, 1000, 40),
        ]);
        let info = locator().extract_merchant_info(&xml);
        assert_eq!(info.name.as_deref(), Some("花满庭鲜花"));
        assert_eq!(info.business_hours.as_deref(), Some("07:30~19:30"));
        // Outside every band; found by the sweep
        assert_eq!(info.address.as_deref(), Some("官渡区关上北路88号花卉市场A区"));
        assert_eq!(info.phone_button_pos, None);
        assert_eq!(info.rating, None);
    }

    #[test]
    fn test_region_fields_fill_in_after_resource_ids() {
        let xml = screen(vec![
            Node::text_view("昆明花之源鲜花店", 40, 650, 800, 720).id("com.autonavi.minimap:id/merchant_title"),
            Node::text_view("4.6分", 40, 900, 200, 950),
            Node::text_view("营业时间 09:00-21:00", 40, 960, 600, 1010),
            Node::text_view("五华区春城路100号花卉大厦一楼", 40, 1020, 900, 1080)
                .id("com.autonavi.minimap:id/address_text"),
            Node::new("android.widget.ImageView")
                .id("com.autonavi.minimap:id/phone_btn")
                .bounds(50, 1100, 300, 1180)
                .clickable(),
        ]);
        let info = locator().extract_merchant_info(&xml);
        assert_eq!(info.name.as_deref(), Some("昆明花之源鲜花店"));
        assert_eq!(info.address.as_deref(), Some("五华区春城路100号花卉大厦一楼"));
        assert_eq!(info.phone_button_pos, Some(Point::new(175, 1140)));
        assert_eq!(info.rating.as_deref(), Some("4.6"));
        assert_eq!(info.business_hours.as_deref(), Some("09:00-21:00"));
    }

    #[test]
    fn test_supply_phone_label_is_a_target() {
        let xml = screen(vec![Node::button("补充电话", 600, 1100, 900, 1180)]);
        assert_eq!(locator().extract_merchant_info(&xml).phone_button_pos, Some(Point::new(750, 1140)));
    }

    #[test]
    fn test_unusable_snapshot_is_empty() {
        assert!(locator().extract_merchant_info("").is_empty());
        assert!(locator().extract_merchant_info("<hierarchy>").is_empty());
    }
}
