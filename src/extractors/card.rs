// src/extractors/card.rs

// --- Imports ---
use crate::classifiers::text::{
    char_len, extract_name_candidates, is_advertisement, select_card_name,
};
use crate::config::LocatorParams;
use crate::tree::{Point, Rect, ScreenSize, UiNode};
use serde::Serialize;
use std::collections::HashMap;

// --- Data Structures ---
/// A validated merchant card on the result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantCard {
    pub name: String,
    pub bounds: Rect,
    /// Tap target on inert card area; always inside `bounds`.
    pub click_point: Point,
    /// Diagnostic score in [0, 1].
    pub confidence: f64,
    /// Reading order on the current page.
    pub index: usize,
}

/// Which sweep produced a raw candidate (for diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    ListChildren,
    Described,
}

// --- Main Locator Structure ---
pub struct CardLocator {
    screen: ScreenSize,
    params: LocatorParams,
    safe_y_min: i32,
    safe_y_max: i32,
    debug: bool,
}

impl CardLocator {
    /// Resolves the ratio-based safe band against the screen once.
    pub fn new(screen: ScreenSize, params: LocatorParams, debug: bool) -> Self {
        let safe_y_min = params
            .safe_y_min_ratio
            .map(|r| screen.y_at(r))
            .unwrap_or(params.safe_y_min);
        let safe_y_max = params
            .safe_y_max_ratio
            .map(|r| screen.y_at(r))
            .unwrap_or(params.safe_y_max);

        tracing::debug!(
            "CardLocator for {}x{}: safe band y {}..{}, width ratio {:.2}..{:.2}, height {}..{}",
            screen.width,
            screen.height,
            safe_y_min,
            safe_y_max,
            params.min_width_ratio,
            params.max_width_ratio,
            params.min_height,
            params.max_height
        );

        Self { screen, params, safe_y_min, safe_y_max, debug }
    }

    pub fn safe_band(&self) -> (i32, i32) {
        (self.safe_y_min, self.safe_y_max)
    }

    /// Parses a snapshot and locates cards. A malformed snapshot yields no cards.
    pub fn find_merchant_cards(&self, xml: &str) -> Vec<MerchantCard> {
        match UiNode::parse_tree(xml) {
            Ok(root) => self.find_cards_in(&root),
            Err(e) => {
                tracing::warn!("Card search skipped, snapshot unusable: {}", e);
                Vec::new()
            }
        }
    }

    pub fn find_cards_in(&self, root: &UiNode) -> Vec<MerchantCard> {
        let from_lists: Vec<MerchantCard> = list_children(root)
            .into_iter()
            .filter_map(|node| self.build_card(node, Strategy::ListChildren))
            .collect();
        let from_descriptions: Vec<MerchantCard> = described_nodes(root)
            .into_iter()
            .filter_map(|node| self.build_card(node, Strategy::Described))
            .collect();

        tracing::debug!(
            "Card strategies: {} from list children, {} from described nodes",
            from_lists.len(),
            from_descriptions.len()
        );

        let cards = merge_cards(from_lists, from_descriptions, self.params.merge_y_bucket);
        tracing::info!("Located {} merchant card(s)", cards.len());
        for card in &cards {
            tracing::debug!(
                "  #{} {:?} at {} tap {} confidence {:.2}",
                card.index,
                card.name,
                card.bounds,
                card.click_point,
                card.confidence
            );
        }
        cards
    }

    fn build_card(&self, node: &UiNode, strategy: Strategy) -> Option<MerchantCard> {
        let bounds = node.bounds?;

        if let Err(reason) = self.validate_bounds(&bounds) {
            self.log_rejection(&bounds, strategy, &reason);
            return None;
        }

        let candidates = extract_name_candidates(node, &self.params);
        let Some(best) = select_card_name(&candidates, self.params.name_target_chars) else {
            self.log_rejection(&bounds, strategy, "no plausible merchant name");
            return None;
        };
        if is_advertisement(&best.text) {
            self.log_rejection(&bounds, strategy, &format!("advertisement {:?}", best.text));
            return None;
        }

        Some(MerchantCard {
            name: best.text.clone(),
            bounds,
            click_point: self.click_point(&bounds),
            confidence: self.confidence(&bounds, &best.text),
            index: 0,
        })
    }

    /// Position, width and height gates. `Err` carries the first failing reason.
    pub fn validate_bounds(&self, rect: &Rect) -> Result<(), String> {
        if rect.y1 < self.safe_y_min {
            return Err(format!("top {} above safe band start {}", rect.y1, self.safe_y_min));
        }
        if rect.y2 > self.safe_y_max {
            return Err(format!("bottom {} below safe band end {}", rect.y2, self.safe_y_max));
        }

        let width_ratio = rect.width_ratio(self.screen.width);
        if width_ratio < self.params.min_width_ratio || width_ratio > self.params.max_width_ratio {
            return Err(format!(
                "width ratio {:.3} outside {:.2}..{:.2}",
                width_ratio, self.params.min_width_ratio, self.params.max_width_ratio
            ));
        }

        let height = rect.height();
        if height < self.params.min_height || height > self.params.max_height {
            return Err(format!(
                "height {} outside {}..{}",
                height, self.params.min_height, self.params.max_height
            ));
        }
        Ok(())
    }

    /// Center of the configured tap zone, away from the right-hand action icons.
    pub fn click_point(&self, rect: &Rect) -> Point {
        rect.point_within(
            self.params.click_zone_left_ratio,
            self.params.click_zone_right_ratio,
            self.params.click_zone_top_ratio,
            self.params.click_zone_bottom_ratio,
        )
    }

    pub fn confidence(&self, rect: &Rect, name: &str) -> f64 {
        let tiers = &self.params.confidence;
        let score = tiers.y_position.factor(f64::from(rect.y1))
            * tiers.width_ratio.factor(rect.width_ratio(self.screen.width))
            * tiers.height.factor(f64::from(rect.height()))
            * tiers.name_length.factor(char_len(name) as f64);
        score.clamp(0.0, 1.0)
    }

    fn log_rejection(&self, rect: &Rect, strategy: Strategy, reason: &str) {
        if self.debug {
            tracing::info!("Rejected {:?} candidate {}: {}", strategy, rect, reason);
        } else {
            tracing::trace!("Rejected {:?} candidate {}: {}", strategy, rect, reason);
        }
    }
}

// --- Candidate sweeps ---

/// Clickable card groups anywhere below a list container.
fn list_children(root: &UiNode) -> Vec<&UiNode> {
    root.list_containers()
        .flat_map(|list| list.descendants().filter(|n| n.is_card_group()))
        .collect()
}

/// Clickable nodes carrying an accessibility description.
fn described_nodes(root: &UiNode) -> Vec<&UiNode> {
    root.iter()
        .filter(|n| n.clickable && n.bounds.is_some() && !n.content_desc.trim().is_empty())
        .collect()
}

/// Merges both strategies keyed on `(y1 bucket, name)`, keeping the strictly
/// wider rectangle, then orders by `y1` and assigns indexes.
pub fn merge_cards(
    primary: Vec<MerchantCard>,
    secondary: Vec<MerchantCard>,
    y_bucket: i32,
) -> Vec<MerchantCard> {
    let bucket = y_bucket.max(1);
    let mut merged: Vec<MerchantCard> = Vec::new();
    let mut slots: HashMap<(i32, String), usize> = HashMap::new();

    for card in primary.into_iter().chain(secondary) {
        let key = (card.bounds.y1.div_euclid(bucket) * bucket, card.name.clone());
        match slots.get(&key) {
            Some(&slot) => {
                if card.bounds.width() > merged[slot].bounds.width() {
                    merged[slot] = card;
                }
            }
            None => {
                slots.insert(key, merged.len());
                merged.push(card);
            }
        }
    }

    merged.sort_by_key(|c| c.bounds.y1);
    for (index, card) in merged.iter_mut().enumerate() {
        card.index = index;
    }
    merged
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{screen, Node, SCREEN_H, SCREEN_W};

    fn locator() -> CardLocator {
        CardLocator::new(ScreenSize::new(SCREEN_W, SCREEN_H), LocatorParams::default(), false)
    }

    fn card(name: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> MerchantCard {
        let bounds = Rect::new(x1, y1, x2, y2).unwrap();
        MerchantCard {
            name: name.to_string(),
            bounds,
            click_point: bounds.center(),
            confidence: 1.0,
            index: 0,
        }
    }

    #[test]
    fn test_safe_band_from_ratios_and_fallback() {
        assert_eq!(locator().safe_band(), (480, 1800));

        let params = LocatorParams {
            safe_y_min_ratio: None,
            safe_y_max_ratio: None,
            ..LocatorParams::default()
        };
        let fixed = CardLocator::new(ScreenSize::new(SCREEN_W, SCREEN_H), params, false);
        assert_eq!(fixed.safe_band(), (500, 1800));
    }

    #[test]
    fn test_list_scenario_drops_ad_card() {
        let xml = screen(vec![Node::list(0, 400, 1080, 2000).children(vec![
            Node::card(65, 700, 1015, 880)
                .child(Node::text_view("鲜花速递店", 100, 710, 600, 750))
                .child(Node::text_view("地址：春城路100号", 100, 750, 700, 790)),
            Node::card(65, 900, 1015, 1080).child(Node::text_view("高德红包", 100, 910, 400, 950)),
            Node::card(65, 1600, 1015, 1780).child(Node::text_view("老王花店", 100, 1610, 400, 1650)),
        ])]);

        let cards = locator().find_merchant_cards(&xml);
        let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["鲜花速递店", "老王花店"]);
        assert_eq!(cards[0].index, 0);
        assert_eq!(cards[1].index, 1);
        assert_eq!(cards[0].click_point, Point::new(397, 790));
        for c in &cards {
            assert!(c.bounds.contains(c.click_point));
            assert!(c.confidence > 0.0 && c.confidence <= 1.0);
        }
    }

    #[test]
    fn test_gates_reject_with_reasons() {
        let loc = locator();
        let top_banner = Rect::new(65, 200, 1015, 380).unwrap();
        let bottom_nav = Rect::new(65, 1700, 1015, 1880).unwrap();
        let too_narrow = Rect::new(65, 700, 565, 880).unwrap();
        let too_tall = Rect::new(65, 700, 1015, 1200).unwrap();
        let too_short = Rect::new(65, 700, 1015, 760).unwrap();

        assert!(loc.validate_bounds(&top_banner).unwrap_err().contains("above safe band"));
        assert!(loc.validate_bounds(&bottom_nav).unwrap_err().contains("below safe band"));
        assert!(loc.validate_bounds(&too_narrow).unwrap_err().contains("width ratio"));
        assert!(loc.validate_bounds(&too_tall).unwrap_err().contains("height"));
        assert!(loc.validate_bounds(&too_short).unwrap_err().contains("height"));
        // Narrow layout (~66% width) passes
        assert!(loc.validate_bounds(&Rect::new(300, 700, 1015, 880).unwrap()).is_ok());
    }

    #[test]
    fn test_described_strategy_and_merge_with_list_strategy() {
        // Same card seen by both sweeps; the described node is slightly wider
        let xml = screen(vec![
            Node::list(0, 400, 1080, 2000).child(
                Node::card(65, 702, 1005, 880).child(Node::text_view("花语小铺", 100, 710, 400, 750)),
            ),
            Node::new("android.widget.FrameLayout")
                .desc("花语小铺")
                .bounds(60, 705, 1020, 880)
                .clickable()
                .child(Node::text_view("花语小铺", 100, 710, 400, 750)),
        ]);

        let cards = locator().find_merchant_cards(&xml);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].bounds, Rect::new(60, 705, 1020, 880).unwrap());
    }

    #[test]
    fn test_merge_keeps_wider_and_orders() {
        let a = vec![card("老王花店", 65, 903, 1015, 1080), card("花语小铺", 65, 700, 1015, 880)];
        let b = vec![
            card("老王花店", 40, 907, 1040, 1080),
            card("老王花店", 65, 912, 1015, 1080), // next bucket: stays separate
        ];
        let merged = merge_cards(a, b, 10);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].name, "花语小铺");
        assert_eq!(merged[1].bounds.width(), 1000);
        assert_eq!(merged[2].bounds.y1, 912);
        assert_eq!(
            merged.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        // Equal widths: first seen wins
        let merged = merge_cards(
            vec![card("花店", 65, 700, 1015, 880)],
            vec![card("花店", 65, 701, 1015, 881)],
            10,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bounds.y1, 700);
    }

    #[test]
    fn test_confidence_monotonic_over_width() {
        let loc = locator();
        let score_for = |width: i32| {
            let x1 = (SCREEN_W - width) / 2;
            loc.confidence(&Rect::new(x1, 700, x1 + width, 880).unwrap(), "老王花店")
        };

        // Ideal at ~92.5%; drifting wider never raises the score
        let mut prev = score_for(999);
        assert_eq!(prev, 1.0);
        for width in 1000..=SCREEN_W {
            let score = score_for(width);
            assert!(score <= prev, "width {} scored {} after {}", width, score, prev);
            prev = score;
        }

        // ...nor does drifting narrower within the full-width layout band
        let mut prev = score_for(999);
        for width in (918..999).rev() {
            let score = score_for(width);
            assert!(score <= prev, "width {} scored {} after {}", width, score, prev);
            prev = score;
        }
    }

    #[test]
    fn test_confidence_factors() {
        let loc = locator();
        let ideal = Rect::new(40, 700, 1040, 880).unwrap();
        assert_eq!(loc.confidence(&ideal, "老王花店"), 1.0);
        let long_name = "花".repeat(31);
        assert!((loc.confidence(&ideal, &long_name) - 0.7).abs() < 1e-9);
        let low = Rect::new(40, 1550, 1040, 1730).unwrap();
        assert!((loc.confidence(&low, "老王花店") - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_click_point_inside_for_any_card() {
        let loc = locator();
        for (w, h) in [(1, 1), (2, 3), (7, 100), (650, 180), (1015, 449)] {
            let rect = Rect::new(30, 600, 30 + w, 600 + h).unwrap();
            let p = loc.click_point(&rect);
            assert!(rect.contains(p), "{} outside {}", p, rect);
        }
    }

    #[test]
    fn test_malformed_snapshot_yields_nothing() {
        assert!(locator().find_merchant_cards("<hierarchy><node").is_empty());
        assert!(locator().find_merchant_cards("").is_empty());
    }
}
