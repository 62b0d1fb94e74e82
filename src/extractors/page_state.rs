// src/extractors/page_state.rs

// --- Imports ---
use crate::classifiers::keywords::{self, contains_any};
use crate::config::PageStateParams;
use crate::tree::{ScreenSize, UiNode};
use serde::Serialize;
use std::fmt;

// --- Data Structures ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageState {
    SearchResultList,
    MerchantDetail,
    DialerPage,
    SupplyPhoneDialog,
    Unknown,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageState::SearchResultList => "search result list",
            PageState::MerchantDetail => "merchant detail",
            PageState::DialerPage => "dialer",
            PageState::SupplyPhoneDialog => "supply phone dialog",
            PageState::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Card layout of a result list, judged from the first few card groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListLayout {
    FullWidth,
    Narrow,
    Unknown,
}

/// Named observations behind a classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageFeatures {
    pub has_list_container: bool,
    pub has_list_title: bool,
    pub has_filter_button: bool,
    pub has_sort_button: bool,
    pub has_min_list_items: bool,
    pub has_phone_action: bool,
    pub has_top_right_button_triplet: bool,
    pub has_navigation: bool,
    pub has_ad_page_keywords: bool,
    pub has_dialer_digits: bool,
    pub has_dialer_text: bool,
    pub has_map_app_text: bool,
    pub has_supply_phone_text: bool,
    pub has_end_of_list_marker: bool,
}

impl PageFeatures {
    /// Names of the features that are present.
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("has_list_container", self.has_list_container),
            ("has_list_title", self.has_list_title),
            ("has_filter_button", self.has_filter_button),
            ("has_sort_button", self.has_sort_button),
            ("has_min_list_items", self.has_min_list_items),
            ("has_phone_action", self.has_phone_action),
            ("has_top_right_button_triplet", self.has_top_right_button_triplet),
            ("has_navigation", self.has_navigation),
            ("has_ad_page_keywords", self.has_ad_page_keywords),
            ("has_dialer_digits", self.has_dialer_digits),
            ("has_dialer_text", self.has_dialer_text),
            ("has_map_app_text", self.has_map_app_text),
            ("has_supply_phone_text", self.has_supply_phone_text),
            ("has_end_of_list_marker", self.has_end_of_list_marker),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }

    pub fn is_list(&self) -> bool {
        self.has_list_container
            && ((self.has_list_title && self.has_filter_button)
                || (self.has_filter_button && self.has_sort_button && self.has_min_list_items))
    }

    pub fn is_detail(&self) -> bool {
        let by_toolbar = self.has_top_right_button_triplet;
        let by_navigation = self.has_navigation && !self.has_filter_button && !self.has_sort_button;
        self.has_phone_action && (by_toolbar || by_navigation) && !self.has_ad_page_keywords
    }

    pub fn is_dialer(&self) -> bool {
        (self.has_dialer_digits || self.has_dialer_text) && !self.has_map_app_text
    }

    pub fn is_supply_phone_dialog(&self) -> bool {
        self.has_supply_phone_text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageAnalysis {
    pub state: PageState,
    /// Advisory only; decisions use `state`.
    pub confidence: f64,
    pub features: PageFeatures,
    /// Clickable groups of card height in the fullest list container.
    pub estimated_cards: usize,
    pub layout: ListLayout,
}

impl PageAnalysis {
    fn unknown() -> Self {
        Self {
            state: PageState::Unknown,
            confidence: 0.0,
            features: PageFeatures::default(),
            estimated_cards: 0,
            layout: ListLayout::Unknown,
        }
    }
}

// --- Classifier ---
pub struct PageStateClassifier {
    screen: ScreenSize,
    params: PageStateParams,
}

impl PageStateClassifier {
    pub fn new(screen: ScreenSize, params: PageStateParams) -> Self {
        Self { screen, params }
    }

    /// Classifies a snapshot; an unusable one is `Unknown` with zero confidence.
    pub fn classify(&self, xml: &str) -> PageAnalysis {
        match UiNode::parse_tree(xml) {
            Ok(root) => self.classify_tree(&root),
            Err(e) => {
                tracing::debug!("Page classified as unknown, snapshot unusable: {}", e);
                PageAnalysis::unknown()
            }
        }
    }

    /// Precedence: dialer, detail, list, supply-phone dialog, unknown.
    pub fn classify_tree(&self, root: &UiNode) -> PageAnalysis {
        let features = self.features(root);

        let state = if features.is_dialer() {
            PageState::DialerPage
        } else if features.is_detail() {
            PageState::MerchantDetail
        } else if features.is_list() {
            PageState::SearchResultList
        } else if features.is_supply_phone_dialog() {
            PageState::SupplyPhoneDialog
        } else {
            PageState::Unknown
        };

        let analysis = PageAnalysis {
            state,
            confidence: confidence_for(state, &features),
            estimated_cards: self.estimate_cards(root),
            layout: self.layout(root),
            features,
        };
        tracing::debug!(
            "Page state {} (confidence {:.2}, features {:?})",
            analysis.state,
            analysis.confidence,
            analysis.features.active()
        );
        analysis
    }

    pub fn features(&self, root: &UiNode) -> PageFeatures {
        let has_filter_button = root.iter().any(|n| n.text.contains(keywords::FILTER_LABEL));
        let has_sort_button = root.iter().any(|n| n.text.contains(keywords::SORT_LABEL));

        PageFeatures {
            has_list_container: root.list_containers().next().is_some(),
            has_list_title: self.has_list_title(root),
            has_filter_button,
            has_sort_button,
            has_min_list_items: root.list_containers().any(|list| {
                list.descendants().filter(|n| n.is_card_group()).count() >= self.params.min_list_items
            }),
            has_phone_action: root.iter().any(|n| n.mentions(keywords::PHONE_LABEL)),
            has_top_right_button_triplet: self.has_top_right_triplet(root),
            has_navigation: root.iter().any(|n| n.mentions_any(keywords::NAVIGATION_KEYWORDS)),
            has_ad_page_keywords: root.iter().any(|n| n.text_contains_any(keywords::AD_PAGE_KEYWORDS)),
            has_dialer_digits: root.iter().any(|n| {
                n.clickable
                    && (keywords::DIALER_DIGIT_LABELS.contains(&n.text.as_str())
                        || keywords::DIALER_DIGIT_LABELS.contains(&n.content_desc.as_str()))
            }),
            has_dialer_text: root.iter().any(|n| n.mentions_any(keywords::DIALER_KEYWORDS)),
            has_map_app_text: root.iter().any(|n| n.text_contains_any(keywords::MAP_APP_KEYWORDS)),
            has_supply_phone_text: root.iter().any(|n| n.mentions_any(keywords::SUPPLY_PHONE_KEYWORDS)),
            has_end_of_list_marker: root
                .iter()
                .any(|n| n.text_contains_any(keywords::END_OF_LIST_MARKERS)),
        }
    }

    pub fn is_list_page(&self, root: &UiNode) -> bool {
        self.features(root).is_list()
    }

    pub fn is_detail_page(&self, root: &UiNode) -> bool {
        self.features(root).is_detail()
    }

    pub fn is_dialer_page(&self, root: &UiNode) -> bool {
        self.features(root).is_dialer()
    }

    pub fn is_supply_phone_dialog(&self, root: &UiNode) -> bool {
        root.iter().any(|n| n.mentions_any(keywords::SUPPLY_PHONE_KEYWORDS))
    }

    /// "No more results" style footer text.
    pub fn is_end_of_list(&self, root: &UiNode) -> bool {
        root.iter().any(|n| n.text_contains_any(keywords::END_OF_LIST_MARKERS))
    }

    fn has_list_title(&self, root: &UiNode) -> bool {
        root.iter().any(|n| {
            n.bounds.is_some_and(|b| b.y1 < self.params.list_title_max_y)
                && n.text_contains_any(keywords::LIST_TITLE_KEYWORDS)
        })
    }

    /// At least two of search, feedback and close/more in the top-right toolbar.
    fn has_top_right_triplet(&self, root: &UiNode) -> bool {
        let min_x = f64::from(self.screen.width) * self.params.top_right_x_ratio;
        let (mut search, mut feedback, mut close) = (false, false, false);

        for node in root.iter().filter(|n| n.clickable) {
            let Some(bounds) = node.bounds else {
                continue;
            };
            if f64::from(bounds.x1) <= min_x || bounds.y1 >= self.params.top_right_max_y {
                continue;
            }
            let desc_lower = node.content_desc.to_lowercase();

            search |= node.mentions_any(keywords::SEARCH_BUTTON_KEYWORDS)
                || contains_any(&desc_lower, keywords::SEARCH_BUTTON_DESC_LATIN);
            feedback |= node.mentions_any(keywords::FEEDBACK_BUTTON_KEYWORDS)
                || contains_any(&node.content_desc, keywords::FEEDBACK_BUTTON_DESC_ONLY)
                || contains_any(&desc_lower, keywords::FEEDBACK_BUTTON_DESC_LATIN);
            close |= node.mentions_any(keywords::CLOSE_BUTTON_KEYWORDS)
                || contains_any(&desc_lower, keywords::CLOSE_BUTTON_DESC_LATIN);
        }

        [search, feedback, close].iter().filter(|b| **b).count() >= 2
    }

    fn estimate_cards(&self, root: &UiNode) -> usize {
        let min = self.params.estimate_min_height;
        let max = self.params.estimate_max_height;
        root.list_containers()
            .map(|list| {
                list.descendants()
                    .filter(|n| n.is_card_group())
                    .filter_map(|n| n.bounds)
                    .filter(|b| (min..=max).contains(&b.height()))
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    fn layout(&self, root: &UiNode) -> ListLayout {
        for list in root.list_containers() {
            let sampled = list
                .descendants()
                .filter(|n| n.is_card_group())
                .filter_map(|n| n.bounds)
                .take(3);
            for bounds in sampled {
                let ratio = bounds.width_ratio(self.screen.width);
                if ratio >= self.params.full_width_layout_ratio {
                    return ListLayout::FullWidth;
                }
                if ratio >= self.params.narrow_layout.min && ratio < self.params.narrow_layout.max {
                    return ListLayout::Narrow;
                }
            }
        }
        ListLayout::Unknown
    }
}

fn confidence_for(state: PageState, f: &PageFeatures) -> f64 {
    let bonus = |on: bool, weight: f64| if on { weight } else { 0.0 };
    let score = match state {
        PageState::SearchResultList => {
            0.4 + bonus(f.has_min_list_items, 0.3)
                + bonus(f.has_list_title, 0.2)
                + bonus(f.has_filter_button && f.has_sort_button, 0.1)
        }
        PageState::MerchantDetail => {
            0.4 + bonus(f.has_top_right_button_triplet, 0.3)
                + bonus(f.has_navigation, 0.2)
                + bonus(!f.has_filter_button && !f.has_sort_button, 0.1)
        }
        PageState::DialerPage => {
            0.5 + bonus(f.has_dialer_digits, 0.3) + bonus(f.has_dialer_text, 0.2)
        }
        PageState::SupplyPhoneDialog => 0.9,
        PageState::Unknown => 0.0,
    };
    score.min(1.0)
}
