// src/classifiers/text.rs

// --- Imports ---
use crate::classifiers::keywords::{self, contains_any, count_hits};
use crate::classifiers::markup::strip_tags;
use crate::config::LocatorParams;
use crate::tree::UiNode;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// --- Regex Patterns (Lazy Static) ---
// Short prefix followed by a clock time, e.g. "半夜12:12" promos
static CLOCK_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.{0,3}\d{1,2}:\d{2}").expect("Failed to compile CLOCK_PREFIX_RE"));

// A bare distance or duration, e.g. "5.8公里"
static BARE_DISTANCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.?\d*\s?(公里|km|米|m|分钟)$").expect("Failed to compile BARE_DISTANCE_RE")
});

// "收录1年", "收录6个月" registration badges
static REGISTERED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^收录\d+[年个月天]").expect("Failed to compile REGISTERED_TAG_RE"));

// Market stall codes: "A35-38号", "2期487-488"
static UNIT_CODE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"[A-Z]\d+-\d+号", r"\d+期\d+-\d+"]
        .iter()
        .filter_map(|pat| Regex::new(pat).ok())
        .collect()
});

static PHOTO_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^照片\(\d+\)$").expect("Failed to compile PHOTO_LABEL_RE"));
static BARE_RATING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("Failed to compile BARE_RATING_RE"));
static RATING_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\s*分").expect("Failed to compile RATING_PREFIX_RE"));
static TIME_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}").expect("Failed to compile TIME_PREFIX_RE"));

static NAME_NOISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[（）()·.。\s]").expect("Failed to compile NAME_NOISE_RE"));

/// Card names up to this length get a small bonus in the last tie-break key.
const PREFERRED_NAME_MAX_CHARS: usize = 20;
/// Short labels are checked against tag keywords.
const SHORT_TAG_MAX_CHARS: usize = 3;
/// Market-style names shorter than this may be business names.
const MARKET_NAME_MAX_CHARS: usize = 15;

/// Character count (not bytes).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

// --- Predicates ---

pub fn is_advertisement(text: &str) -> bool {
    contains_any(text, keywords::AD_KEYWORDS)
        || CLOCK_PREFIX_RE.is_match(text)
        || BARE_DISTANCE_RE.is_match(text)
}

pub fn is_address_text(text: &str) -> bool {
    if text.starts_with(keywords::ADDRESS_LABEL) {
        return true;
    }

    let has_admin = contains_any(text, keywords::ADDRESS_ADMIN_KEYWORDS);
    let has_road = contains_any(text, keywords::ADDRESS_ROAD_KEYWORDS);
    if has_admin && has_road {
        return true;
    }

    if contains_any(text, keywords::DISTANCE_KEYWORDS) {
        return true;
    }

    if contains_any(text, keywords::SPECIAL_ADDRESS_KEYWORDS) {
        // "斗南花卉市场" is a business; "xx大棚2期" is a place
        let is_market_name = char_len(text) < MARKET_NAME_MAX_CHARS
            && count_hits(text, keywords::SPECIAL_ADDRESS_KEYWORDS) == 1
            && contains_any(text, keywords::MARKET_NAME_KEYWORDS);
        return !is_market_name;
    }

    UNIT_CODE_RES.iter().any(|re| re.is_match(text))
}

pub fn is_tag_text(text: &str) -> bool {
    if REGISTERED_TAG_RE.is_match(text) {
        return true;
    }
    if char_len(text) <= SHORT_TAG_MAX_CHARS && contains_any(text, keywords::TAG_KEYWORDS) {
        return true;
    }
    keywords::TAG_SUFFIXES.iter().any(|k| text.ends_with(k))
}

pub fn is_excluded_text(text: &str) -> bool {
    contains_any(text, keywords::EXCLUDED_KEYWORDS)
}

/// Bracket-quoted product titles, or text heavy with product vocabulary.
pub fn is_product_title(text: &str, keyword_limit: usize) -> bool {
    text.contains('【') || text.contains('】') || count_hits(text, keywords::PRODUCT_KEYWORDS) >= keyword_limit
}

pub fn is_registration_tag(text: &str) -> bool {
    REGISTERED_TAG_RE.is_match(text)
}

/// Detail-page text that cannot be the merchant title: photo labels, ratings,
/// times, business status, section labels, product titles.
pub fn is_detail_excluded_name(text: &str) -> bool {
    PHOTO_LABEL_RE.is_match(text)
        || text.starts_with("照片")
        || text.contains("相册")
        || BARE_RATING_RE.is_match(text)
        || RATING_PREFIX_RE.is_match(text)
        || TIME_PREFIX_RE.is_match(text)
        || keywords::BUSINESS_STATUS_LABELS.contains(&text)
        || keywords::DETAIL_PAGE_LABELS.contains(&text)
        || text.contains('【')
        || text.contains('】')
}

// --- Name candidates ---

#[derive(Debug, Clone, PartialEq)]
pub struct NameCandidate {
    pub text: String,
    pub length: usize,
    /// 0.0 = top of the enclosing card or band, 1.0 = bottom.
    pub relative_y: f64,
    /// From `<font size="N">`; 0 when the text carries no size.
    pub font_size: u32,
}

impl NameCandidate {
    pub fn new(text: String, relative_y: f64, font_size: u32) -> Self {
        let length = char_len(&text);
        Self { text, length, relative_y, font_size }
    }
}

/// Collects plausible merchant names from a card subtree (the card node itself excluded).
pub fn extract_name_candidates(card: &UiNode, params: &LocatorParams) -> Vec<NameCandidate> {
    let Some(card_bounds) = card.bounds else {
        return Vec::new();
    };
    let card_top = f64::from(card_bounds.y1);
    let card_height = f64::from(card_bounds.height());

    let mut candidates = Vec::new();
    for node in card.descendants().filter(|n| n.has_text()) {
        let Some(text_bounds) = node.bounds else {
            continue;
        };

        let clean = strip_tags(&node.text);
        let length = char_len(&clean);
        if length < params.name_min_chars || length > params.name_max_chars {
            continue;
        }
        if is_product_title(&clean, params.product_keyword_limit)
            || is_address_text(&clean)
            || is_excluded_text(&clean)
            || is_tag_text(&clean)
        {
            continue;
        }

        let relative_y = if card_height > 0.0 {
            (f64::from(text_bounds.y1) - card_top) / card_height
        } else {
            1.0
        };
        if relative_y > params.name_max_relative_y {
            continue;
        }

        candidates.push(NameCandidate::new(clean, relative_y, 0));
    }
    candidates
}

fn length_distance(candidate: &NameCandidate, target: usize) -> usize {
    candidate.length.abs_diff(target)
}

/// Card rule: topmost first, then length closest to `target`, then prefer
/// longer names up to 20 characters and shorter ones beyond.
pub fn select_card_name(candidates: &[NameCandidate], target: usize) -> Option<&NameCandidate> {
    let length_pref = |c: &NameCandidate| -> i64 {
        let len = c.length as i64;
        if c.length <= PREFERRED_NAME_MAX_CHARS {
            -len
        } else {
            len
        }
    };
    candidates.iter().min_by(|a, b| {
        a.relative_y
            .total_cmp(&b.relative_y)
            .then_with(|| length_distance(a, target).cmp(&length_distance(b, target)))
            .then_with(|| length_pref(a).cmp(&length_pref(b)))
    })
}

/// Detail rule: largest font first, then topmost, then length closest to `target`.
pub fn select_detail_name(candidates: &[NameCandidate], target: usize) -> Option<&NameCandidate> {
    candidates.iter().min_by(|a, b| {
        b.font_size
            .cmp(&a.font_size)
            .then_with(|| a.relative_y.total_cmp(&b.relative_y))
            .then_with(|| length_distance(a, target).cmp(&length_distance(b, target)))
    })
}

/// Loose comparison of a card name with a detail-page title: equal or contained
/// after dropping brackets/dots/spaces, or at least half of the expected
/// characters shared.
pub fn names_match(expected: &str, actual: &str) -> bool {
    let expected_clean = NAME_NOISE_RE.replace_all(expected, "");
    let actual_clean = NAME_NOISE_RE.replace_all(actual, "");

    if expected_clean.is_empty() {
        return false;
    }
    if expected_clean == actual_clean || actual_clean.contains(expected_clean.as_ref()) {
        return true;
    }

    let expected_chars: HashSet<char> = expected_clean.chars().collect();
    let actual_chars: HashSet<char> = actual_clean.chars().collect();
    let common = expected_chars.intersection(&actual_chars).count();
    common as f64 / expected_chars.len() as f64 >= 0.5
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hierarchy, Node};

    const GOOD_NAMES: &[&str] = &[
        "老王花店", "花之源花艺工作室", "斗南花卉市场", "昆明花之源花艺", "云南花卉交易中心",
        "小雏菊花坊", "花语小铺", "玫瑰人生花艺馆",
    ];

    #[test]
    fn test_advertisement_keywords_with_padding() {
        for keyword in keywords::AD_KEYWORDS {
            for (pre, post) in [("", ""), ("花店", ""), ("", "活动中"), ("限时", "进行中!!")] {
                let text = format!("{}{}{}", pre, keyword, post);
                assert!(is_advertisement(&text), "{:?} should be an ad", text);
            }
        }
        for name in GOOD_NAMES {
            assert!(!is_advertisement(name), "{:?} is a real merchant", name);
        }
    }

    #[test]
    fn test_advertisement_patterns() {
        assert!(is_advertisement("半夜12:12"));
        assert!(is_advertisement("9:30开抢"));
        assert!(is_advertisement("5.8公里"));
        assert!(is_advertisement("300m"));
        assert!(is_advertisement("12 分钟"));
        assert!(!is_advertisement("花店营业至深夜12:30")); // clock too far from start
        assert!(!is_advertisement("5.8公里外的花店"));
    }

    #[test]
    fn test_address_text() {
        assert!(is_address_text("官渡区肖家营大棚2期487-488"));
        assert!(is_address_text("五华区春城路100号"));
        assert!(is_address_text("距您2.3公里"));
        assert!(is_address_text("步行10分钟"));
        assert!(is_address_text("地址：春城路100号"));
        assert!(is_address_text("B12-15号"));
        assert!(is_address_text("斗南花卉市场大棚"));
        assert!(is_address_text("斗南国际花卉交易中心一号交易大厅西区"));
        assert!(!is_address_text("斗南花卉市场"));
        assert!(!is_address_text("云南花卉交易中心"));
        assert!(!is_address_text("老王花店"));
    }

    #[test]
    fn test_tag_text() {
        assert!(is_tag_text("收录1年"));
        assert!(is_tag_text("收录6个月"));
        assert!(is_tag_text("超棒"));
        assert!(is_tag_text("4分"));
        assert!(is_tag_text("入驻商家"));
        assert!(is_tag_text("100条评价"));
        assert!(!is_tag_text("老王花店"));
        assert!(!is_tag_text("好运来鲜花店"));
    }

    #[test]
    fn test_excluded_and_detail_names() {
        assert!(is_excluded_text("附近更多"));
        assert!(is_excluded_text("人均¥88"));
        assert!(!is_excluded_text("老王花店"));

        assert!(is_detail_excluded_name("照片(12)"));
        assert!(is_detail_excluded_name("4.1"));
        assert!(is_detail_excluded_name("4.1分 很好"));
        assert!(is_detail_excluded_name("10:00-22:00"));
        assert!(is_detail_excluded_name("营业中"));
        assert!(is_detail_excluded_name("【精品】玫瑰花束"));
        assert!(!is_detail_excluded_name("昆明花之源鲜花店"));
    }

    fn card_with_texts(texts: &[(&str, i32)]) -> UiNode {
        let mut card = Node::card(65, 700, 1015, 880);
        for (text, y) in texts {
            card = card.child(Node::text_view(text, 100, *y, 600, y + 40));
        }
        let root = UiNode::parse_tree(&hierarchy(vec![card])).unwrap();
        root.children[0].clone()
    }

    #[test]
    fn test_name_candidates_filtering() {
        let card = card_with_texts(&[
            ("鲜花速递店", 710),
            ("【99朵】玫瑰花束", 720),
            ("收录2年", 730),
            ("全国鲜花速递花束配送上门", 735),
            ("附近更多", 740),
            ("<b>小雏菊花坊</b>", 760),
            ("花满庭鲜花", 800), // below 40% of the card
        ]);
        let params = LocatorParams::default();
        let cands = extract_name_candidates(&card, &params);
        let texts: Vec<&str> = cands.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["鲜花速递店", "小雏菊花坊"]);
        assert!((cands[0].relative_y - 10.0 / 180.0).abs() < 1e-9);

        assert_eq!(select_card_name(&cands, 10).map(|c| c.text.as_str()), Some("鲜花速递店"));
    }

    #[test]
    fn test_card_tie_break_order() {
        let same_row = vec![
            NameCandidate::new("花店花店花店".to_string(), 0.1, 0), // 6
            NameCandidate::new("花店花店花店花店花店".to_string(), 0.1, 0), // 10
            NameCandidate::new("花".repeat(12), 0.05, 0),
        ];
        // Topmost wins even with a worse length
        assert_eq!(select_card_name(&same_row, 10).unwrap().length, 12);
        // Same position: closest to target length
        assert_eq!(select_card_name(&same_row[..2], 10).unwrap().length, 10);
        // Equal distance to target: longer wins below 20 chars
        let equal_distance = vec![
            NameCandidate::new("花".repeat(8), 0.1, 0),
            NameCandidate::new("花".repeat(12), 0.1, 0),
        ];
        assert_eq!(select_card_name(&equal_distance, 10).unwrap().length, 12);
    }

    #[test]
    fn test_detail_tie_break_font_first() {
        let cands = vec![
            NameCandidate::new("入驻五年老店".to_string(), 0.0, 0),
            NameCandidate::new("昆明花之源鲜花店".to_string(), 0.6, 48),
            NameCandidate::new("花之源".to_string(), 0.3, 48),
        ];
        assert_eq!(select_detail_name(&cands, 12).unwrap().text, "花之源");
        assert_eq!(select_detail_name(&cands[..2], 12).unwrap().text, "昆明花之源鲜花店");
        assert!(select_detail_name(&[], 12).is_none());
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("花满庭鲜花", "花满庭鲜花（花开相爱旗舰店）"));
        assert!(names_match("老王 花店", "老王花店"));
        assert!(names_match("老王鲜花店", "老王花坊店"));
        assert!(!names_match("老王花店", "高德地图"));
        assert!(!names_match("", "老王花店"));
    }
}
