// src/extractors/phone.rs
//! Reads phone numbers from the transient "call" dialog shown after tapping the
//! phone affordance. The dialog renders each number inside a `<font>` run;
//! plain-text numbers are the fallback.

use crate::classifiers::keywords::PHONE_LABEL;
use crate::classifiers::markup::{digit_runs, strip_tags};
use crate::tree::UiNode;
use once_cell::sync::Lazy;
use regex::Regex;

// Mobile, landline with area code, then any dashed number
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"1[3-9]\d{9}", r"0\d{2,3}-?\d{7,8}", r"\d{3,4}-\d{7,8}"]
        .iter()
        .filter_map(|pat| Regex::new(pat).ok())
        .collect()
});

/// 11 digits starting with 1 (mobile), or 7 to 12 digits (landline).
pub fn is_valid_phone(raw: &str) -> bool {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let len = digits.len();
    (len == 11 && digits.starts_with('1')) || (7..=12).contains(&len)
}

fn push_unique(phones: &mut Vec<String>, phone: String) {
    if !phones.contains(&phone) {
        phones.push(phone);
    }
}

/// Phone numbers found in plain text by pattern, dashes removed.
pub fn phones_in_text(text: &str) -> Vec<String> {
    let mut phones = Vec::new();
    for pattern in PHONE_PATTERNS.iter() {
        for found in pattern.find_iter(text) {
            let phone = found.as_str().replace('-', "");
            if is_valid_phone(&phone) {
                push_unique(&mut phones, phone);
            }
        }
    }
    phones
}

/// All phone numbers on the dialog, in document order without duplicates.
/// `<font>` digit runs win; patterns over plain text apply only when none exist.
pub fn read_phone_numbers(root: &UiNode) -> Vec<String> {
    let text_nodes: Vec<&UiNode> = root.iter().filter(|n| n.has_text()).collect();

    let mut phones = Vec::new();
    for node in &text_nodes {
        for run in digit_runs(&node.text) {
            if is_valid_phone(&run) {
                tracing::debug!("Phone from font run: {}", run);
                push_unique(&mut phones, run);
            }
        }
    }

    if phones.is_empty() {
        for node in &text_nodes {
            for phone in phones_in_text(&strip_tags(&node.text)) {
                tracing::debug!("Phone from text pattern: {}", phone);
                push_unique(&mut phones, phone);
            }
        }
    }

    if phones.is_empty() && !root.iter().any(|n| n.text.contains(PHONE_LABEL)) {
        tracing::warn!("No phone dialog title on screen; the phone tap may have missed");
    }
    phones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{screen, Node};

    fn dialog(texts: &[&str]) -> UiNode {
        let mut nodes = vec![Node::text_view("拨打电话", 0, 1728, 1080, 1800)];
        for (i, text) in texts.iter().enumerate() {
            let y = 1800 + 100 * i as i32;
            nodes.push(Node::text_view(text, 0, y, 1080, y + 100));
        }
        UiNode::parse_tree(&screen(nodes)).unwrap()
    }

    #[test]
    fn test_validity() {
        assert!(is_valid_phone("18685488479"));
        assert!(is_valid_phone("08711234567"));
        assert!(is_valid_phone("1234567"));
        assert!(is_valid_phone("0871-1234567"));
        assert!(!is_valid_phone("123456"));
        assert!(!is_valid_phone("1234567890123"));
    }

    #[test]
    fn test_font_runs_take_priority() {
        let root = dialog(&[
            r##"<font size="32px" color="#1A66FF">18685488479</font>"##,
            r##"<font size="32px" color="#1A66FF">18685488479</font>"##,
            "备用 0871-65123456",
        ]);
        assert_eq!(read_phone_numbers(&root), vec!["18685488479".to_string()]);
    }

    #[test]
    fn test_pattern_fallback_dedups_in_order() {
        let root = dialog(&["手机 13912345678", "座机 0871-65123456", "13912345678"]);
        assert_eq!(
            read_phone_numbers(&root),
            vec!["13912345678".to_string(), "087165123456".to_string()]
        );
    }

    #[test]
    fn test_no_numbers() {
        assert!(read_phone_numbers(&dialog(&["取消"])).is_empty());
        assert!(phones_in_text("营业时间 09:00-21:00").is_empty());
    }
}
