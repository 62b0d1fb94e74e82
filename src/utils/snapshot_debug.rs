// src/utils/snapshot_debug.rs
use crate::storage::category_slug;
use crate::utils::error::AppError;
use chrono::Utc;
use regex::Regex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Vocabulary worth spotting when reading a saved snapshot by hand.
pub const SNAPSHOT_PATTERNS: &[(&str, &str)] = &[
    (r#"(?:text|content-desc)="[^"]*电话[^"]*""#, "phone"),
    (r#"text="(?:筛选|排序)""#, "list_controls"),
    (r"附近上榜|附近商家|搜索结果", "list_title"),
    (r#"content-desc="[^"]*(?:搜索|反馈|举报|关闭|更多|(?i:search|feedback|close|more))[^"]*""#, "toolbar"),
    (r"服务推荐|上门配送|配送服务", "ad_page"),
    (r"拨号|最近通话|通讯录|联系人", "dialer"),
    (r"补充电话|暂无电话|未提供电话|添加电话", "supply_phone"),
    (r"没有更多|已经到底|暂无更多|到底了|就这些了", "end_of_list"),
    (r#"<font[^>]*>\s*[\d\-\s]{7,}\s*</font>"#, "phone_digits"),
];

/// Writes a report of every pattern hit in `xml`, sorted by position.
pub fn save_debug_report(xml: &str, filename: &Path, hits: &[(usize, usize, &str)]) -> Result<(), AppError> {
    let mut file = File::create(filename)?;

    let mut sorted_hits = hits.to_vec();
    sorted_hits.sort_by_key(|h| h.0);

    let mut report = format!("# {} hit(s) in {} bytes\n", sorted_hits.len(), xml.len());
    for (start, end, hit_type) in sorted_hits {
        report.push_str(&format!("{:>8}-{:<8} {:<14} {}\n", start, end, hit_type, &xml[start..end]));
    }

    file.write_all(report.as_bytes())?;
    tracing::debug!("Saved snapshot report to {}", filename.display());
    Ok(())
}

/// Finds each regex pattern in `xml` and writes the hits report.
pub fn create_debug_report(xml: &str, filename: &Path, patterns: &[(&str, &str)]) -> Result<(), AppError> {
    let mut hits = Vec::new();

    for (pattern, hit_type) in patterns {
        let re = Regex::new(pattern)
            .map_err(|e| AppError::Config(format!("Invalid regex pattern '{}': {}", pattern, e)))?;
        for mat in re.find_iter(xml) {
            hits.push((mat.start(), mat.end(), *hit_type));
        }
    }

    save_debug_report(xml, filename, &hits)
}

/// Saves the raw snapshot as `<dir>/<timestamp>_<label>.xml` with a `.hits.txt`
/// report beside it. Returns the snapshot path.
pub fn save_snapshot(dir: &Path, label: &str, xml: &str) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;

    let stem = format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S%3f"), category_slug(label));
    let xml_path = dir.join(format!("{}.xml", stem));
    fs::write(&xml_path, xml)?;

    create_debug_report(xml, &dir.join(format!("{}.hits.txt", stem)), SNAPSHOT_PATTERNS)?;

    tracing::info!("Saved debug snapshot to {}", xml_path.display());
    Ok(xml_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{screen, Node};
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_and_report() {
        let dir = TempDir::new().unwrap();
        let xml = screen(vec![
            Node::button("电话", 50, 1100, 300, 1180),
            Node::text_view("没有更多了", 300, 1900, 780, 1960),
        ]);

        let path = save_snapshot(dir.path(), "list page/1", &xml).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), xml);
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("list_page_1.xml"));

        let report_path = path.with_extension("hits.txt");
        let report = fs::read_to_string(report_path).unwrap();
        assert!(report.starts_with("# 2 hit(s)"));
        let phone_line = report.lines().position(|l| l.contains(" phone ")).unwrap();
        let end_line = report.lines().position(|l| l.contains("end_of_list")).unwrap();
        assert!(phone_line < end_line);
    }

    #[test]
    fn test_bad_pattern_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        let err = create_debug_report("<hierarchy/>", &path, &[("(unclosed", "broken")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
