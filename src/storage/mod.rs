// src/storage/mod.rs
use crate::collector::models::{CollectionReport, MerchantRecord};
use crate::utils::error::StorageError;
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const RECORDS_FILE: &str = "merchants.jsonl";
const SUMMARY_FILE: &str = "run_summary.json";

/// Where collected records go. Returns `false` when the record was already stored.
pub trait RecordSink {
    fn save_record(&mut self, record: &MerchantRecord) -> Result<bool, StorageError>;
}

impl RecordSink for Vec<MerchantRecord> {
    fn save_record(&mut self, record: &MerchantRecord) -> Result<bool, StorageError> {
        self.push(record.clone());
        Ok(true)
    }
}

/// Directory name for a category: path separators and whitespace become `_`.
pub fn category_slug(category: &str) -> String {
    let slug: String = category
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if slug.is_empty() || slug.chars().all(|c| c == '.' || c == '_') {
        "uncategorized".to_string()
    } else {
        slug
    }
}

/// JSON-lines store, one file per category, de-duplicated by `(name, address)`
/// across runs.
pub struct StorageManager {
    base_dir: PathBuf,
    known: HashMap<String, HashSet<(String, String)>>,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path, known: HashMap::new() })
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.base_dir.join(category_slug(category))
    }

    pub fn records_path(&self, category: &str) -> PathBuf {
        self.category_dir(category).join(RECORDS_FILE)
    }

    /// All records stored for a category; unreadable lines are skipped.
    pub fn load_records(&self, category: &str) -> Result<Vec<MerchantRecord>, StorageError> {
        let path = self.records_path(category);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(i, line)| match serde_json::from_str::<MerchantRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable line {} of {}: {}", i + 1, path.display(), e);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    fn known_keys(&mut self, category: &str) -> Result<&mut HashSet<(String, String)>, StorageError> {
        let slug = category_slug(category);
        if !self.known.contains_key(&slug) {
            let keys: HashSet<(String, String)> = self
                .load_records(category)?
                .iter()
                .map(MerchantRecord::dedup_key)
                .collect();
            tracing::debug!("Loaded {} stored record key(s) for {}", keys.len(), slug);
            self.known.insert(slug.clone(), keys);
        }
        Ok(self.known.entry(slug).or_default())
    }

    /// Writes pretty JSON describing a finished run next to the category's records.
    pub fn save_run_summary(&self, report: &CollectionReport) -> Result<PathBuf, StorageError> {
        let target_dir = self.category_dir(&report.category);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        let file_path = target_dir.join(SUMMARY_FILE);

        let summary = serde_json::json!({
            "category": report.category,
            "stop_reason": report.stop_reason,
            "pages": report.pages,
            "records": report.records.len(),
            "stats": report.stats,
            "started_at": report.started_at.to_rfc3339(),
            "finished_at": report.finished_at.to_rfc3339(),
            "summary_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let summary_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, summary_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved run summary to {}", file_path.display());
        Ok(file_path)
    }
}

impl RecordSink for StorageManager {
    fn save_record(&mut self, record: &MerchantRecord) -> Result<bool, StorageError> {
        let key = record.dedup_key();
        if self.known_keys(&record.category)?.contains(&key) {
            tracing::debug!("Record {:?} already stored, skipping", record.name);
            return Ok(false);
        }

        let target_dir = self.category_dir(&record.category);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        let line = serde_json::to_string(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let file_path = target_dir.join(RECORDS_FILE);
        let mut file = OpenOptions::new().create(true).append(true).open(&file_path)?;
        writeln!(file, "{}", line)?;

        self.known_keys(&record.category)?.insert(key);
        tracing::info!("Saved {:?} to {}", record.name, file_path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::models::{CollectionStats, StopReason};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(name: &str, address: &str) -> MerchantRecord {
        MerchantRecord::new(name, Some(address), vec!["18685488479".to_string()], "鲜花店")
    }

    #[test]
    fn test_category_slug() {
        assert_eq!(category_slug("鲜花店"), "鲜花店");
        assert_eq!(category_slug(" 花店/绿植 市场 "), "花店_绿植_市场");
        assert_eq!(category_slug(".."), "uncategorized");
        assert_eq!(category_slug(""), "uncategorized");
    }

    #[test]
    fn test_dedup_within_and_across_runs() {
        let dir = TempDir::new().unwrap();
        {
            let mut storage = StorageManager::new(dir.path()).unwrap();
            assert!(storage.save_record(&record("老王花店", "五华区春城路100号")).unwrap());
            assert!(!storage.save_record(&record("老王花店", "五华区春城路100号")).unwrap());
            // Same name, different branch
            assert!(storage.save_record(&record("老王花店", "官渡区关上北路88号")).unwrap());
        }

        // A fresh manager sees what is already on disk
        let mut storage = StorageManager::new(dir.path()).unwrap();
        assert!(!storage.save_record(&record("老王花店", " 五华区春城路100号 ")).unwrap());
        let stored = storage.load_records("鲜花店").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "老王花店");
        assert!(storage.records_path("鲜花店").ends_with("鲜花店/merchants.jsonl"));
    }

    #[test]
    fn test_unreadable_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let path = storage.records_path("鲜花店");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let good = serde_json::to_string(&record("花语小铺", "")).unwrap();
        fs::write(&path, format!("{}\n{{not json\n\n", good)).unwrap();

        let stored = storage.load_records("鲜花店").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "花语小铺");
    }

    #[test]
    fn test_run_summary() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let now = Utc::now();
        let report = CollectionReport {
            category: "鲜花店".to_string(),
            records: vec![record("老王花店", "")],
            stop_reason: StopReason::EndOfList,
            stats: CollectionStats { collected: 1, cards_seen: 3, ..Default::default() },
            pages: 2,
            started_at: now,
            finished_at: now,
        };

        let path = storage.save_run_summary(&report).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["stop_reason"], "EndOfList");
        assert_eq!(json["records"], 1);
        assert_eq!(json["stats"]["cards_seen"], 3);
    }

    #[test]
    fn test_vec_sink_keeps_everything() {
        let mut sink: Vec<MerchantRecord> = Vec::new();
        assert!(sink.save_record(&record("老王花店", "")).unwrap());
        assert!(sink.save_record(&record("老王花店", "")).unwrap());
        assert_eq!(sink.len(), 2);
    }
}
