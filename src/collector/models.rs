// src/collector/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One collected merchant, as handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantRecord {
    pub name: String,
    /// Empty when the detail page showed no recognizable address.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phones: Vec<String>,
    /// Screenshot paths captured on the detail page.
    #[serde(default)]
    pub image_refs: Vec<String>,
    pub category: String,
    pub collected_at: DateTime<Utc>,
}

impl MerchantRecord {
    pub fn new(name: &str, address: Option<&str>, phones: Vec<String>, category: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.unwrap_or_default().to_string(),
            phones,
            image_refs: Vec::new(),
            category: category.to_string(),
            collected_at: Utc::now(),
        }
    }

    /// Identity used for de-duplication in storage.
    pub fn dedup_key(&self) -> (String, String) {
        (self.name.trim().to_string(), self.address.trim().to_string())
    }
}

/// Why a merchant with a phone affordance still yields no number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Uncollectible {
    /// The phone action opened the system dialer instead of a number dialog.
    DialerHandoff,
    /// The app asked us to supply a number: the merchant lists none.
    NoListedPhone,
}

/// Result of visiting one card. Only `Collected` produces a record; the rest
/// are expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CardOutcome {
    Collected(MerchantRecord),
    /// The tap did not land on a merchant detail page (ad, unrelated screen).
    NavigationMismatch,
    NoPhoneAffordance,
    Uncollectible(Uncollectible),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    EndOfList,
    QuotaReached,
    Stagnation,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::EndOfList => "end of list",
            StopReason::QuotaReached => "quota reached",
            StopReason::Stagnation => "no new merchants on consecutive pages",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub cards_seen: usize,
    pub collected: usize,
    pub already_stored: usize,
    pub navigation_mismatches: usize,
    pub no_phone_affordance: usize,
    pub dialer_handoffs: usize,
    pub no_listed_phone: usize,
    pub name_mismatches: usize,
}

impl CollectionStats {
    pub fn record(&mut self, outcome: &CardOutcome) {
        self.cards_seen += 1;
        match outcome {
            CardOutcome::Collected(_) => self.collected += 1,
            CardOutcome::NavigationMismatch => self.navigation_mismatches += 1,
            CardOutcome::NoPhoneAffordance => self.no_phone_affordance += 1,
            CardOutcome::Uncollectible(Uncollectible::DialerHandoff) => self.dialer_handoffs += 1,
            CardOutcome::Uncollectible(Uncollectible::NoListedPhone) => self.no_listed_phone += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub category: String,
    pub records: Vec<MerchantRecord>,
    pub stop_reason: StopReason,
    pub stats: CollectionStats,
    pub pages: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
