// src/collector/mod.rs
pub mod models;
pub mod orchestrator;

pub use models::{CardOutcome, CollectionReport, CollectionStats, MerchantRecord, StopReason, Uncollectible};
pub use orchestrator::{Collector, CollectorState};
