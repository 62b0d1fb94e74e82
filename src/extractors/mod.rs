// src/extractors/mod.rs
pub mod card;
pub mod detail;
pub mod page_state;
pub mod phone;

// Re-export key extraction types for convenience
pub use card::{CardLocator, MerchantCard};
pub use detail::{DetailInfo, DetailLocator};
pub use page_state::{ListLayout, PageAnalysis, PageFeatures, PageState, PageStateClassifier};
pub use phone::read_phone_numbers;
