// src/classifiers/mod.rs
//! Text-level heuristics: keyword sets, markup helpers and predicates deciding
//! what a piece of on-screen text is (ad, address, tag, merchant name).

pub mod keywords;
pub mod markup;
pub mod text;

pub use text::{
    is_address_text, is_advertisement, is_excluded_text, is_tag_text, names_match, NameCandidate,
};
