// src/lib.rs
//! Reads merchant listings out of a map app's accessibility tree and drives a
//! device through the result list to collect names, addresses and phone numbers.

pub mod classifiers;
pub mod collector;
pub mod config;
pub mod device;
pub mod extractors;
pub mod storage;
pub mod tree;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
