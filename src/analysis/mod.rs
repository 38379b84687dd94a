//! Analysis modules.
//!
//! This module classifies query rows into phase buckets.

pub mod aggregator;

pub use aggregator::*;
