//! Provider selection
//!
//! - `criteria` - Selection criteria and algorithm tags
//! - `strategy_impl` - One function per selection algorithm
//! - `selector` - Filtering and dispatch to the chosen algorithm

pub mod criteria;
pub mod selector;
pub mod strategy_impl;

#[cfg(test)]
mod tests;

pub use criteria::{SelectionAlgorithm, SelectionCriteria};
pub use selector::{ScoredCandidate, Selector};
pub use strategy_impl::CandidateStats;
