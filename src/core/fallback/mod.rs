//! Retry and fallback decisions
//!
//! - `options` - Backoff, retry classification and fallback strategy settings
//! - `policy` - `FallbackPolicy`: should-retry, next-delay and candidate shrinking

pub mod options;
pub mod policy;


pub use options::{FallbackOptions, FallbackStrategy};
pub use policy::{FallbackContext, FallbackPlan, FallbackPolicy};
