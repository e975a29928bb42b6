//! Core functionality of the resilience engine
//!
//! The pieces compose bottom-up: the monitor owns health state, the selector
//! reads it to pick a provider, the fallback policy decides whether and where
//! to retry, and the orchestrator drives all three per request.

pub mod fallback;
pub mod monitor;
pub mod orchestrator;
pub mod provider;
pub mod selection;
