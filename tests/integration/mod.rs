//! Integration tests for provider-resilience
//!
//! These tests exercise the public API end to end without reaching into
//! crate internals.

pub mod config_tests;
pub mod monitor_tests;
pub mod orchestrator_tests;
