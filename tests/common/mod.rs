//! Common test utilities for provider-resilience

pub mod fixtures;

pub use fixtures::{ScriptedOperation, balancer_with, engine_config};
