//! Utility modules
//!
//! - **error**: Provider failures, their classification, and engine errors
//! - **logging**: Tracing subscriber setup for binaries

pub mod error;
pub mod logging;
