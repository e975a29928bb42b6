//! Error handling for the resilience engine
//!
//! - `types` - Provider failures, their classification, and engine errors

pub mod types;


pub use types::{EngineError, ErrorKind, ProviderError, Result};
