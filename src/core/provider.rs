//! Provider abstraction
//!
//! A provider is an opaque, interchangeable implementation of some capability.
//! The engine only needs a stable identity and the capabilities it advertises;
//! the operations run against it are supplied by the caller.

use std::collections::HashSet;
use std::fmt;

/// Stable identity key of a provider
pub type ProviderId = String;

/// Interchangeable implementation the engine can route to
pub trait Provider: Send + Sync {
    /// Stable identity key; metrics and circuit state are keyed by it
    fn id(&self) -> &str;

    /// Capabilities this provider advertises
    fn capabilities(&self) -> &[String] {
        &[]
    }

    /// Whether every required capability is advertised
    fn supports(&self, required: &HashSet<String>) -> bool {
        let advertised = self.capabilities();
        required
            .iter()
            .all(|capability| advertised.iter().any(|c| c == capability))
    }
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Minimal provider with a fixed id and capability list
///
/// Useful when the real provider instances live elsewhere and only need to be
/// represented by identity, and in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedProvider {
    id: String,
    capabilities: Vec<String>,
}

impl NamedProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: Vec::new(),
        }
    }

    /// Add advertised capabilities (builder pattern)
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }
}

impl Provider for NamedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }
}
