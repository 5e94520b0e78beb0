//! Observability module for correlating log lines of one submission

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID for tracking a submission across components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// First 20 characters of an address followed by "..." for status text
pub fn short_address(address: &str) -> String {
    if address.chars().count() <= 20 {
        address.to_string()
    } else {
        format!("{}...", address.chars().take(20).collect::<String>())
    }
}
