//! Factors: the verification paths offered for an attempt step.

use crate::Strategy;
use serde::{Deserialize, Serialize};

/// One verification path the server is willing to accept.
///
/// Compared by value; the server may offer several factors with the same
/// strategy (for example one `email_code` factor per enrolled address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Factor {
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    /// Redacted identifier safe to display, e.g. `j***@example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_identifier: Option<String>,
}

impl Factor {
    /// Shorthand for a factor carrying only a strategy.
    pub fn from_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            email_address_id: None,
            phone_number_id: None,
            safe_identifier: None,
        }
    }
}
