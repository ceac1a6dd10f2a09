//! Reactions to routing misses and handler faults.

use serde::{Deserialize, Serialize};

/// What the server does when a request is unhandled or its handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the `send` that triggered the request.
    #[default]
    Error,
    /// Log a warning and leave the request unanswered.
    Log,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Error => "error",
            FailurePolicy::Log => "log",
        }
    }
}
