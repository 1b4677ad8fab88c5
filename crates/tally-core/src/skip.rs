//! Records of units a run could not process.
//!
//! Per-unit failures never abort a run; they end up here and are reported
//! next to the partial results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a unit was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The Epic, Initiative or Release itself could not be fetched.
    Access,
    /// Searching for an Epic's child issues failed.
    ChildFetch,
    /// An Epic lacks the dates needed for calendar distribution.
    DateResolutionGap,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::ChildFetch => "child_fetch",
            Self::DateResolutionGap => "date_resolution_gap",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One skipped unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skip {
    pub key: String,
    pub reason: SkipReason,
    pub detail: String,
}

impl Skip {
    pub fn new(key: impl Into<String>, reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.key, self.reason, self.detail)
    }
}
