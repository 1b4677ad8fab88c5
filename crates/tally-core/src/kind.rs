//! The issue kinds that take part in a rollup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a tracker issue, as far as the rollup is concerned.
///
/// The tracker identifies kinds by per-project type ids; a
/// [`FieldMapping`](crate::mapping::FieldMapping) translates those ids into
/// this enum so the rollup can match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueKind {
    Task,
    Story,
    Subtask,
    Epic,
    Bug,
    Initiative,
}

impl IssueKind {
    /// Kinds every project must map before a rollup can start.
    pub const OPERATIONAL: [IssueKind; 5] = [
        IssueKind::Task,
        IssueKind::Story,
        IssueKind::Subtask,
        IssueKind::Epic,
        IssueKind::Bug,
    ];

    /// Returns the tracker's display name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Story => "Story",
            Self::Subtask => "Subtask",
            Self::Epic => "Epic",
            Self::Bug => "Bug",
            Self::Initiative => "Initiative",
        }
    }

    /// Maps a tracker issue-type name onto a kind.
    ///
    /// Matching is case-insensitive and accepts the hyphenated "Sub-task"
    /// spelling used by older project templates.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "task" => Some(Self::Task),
            "story" => Some(Self::Story),
            "subtask" | "sub-task" => Some(Self::Subtask),
            "epic" => Some(Self::Epic),
            "bug" => Some(Self::Bug),
            "initiative" => Some(Self::Initiative),
            _ => None,
        }
    }

    /// Returns `true` for kinds whose estimate is read straight off the issue.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Task | Self::Subtask | Self::Bug)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
