//! Data-quality signals.
//!
//! [`Correctness`] is what a single domain entity reports about itself;
//! [`Badness`] is the list-level state a record source mirrors to the grid.
//! A grid must be able to tell "still loading" from "present but stale" from
//! "the query failed", so these are values, never errors.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Correctness {
    Good,
    /// Data present but possibly stale.
    Suspect,
    Error,
    /// Data not fully received yet.
    Incomplete,
}

impl Correctness {
    pub fn is_good(&self) -> bool {
        matches!(self, Correctness::Good)
    }

    /// Returns true when the data can be shown, possibly with a stale marker.
    pub fn is_usable(&self) -> bool {
        matches!(self, Correctness::Good | Correctness::Suspect)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Correctness::Good => "Good",
            Correctness::Suspect => "Suspect",
            Correctness::Error => "Error",
            Correctness::Incomplete => "Incomplete",
        }
    }
}

impl fmt::Display for Correctness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List-level data quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Badness {
    Good,
    /// No data yet; the list is still being populated.
    Loading { detail: String },
    /// Data present but the feed behind it is stale or degraded.
    Suspect { detail: String },
    /// The query behind the list failed.
    Error { detail: String },
}

impl Badness {
    pub fn loading(detail: impl Into<String>) -> Self {
        Badness::Loading {
            detail: detail.into(),
        }
    }

    pub fn suspect(detail: impl Into<String>) -> Self {
        Badness::Suspect {
            detail: detail.into(),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Badness::Error {
            detail: detail.into(),
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, Badness::Good)
    }

    /// Returns true when rows may be shown (good or merely suspect).
    pub fn is_usable(&self) -> bool {
        matches!(self, Badness::Good | Badness::Suspect { .. })
    }

    pub fn correctness(&self) -> Correctness {
        match self {
            Badness::Good => Correctness::Good,
            Badness::Loading { .. } => Correctness::Incomplete,
            Badness::Suspect { .. } => Correctness::Suspect,
            Badness::Error { .. } => Correctness::Error,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Badness::Good => None,
            Badness::Loading { detail }
            | Badness::Suspect { detail }
            | Badness::Error { detail } => Some(detail.as_str()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Badness::Good => "Good",
            Badness::Loading { .. } => "Loading",
            Badness::Suspect { .. } => "Suspect",
            Badness::Error { .. } => "Error",
        }
    }
}

impl fmt::Display for Badness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) if !detail.is_empty() => write!(f, "{}: {}", self.as_str(), detail),
            _ => f.write_str(self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badness_distinguishes_loading_stale_and_failed() {
        let loading = Badness::loading("waiting for scan");
        let stale = Badness::suspect("feed delayed");
        let failed = Badness::error("query rejected");

        assert!(!loading.is_usable());
        assert!(stale.is_usable());
        assert!(!failed.is_usable());
        assert_eq!(loading.correctness(), Correctness::Incomplete);
        assert_eq!(stale.correctness(), Correctness::Suspect);
        assert_eq!(failed.correctness(), Correctness::Error);
        assert_eq!(failed.to_string(), "Error: query rejected");
        assert_eq!(Badness::Good.to_string(), "Good");
    }
}
