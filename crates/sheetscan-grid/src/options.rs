use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum vertical distance, in pixels, between a fragment and its row's
/// reference y for the fragment to join that row.
pub const ROW_THRESHOLD: f64 = 20.0;

/// How a row's reference y is chosen while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowAnchor {
    /// Reference is the y of the row's first member and never moves.
    #[default]
    FirstMember,
    /// Reference is the mean y of every member accepted so far.
    RunningMean,
}

impl FromStr for RowAnchor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" | "first-member" => Ok(Self::FirstMember),
            "mean" | "running-mean" => Ok(Self::RunningMean),
            other => Err(format!(
                "invalid row anchor '{other}', expected 'first' or 'mean'"
            )),
        }
    }
}

/// Cell order inside a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowOrder {
    /// Keep the order of the global `(y, x)` sort.
    #[default]
    Scan,
    /// Re-sort each row by anchor x.
    LeftToRight,
}

impl FromStr for RowOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(Self::Scan),
            "left-to-right" | "ltr" => Ok(Self::LeftToRight),
            other => Err(format!(
                "invalid row order '{other}', expected 'scan' or 'left-to-right'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    pub threshold: f64,
    pub anchor: RowAnchor,
    pub order: RowOrder,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            threshold: ROW_THRESHOLD,
            anchor: RowAnchor::FirstMember,
            order: RowOrder::Scan,
        }
    }
}
