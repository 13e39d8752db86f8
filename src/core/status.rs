//! Production pipeline statuses and their display metadata
//!
//! The pipeline order is significant for display only. Any status may be
//! assigned from any other status; nothing here enforces forward-only moves.

use crate::core::error::DyehouseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Production status of a single order item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Received,
    Dyeing,
    DyeingComplete,
    Conning,
    ConningComplete,
    Packing,
    Packed,
}

const PIPELINE: [Status; 7] = [
    Status::Received,
    Status::Dyeing,
    Status::DyeingComplete,
    Status::Conning,
    Status::ConningComplete,
    Status::Packing,
    Status::Packed,
];

impl Status {
    /// All statuses in pipeline order
    pub fn all() -> &'static [Status] {
        &PIPELINE
    }

    /// The status every new item starts in
    pub fn first() -> Status {
        PIPELINE[0]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Received => "received",
            Status::Dyeing => "dyeing",
            Status::DyeingComplete => "dyeing_complete",
            Status::Conning => "conning",
            Status::ConningComplete => "conning_complete",
            Status::Packing => "packing",
            Status::Packed => "packed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Received => "Received",
            Status::Dyeing => "Dyeing",
            Status::DyeingComplete => "Dyeing Complete",
            Status::Conning => "Conning",
            Status::ConningComplete => "Conning Complete",
            Status::Packing => "Packing",
            Status::Packed => "Packed",
        }
    }

    pub fn color(&self) -> ColorTag {
        match self {
            Status::Received => ColorTag::Blue,
            Status::Dyeing => ColorTag::Purple,
            Status::DyeingComplete => ColorTag::Violet,
            Status::Conning => ColorTag::Amber,
            Status::ConningComplete => ColorTag::Yellow,
            Status::Packing => ColorTag::Orange,
            Status::Packed => ColorTag::Green,
        }
    }

    /// Position in the pipeline, starting at 0
    pub fn position(&self) -> usize {
        PIPELINE.iter().position(|s| s == self).unwrap_or_default()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DyehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PIPELINE
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DyehouseError::UnknownStatus(s.to_string()))
    }
}

/// Badge color for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Purple,
    Violet,
    Amber,
    Yellow,
    Orange,
    Green,
    Red,
    Gray,
}

impl ColorTag {
    pub fn name(&self) -> &'static str {
        match self {
            ColorTag::Blue => "blue",
            ColorTag::Purple => "purple",
            ColorTag::Violet => "violet",
            ColorTag::Amber => "amber",
            ColorTag::Yellow => "yellow",
            ColorTag::Orange => "orange",
            ColorTag::Green => "green",
            ColorTag::Red => "red",
            ColorTag::Gray => "gray",
        }
    }

    /// Badge classes for the dashboard stylesheet
    pub fn css_class(&self) -> String {
        let c = self.name();
        format!("bg-{c}-100 text-{c}-800 border-{c}-200")
    }
}

/// Label for a raw status value
///
/// Unknown values are echoed back so the dashboard can still render them; an
/// empty value becomes `"Unknown"`.
pub fn label_of(raw: &str) -> &str {
    match raw.parse::<Status>() {
        Ok(status) => status.label(),
        Err(_) if raw.trim().is_empty() => "Unknown",
        Err(_) => raw,
    }
}

/// Color for a raw status value, gray when unknown
pub fn color_of(raw: &str) -> ColorTag {
    raw.parse::<Status>()
        .map(|s| s.color())
        .unwrap_or(ColorTag::Gray)
}

/// The status that is furthest along the pipeline
pub fn most_advanced<I>(statuses: I) -> Option<Status>
where
    I: IntoIterator<Item = Status>,
{
    statuses.into_iter().max_by_key(|s| s.position())
}
