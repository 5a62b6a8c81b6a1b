//! Object categories and device identifiers

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// A class of addressable console object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Category {
    /// Eos channel group
    Group,
    /// Eos preset
    Preset,
    /// X32 input channel
    #[cfg_attr(feature = "serde", serde(rename = "ch", alias = "channel"))]
    Channel,
    /// X32 mix bus
    Bus,
}

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 4] = [
        Category::Group,
        Category::Preset,
        Category::Channel,
        Category::Bus,
    ];

    /// The tag used in console addresses
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Group => "group",
            Category::Preset => "preset",
            Category::Channel => "ch",
            Category::Bus => "bus",
        }
    }

    /// Singular noun for messages
    pub fn noun(&self) -> &'static str {
        match self {
            Category::Group => "group",
            Category::Preset => "preset",
            Category::Channel => "channel",
            Category::Bus => "bus",
        }
    }

    /// Plural noun for log and status output
    pub fn plural(&self) -> &'static str {
        match self {
            Category::Group => "groups",
            Category::Preset => "presets",
            Category::Channel => "channels",
            Category::Bus => "buses",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "group" | "groups" => Ok(Category::Group),
            "preset" | "presets" => Ok(Category::Preset),
            "ch" | "channel" | "channels" => Ok(Category::Channel),
            "bus" | "buses" => Ok(Category::Bus),
            _ => Err(ProtocolError::UnknownCategory(s.to_string())),
        }
    }
}

/// Opaque identifier a console assigns to an object within a category
///
/// Kept as the console's own text (`"5"`, `"2.5"`, `"07"`) so it can be
/// written back into addresses exactly as it was received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integer value of the id, if it is a plain integer
    pub fn as_number(&self) -> Option<u32> {
        self.0.parse().ok()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// Case-normalize a human label for storage and lookup
pub fn normalize_label(label: &str) -> String {
    label.to_uppercase()
}
