//! Normalized inbound events and outbound commands
//!
//! Inbound packets from either family classify into an [`Inbound`] event;
//! outbound intent is expressed as a [`LabelCommand`] (human labels) which
//! resolves into a [`DeviceCommand`] (device ids) before encoding.

use std::fmt;

use crate::category::{Category, DeviceId};

/// What an inbound packet means for the label mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The console holds `count` objects in `category`
    Count {
        /// Category that was counted
        category: Category,
        /// Number of objects
        count: u32,
    },

    /// Object `id` exists and carries `label` (creation, rename, or index reply)
    ///
    /// An empty label means the object exists but cannot be addressed by name.
    Label {
        /// Category of the object
        category: Category,
        /// Device id of the object
        id: DeviceId,
        /// Display label as sent by the console
        label: String,
        /// Enumeration index this reply answers, when the address carries one
        index: Option<u32>,
    },

    /// Object `id` no longer exists
    Deleted {
        /// Category of the object
        category: Category,
        /// Device id of the removed object
        id: DeviceId,
    },

    /// Something about these objects changed; re-fetch them
    Changed {
        /// Category of the objects
        category: Category,
        /// Ids that changed
        ids: Vec<DeviceId>,
    },

    /// Well formed, but nothing the label mirror tracks
    Ignored,
}

/// A command addressed by human labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelCommand {
    /// Apply a preset to a group (Eos)
    ApplyPreset {
        /// Group label
        group: String,
        /// Preset label
        preset: String,
    },
    /// Switch a channel's send to a bus on or off (X32)
    Route {
        /// Source channel label
        source: String,
        /// Destination bus label
        destination: String,
        /// Whether the send is switched on
        enabled: bool,
    },
}

impl fmt::Display for LabelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelCommand::ApplyPreset { group, preset } => {
                write!(f, "group '{}' preset '{}'", group, preset)
            }
            LabelCommand::Route {
                source,
                destination,
                enabled,
            } => write!(
                f,
                "'{}' -> '{}' {}",
                source,
                destination,
                if *enabled { "on" } else { "off" }
            ),
        }
    }
}

/// A command addressed by device ids, ready to encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Apply preset `preset` to group `group`
    ApplyPreset {
        /// Group id
        group: DeviceId,
        /// Preset id
        preset: DeviceId,
    },
    /// Switch channel `channel`'s send to bus `bus`
    Route {
        /// Channel id
        channel: DeviceId,
        /// Bus id
        bus: DeviceId,
        /// On or off
        enabled: bool,
    },
    /// Raw console command line
    CommandLine(String),
}

impl DeviceCommand {
    /// Short name used in errors
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCommand::ApplyPreset { .. } => "apply-preset",
            DeviceCommand::Route { .. } => "channel routing",
            DeviceCommand::CommandLine(_) => "command lines",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::ApplyPreset { group, preset } => {
                write!(f, "group {} preset {}", group, preset)
            }
            DeviceCommand::Route {
                channel,
                bus,
                enabled,
            } => write!(
                f,
                "channel {} -> bus {} {}",
                channel,
                bus,
                if *enabled { "on" } else { "off" }
            ),
            DeviceCommand::CommandLine(line) => write!(f, "command line {:?}", line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_command_display() {
        let cmd = LabelCommand::ApplyPreset {
            group: "Front".into(),
            preset: "Warm".into(),
        };
        assert_eq!(cmd.to_string(), "group 'Front' preset 'Warm'");
    }

    #[test]
    fn test_device_command_display() {
        let cmd = DeviceCommand::Route {
            channel: "03".into(),
            bus: "07".into(),
            enabled: false,
        };
        assert_eq!(cmd.to_string(), "channel 03 -> bus 07 off");
    }
}
