//! Command translator
//!
//! Turns label-addressed commands into id-addressed ones using the label
//! cache, then encodes and sends them. A command is only sent once every label
//! it names has resolved.

use std::sync::Arc;

use show_protocol::{Category, DeviceCommand, DeviceId, Grammar, LabelCommand};
use tracing::info;

use crate::cache::LabelCache;
use crate::error::SyncError;
use crate::transport::{send_logged, Transport};

/// Resolves and sends commands for one console
pub struct Translator {
    grammar: Arc<dyn Grammar>,
    cache: Arc<LabelCache>,
    transport: Arc<dyn Transport>,
}

impl Translator {
    pub fn new(
        grammar: Arc<dyn Grammar>,
        cache: Arc<LabelCache>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            grammar,
            cache,
            transport,
        }
    }

    /// Device id currently bound to `label`
    pub fn resolve(&self, category: Category, label: &str) -> Result<DeviceId, SyncError> {
        self.cache
            .lookup(category, label)
            .ok_or_else(|| SyncError::Resolution {
                category,
                label: label.to_string(),
            })
    }

    /// Resolve every label in `command`, failing on the first one missing
    pub fn resolve_command(&self, command: &LabelCommand) -> Result<DeviceCommand, SyncError> {
        match command {
            LabelCommand::ApplyPreset { group, preset } => Ok(DeviceCommand::ApplyPreset {
                group: self.resolve(Category::Group, group)?,
                preset: self.resolve(Category::Preset, preset)?,
            }),
            LabelCommand::Route {
                source,
                destination,
                enabled,
            } => Ok(DeviceCommand::Route {
                channel: self.resolve(Category::Channel, source)?,
                bus: self.resolve(Category::Bus, destination)?,
                enabled: *enabled,
            }),
        }
    }

    /// Encode and send a command that is already addressed by id
    ///
    /// Encoding errors (a command this family cannot express) are returned;
    /// send failures are only logged.
    pub fn execute(&self, command: &DeviceCommand) -> Result<(), SyncError> {
        let packet = self.grammar.encode_command(command)?;
        info!("Sending {}", command);
        send_logged(self.transport.as_ref(), &packet);
        Ok(())
    }

    /// Resolve a label command and send it
    ///
    /// Returns the command that was sent. Nothing is sent on error.
    pub fn send(&self, command: &LabelCommand) -> Result<DeviceCommand, SyncError> {
        let resolved = self.resolve_command(command)?;
        self.execute(&resolved)?;
        Ok(resolved)
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("family", &self.grammar.family())
            .finish()
    }
}
