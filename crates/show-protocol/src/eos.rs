//! ETC Eos Address Grammar
//!
//! Eos offers no bulk dump, so labels are enumerated with a count request
//! followed by one request per index. Replies and pushed updates share the
//! `/eos/out/get/...` address space.
//!
//! # Offsets
//!
//! Addresses split on `/` (index 0 is the empty string):
//!
//! | Address | 4 | 5 | 6 | 7 |
//! |---|---|---|---|---|
//! | `/eos/out/get/<cat>/count` | category | `count` | | |
//! | `/eos/out/get/<cat>/<id>/list/<index>/<count>` | category | id | `list` | index |
//! | `/eos/out/get/<cat>/<id>` | category | id | | |
//! | `/eos/out/notify/<cat>/list/<index>/<count>` | category | `list` | index | |
//!
//! A `list` reply carries the label as argument 2 (after index and uid). A
//! `list` reply or bare `<cat>/<id>` address with no arguments means the
//! object was deleted. A notify packet carries a sequence number as argument 0
//! and the changed ids after it.

use crate::category::{Category, DeviceId};
use crate::command::{DeviceCommand, Inbound};
use crate::error::ProtocolError;
use crate::packet::{Arg, Packet};
use crate::{Enumeration, Family, Grammar, Keepalive, RouteSpec, RouteTarget};

/// Categories Eos exposes labels for
pub const CATEGORIES: &[Category] = &[Category::Group, Category::Preset];

const KIND_SEGMENT: usize = 3;
const CATEGORY_SEGMENT: usize = 4;
const ID_SEGMENT: usize = 5;
const LIST_SEGMENT: usize = 6;
const INDEX_SEGMENT: usize = 7;

const LABEL_ARG: usize = 2;
const FIRST_CHANGED_ARG: usize = 1;

/// Largest `a-b` range accepted in a change notification
const MAX_NOTIFY_RANGE: u32 = 1000;

/// Largest object count accepted in a count reply
pub const MAX_COUNT: u32 = 10_000;

/// Address grammar for Eos family consoles
#[derive(Debug, Clone, Default)]
pub struct EosGrammar {
    user: Option<u32>,
}

impl EosGrammar {
    /// Grammar sending commands to the console's current user
    pub fn new() -> Self {
        Self { user: None }
    }

    /// Grammar sending commands to a specific user's command line
    pub fn with_user(user: u32) -> Self {
        Self { user: Some(user) }
    }

    fn command_address(&self) -> String {
        match self.user {
            Some(user) => format!("/eos/user/{}/cmd", user),
            None => "/eos/cmd".to_string(),
        }
    }

    fn category_at(segments: &[&str]) -> Option<Category> {
        segments
            .get(CATEGORY_SEGMENT)
            .and_then(|s| s.parse::<Category>().ok())
            .filter(|c| CATEGORIES.contains(c))
    }

    fn classify_get(&self, packet: &Packet, segments: &[&str]) -> Result<Inbound, ProtocolError> {
        let Some(category) = Self::category_at(segments) else {
            return Ok(Inbound::Ignored);
        };

        let id = match segments.get(ID_SEGMENT) {
            Some(&"count") if segments.len() == ID_SEGMENT + 1 => {
                let count = packet
                    .args
                    .first()
                    .and_then(Arg::as_i64)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        ProtocolError::malformed(&packet.address, "count reply without a count")
                    })?;
                if count > MAX_COUNT {
                    return Err(ProtocolError::malformed(
                        &packet.address,
                        format!("count {} exceeds {}", count, MAX_COUNT),
                    ));
                }
                return Ok(Inbound::Count { category, count });
            }
            Some(id) if !id.is_empty() => DeviceId::new(*id),
            _ => {
                return Err(ProtocolError::malformed(
                    &packet.address,
                    "missing object id",
                ))
            }
        };

        match segments.get(LIST_SEGMENT) {
            None if !packet.has_args() => Ok(Inbound::Deleted { category, id }),
            Some(&"list") if !packet.has_args() => Ok(Inbound::Deleted { category, id }),
            Some(&"list") => {
                let label = packet
                    .args
                    .get(LABEL_ARG)
                    .and_then(Arg::as_str)
                    .ok_or_else(|| {
                        ProtocolError::malformed(&packet.address, "list reply without a label")
                    })?;
                let index = segments
                    .get(INDEX_SEGMENT)
                    .and_then(|s| s.parse::<u32>().ok());
                Ok(Inbound::Label {
                    category,
                    id,
                    label: label.to_string(),
                    index,
                })
            }
            // channels/, effects/ and other detail lists
            _ => Ok(Inbound::Ignored),
        }
    }

    fn classify_notify(&self, packet: &Packet, segments: &[&str]) -> Result<Inbound, ProtocolError> {
        let Some(category) = Self::category_at(segments) else {
            return Ok(Inbound::Ignored);
        };

        let mut ids = Vec::new();
        for arg in packet.args.iter().skip(FIRST_CHANGED_ARG) {
            expand_ids(&packet.address, arg, &mut ids)?;
        }

        Ok(Inbound::Changed { category, ids })
    }
}

/// Expand one notify argument into ids; strings may hold an `a-b` range
fn expand_ids(address: &str, arg: &Arg, ids: &mut Vec<DeviceId>) -> Result<(), ProtocolError> {
    if let Some((start, end)) = arg.as_str().and_then(|s| s.trim().split_once('-')) {
        let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>()) else {
            return Err(ProtocolError::malformed(address, "unreadable id range"));
        };
        if end < start || end - start > MAX_NOTIFY_RANGE {
            return Err(ProtocolError::malformed(
                address,
                format!("id range {}-{} out of bounds", start, end),
            ));
        }
        ids.extend((start..=end).map(DeviceId::from));
        return Ok(());
    }

    match arg.to_device_id() {
        Some(id) => {
            ids.push(id);
            Ok(())
        }
        None => Err(ProtocolError::malformed(
            address,
            format!("unreadable changed id {}", arg),
        )),
    }
}

impl Grammar for EosGrammar {
    fn family(&self) -> Family {
        Family::Eos
    }

    fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    fn routes(&self) -> Vec<RouteSpec> {
        let mut routes = Vec::new();
        for category in CATEGORIES {
            routes.push(RouteSpec::new(
                format!("/eos/out/get/{}/count", category),
                RouteTarget::Discovery,
            ));
            routes.push(RouteSpec::new(
                format!("/eos/out/get/{}/*", category),
                RouteTarget::Notification,
            ));
        }
        routes.push(RouteSpec::new("/eos/out/notify/*", RouteTarget::Notification));
        routes
    }

    fn enumeration(&self, _category: Category) -> Enumeration {
        Enumeration::Counted
    }

    fn count_request(&self, category: Category) -> Option<Packet> {
        Some(Packet::new(format!("/eos/get/{}/count", category)))
    }

    fn index_request(&self, category: Category, index: u32) -> Packet {
        Packet::new(format!("/eos/get/{}/index/{}", category, index))
    }

    fn fetch_request(&self, category: Category, id: &DeviceId) -> Packet {
        Packet::new(format!("/eos/get/{}/{}", category, id))
    }

    fn subscribe(&self) -> Option<Packet> {
        Some(Packet::new("/eos/subscribe").with_arg(1))
    }

    fn keepalive(&self) -> Option<Keepalive> {
        None
    }

    fn classify(&self, packet: &Packet) -> Result<Inbound, ProtocolError> {
        let segments = packet.segments();
        if segments.len() <= CATEGORY_SEGMENT
            || !segments[0].is_empty()
            || segments[1] != "eos"
            || segments[2] != "out"
        {
            return Err(ProtocolError::malformed(
                &packet.address,
                "expected /eos/out/<kind>/<category>/...",
            ));
        }

        match segments[KIND_SEGMENT] {
            "get" => self.classify_get(packet, &segments),
            "notify" => self.classify_notify(packet, &segments),
            _ => Ok(Inbound::Ignored),
        }
    }

    fn encode_command(&self, command: &DeviceCommand) -> Result<Packet, ProtocolError> {
        match command {
            DeviceCommand::ApplyPreset { group, preset } => Ok(Packet::new(self.command_address())
                .with_arg(format!("Group {} Preset {}#", group, preset))),
            DeviceCommand::CommandLine(line) => {
                Ok(Packet::new(self.command_address()).with_arg(line.as_str()))
            }
            DeviceCommand::Route { .. } => Err(ProtocolError::UnsupportedCommand {
                family: Family::Eos,
                command: command.name(),
            }),
        }
    }
}
