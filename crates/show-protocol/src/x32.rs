//! Behringer X32 Address Grammar
//!
//! The X32 has a fixed number of channel and bus slots, so discovery probes
//! every slot's name directly instead of counting first. Replies come back
//! on the address that was asked for, and the same addresses are pushed
//! while an `/xremote` subscription is live. The subscription lapses after
//! ten seconds unless it is renewed.
//!
//! # Offsets
//!
//! `/<cat>/<NN>/config/name` split on `/`: 1 = category, 2 = id,
//! 3 = `config`, 4 = `name`. Argument 0 is the label.

use std::time::Duration;

use crate::category::{Category, DeviceId};
use crate::command::{DeviceCommand, Inbound};
use crate::error::ProtocolError;
use crate::packet::{Arg, Packet};
use crate::{Enumeration, Family, Grammar, Keepalive, RouteSpec, RouteTarget};

/// Categories the X32 exposes labels for
pub const CATEGORIES: &[Category] = &[Category::Channel, Category::Bus];

/// Number of input channels
pub const CHANNEL_COUNT: u32 = 32;

/// Number of mix buses
pub const BUS_COUNT: u32 = 16;

/// How often `/xremote` is renewed
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(9);

const CATEGORY_SEGMENT: usize = 1;
const ID_SEGMENT: usize = 2;
const NODE_SEGMENT: usize = 3;
const FIELD_SEGMENT: usize = 4;

const LABEL_ARG: usize = 0;

/// Format an id the way the X32 writes it: two digits, zero padded
pub fn pad_id(id: &DeviceId) -> String {
    match id.as_number() {
        Some(n) => format!("{:02}", n),
        None => id.as_str().to_string(),
    }
}

/// Address grammar for X32 / M32 mixers
#[derive(Debug, Clone, Default)]
pub struct X32Grammar;

impl X32Grammar {
    pub fn new() -> Self {
        Self
    }

    fn slot_count(category: Category) -> u32 {
        match category {
            Category::Channel => CHANNEL_COUNT,
            Category::Bus => BUS_COUNT,
            Category::Group | Category::Preset => 0,
        }
    }
}

impl Grammar for X32Grammar {
    fn family(&self) -> Family {
        Family::X32
    }

    fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    fn routes(&self) -> Vec<RouteSpec> {
        CATEGORIES
            .iter()
            .map(|category| RouteSpec::new(format!("/{}/*", category), RouteTarget::Notification))
            .collect()
    }

    fn enumeration(&self, category: Category) -> Enumeration {
        Enumeration::Fixed(Self::slot_count(category))
    }

    fn count_request(&self, _category: Category) -> Option<Packet> {
        None
    }

    fn index_request(&self, category: Category, index: u32) -> Packet {
        Packet::new(format!("/{}/{:02}/config/name", category, index + 1))
    }

    fn fetch_request(&self, category: Category, id: &DeviceId) -> Packet {
        Packet::new(format!("/{}/{}/config/name", category, pad_id(id)))
    }

    fn subscribe(&self) -> Option<Packet> {
        Some(Packet::new("/xremote"))
    }

    fn keepalive(&self) -> Option<Keepalive> {
        Some(Keepalive {
            packet: Packet::new("/xremote"),
            period: KEEPALIVE_PERIOD,
        })
    }

    fn classify(&self, packet: &Packet) -> Result<Inbound, ProtocolError> {
        let segments = packet.segments();
        if segments.len() <= ID_SEGMENT || !segments[0].is_empty() {
            return Err(ProtocolError::malformed(
                &packet.address,
                "expected /<category>/<NN>/...",
            ));
        }

        let category = match segments[CATEGORY_SEGMENT].parse::<Category>() {
            Ok(category) if CATEGORIES.contains(&category) => category,
            _ => return Ok(Inbound::Ignored),
        };

        let number = segments[ID_SEGMENT]
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=Self::slot_count(category)).contains(n))
            .ok_or_else(|| ProtocolError::malformed(&packet.address, "slot out of range"))?;
        let id = DeviceId::new(format!("{:02}", number));

        let is_name = segments.len() == FIELD_SEGMENT + 1
            && segments[NODE_SEGMENT] == "config"
            && segments[FIELD_SEGMENT] == "name";
        if !is_name {
            // faders, mutes, sends and the rest of the mixer state
            return Ok(Inbound::Ignored);
        }

        match packet.args.get(LABEL_ARG) {
            None => Ok(Inbound::Deleted { category, id }),
            Some(Arg::Str(label)) => Ok(Inbound::Label {
                category,
                id,
                label: label.clone(),
                index: Some(number - 1),
            }),
            Some(other) => Err(ProtocolError::malformed(
                &packet.address,
                format!("name is not a string: {}", other),
            )),
        }
    }

    fn encode_command(&self, command: &DeviceCommand) -> Result<Packet, ProtocolError> {
        match command {
            DeviceCommand::Route {
                channel,
                bus,
                enabled,
            } => Ok(Packet::new(format!(
                "/ch/{}/mix/{}/on",
                pad_id(channel),
                pad_id(bus)
            ))
            .with_arg(i32::from(*enabled))),
            DeviceCommand::ApplyPreset { .. } | DeviceCommand::CommandLine(_) => {
                Err(ProtocolError::UnsupportedCommand {
                    family: Family::X32,
                    command: command.name(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_reply() {
        let packet = Packet::new("/ch/05/config/name").with_arg("Vocal");
        assert_eq!(
            X32Grammar::new().classify(&packet).unwrap(),
            Inbound::Label {
                category: Category::Channel,
                id: DeviceId::from("05"),
                label: "Vocal".into(),
                index: Some(4),
            }
        );
    }

    #[test]
    fn test_name_without_args_is_delete() {
        let packet = Packet::new("/bus/16/config/name");
        assert_eq!(
            X32Grammar::new().classify(&packet).unwrap(),
            Inbound::Deleted {
                category: Category::Bus,
                id: DeviceId::from("16"),
            }
        );
    }

    #[test]
    fn test_other_parameters_ignored() {
        let grammar = X32Grammar::new();
        let fader = Packet::new("/ch/01/mix/fader").with_arg(0.75f32);
        assert_eq!(grammar.classify(&fader).unwrap(), Inbound::Ignored);
        let color = Packet::new("/bus/02/config/color").with_arg(3);
        assert_eq!(grammar.classify(&color).unwrap(), Inbound::Ignored);
        let aux = Packet::new("/auxin/01/config/name").with_arg("Laptop");
        assert_eq!(grammar.classify(&aux).unwrap(), Inbound::Ignored);
    }

    #[test]
    fn test_bad_slots_are_malformed() {
        let grammar = X32Grammar::new();
        for address in ["/ch/33/config/name", "/bus/00/config/name", "/ch/xx/config/name", "/ch"] {
            assert!(
                grammar.classify(&Packet::new(address)).is_err(),
                "{}",
                address
            );
        }
    }

    #[test]
    fn test_non_string_name_is_malformed() {
        let packet = Packet::new("/ch/01/config/name").with_arg(1);
        assert!(X32Grammar::new().classify(&packet).is_err());
    }

    #[test]
    fn test_discovery_requests() {
        let grammar = X32Grammar::new();
        assert_eq!(grammar.enumeration(Category::Channel), Enumeration::Fixed(32));
        assert_eq!(grammar.enumeration(Category::Bus), Enumeration::Fixed(16));
        assert!(grammar.count_request(Category::Channel).is_none());
        assert_eq!(
            grammar.index_request(Category::Channel, 0).address,
            "/ch/01/config/name"
        );
        assert_eq!(
            grammar.index_request(Category::Bus, 15).address,
            "/bus/16/config/name"
        );
        assert_eq!(
            grammar
                .fetch_request(Category::Bus, &DeviceId::from("7"))
                .address,
            "/bus/07/config/name"
        );
    }

    #[test]
    fn test_keepalive() {
        let keepalive = X32Grammar::new().keepalive().unwrap();
        assert_eq!(keepalive.packet, Packet::new("/xremote"));
        assert_eq!(keepalive.period, Duration::from_secs(9));
    }

    #[test]
    fn test_route_command_pads_ids() {
        let grammar = X32Grammar::new();
        let on = DeviceCommand::Route {
            channel: "3".into(),
            bus: "7".into(),
            enabled: true,
        };
        let packet = grammar.encode_command(&on).unwrap();
        assert_eq!(packet.address, "/ch/03/mix/07/on");
        assert_eq!(packet.args, vec![Arg::Int(1)]);

        let off = DeviceCommand::Route {
            channel: "12".into(),
            bus: "01".into(),
            enabled: false,
        };
        let packet = grammar.encode_command(&off).unwrap();
        assert_eq!(packet.address, "/ch/12/mix/01/on");
        assert_eq!(packet.args, vec![Arg::Int(0)]);
    }

    #[test]
    fn test_apply_preset_unsupported() {
        let cmd = DeviceCommand::ApplyPreset {
            group: "1".into(),
            preset: "1".into(),
        };
        assert!(X32Grammar::new().encode_command(&cmd).is_err());
    }
}
