//! Virtual X32 mixer
//!
//! Every channel and bus slot always exists; "removing" one clears its name.
//! An `/xremote` subscription lapses ten seconds after it was last renewed.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use show_protocol::x32::{BUS_COUNT, CHANNEL_COUNT};
use show_protocol::{Arg, Category, Family, Packet};
use tokio::time::Instant;
use tracing::debug;

use crate::VirtualConsole;

/// How long an `/xremote` subscription lasts without renewal
pub const SUBSCRIPTION_TTL: Duration = Duration::from_secs(10);

/// A simulated X32 / M32 mixer
#[derive(Debug)]
pub struct VirtualX32 {
    channels: Vec<String>,
    buses: Vec<String>,
    /// Channel → bus send switches, keyed by 1-based slot numbers
    sends: HashMap<(u32, u32), bool>,
    /// When `/xremote` was last received
    subscribed_at: Option<Instant>,
    /// Number of `/xremote` packets received
    renewals: usize,
    /// Pending push notifications
    pending_output: VecDeque<Packet>,
}

impl Default for VirtualX32 {
    fn default() -> Self {
        Self {
            channels: vec![String::new(); CHANNEL_COUNT as usize],
            buses: vec![String::new(); BUS_COUNT as usize],
            sends: HashMap::new(),
            subscribed_at: None,
            renewals: 0,
            pending_output: VecDeque::new(),
        }
    }
}

impl VirtualX32 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of a slot (1-based)
    pub fn name(&self, category: Category, slot: u32) -> Option<&str> {
        self.slots(category)?
            .get(slot.checked_sub(1)? as usize)
            .map(String::as_str)
    }

    /// Whether channel `channel` sends to bus `bus`
    pub fn send_enabled(&self, channel: u32, bus: u32) -> bool {
        self.sends.get(&(channel, bus)).copied().unwrap_or(false)
    }

    /// Number of `/xremote` packets received
    pub fn renewals(&self) -> usize {
        self.renewals
    }

    fn slots(&self, category: Category) -> Option<&Vec<String>> {
        match category {
            Category::Channel => Some(&self.channels),
            Category::Bus => Some(&self.buses),
            Category::Group | Category::Preset => None,
        }
    }

    fn slot_mut(&mut self, category: Category, slot: u32) -> Option<&mut String> {
        let slots = match category {
            Category::Channel => &mut self.channels,
            Category::Bus => &mut self.buses,
            Category::Group | Category::Preset => return None,
        };
        slots.get_mut(slot.checked_sub(1)? as usize)
    }

    fn set_name(&mut self, category: Category, slot: u32, name: &str) {
        let Some(current) = self.slot_mut(category, slot) else {
            debug!("Virtual X32 has no {} {}", category.noun(), slot);
            return;
        };
        *current = name.to_string();

        if self.is_subscribed() {
            self.pending_output.push_back(
                Packet::new(format!("/{}/{:02}/config/name", category, slot)).with_arg(name),
            );
        }
    }
}

impl VirtualConsole for VirtualX32 {
    fn family(&self) -> Family {
        Family::X32
    }

    fn respond(&mut self, request: &Packet) -> Vec<Packet> {
        let segments = request.segments();
        match segments.as_slice() {
            ["", "xremote"] => {
                self.subscribed_at = Some(Instant::now());
                self.renewals += 1;
                Vec::new()
            }
            ["", category, slot, "config", "name"] => {
                let (Ok(category), Ok(slot)) = (category.parse::<Category>(), slot.parse::<u32>())
                else {
                    return Vec::new();
                };
                match request.args.first() {
                    Some(Arg::Str(name)) => {
                        self.set_name(category, slot, name);
                        Vec::new()
                    }
                    Some(_) => Vec::new(),
                    None => match self.name(category, slot) {
                        Some(name) => vec![Packet::new(request.address.clone()).with_arg(name)],
                        None => Vec::new(),
                    },
                }
            }
            ["", "ch", channel, "mix", bus, "on"] => {
                let (Ok(channel), Ok(bus)) = (channel.parse::<u32>(), bus.parse::<u32>()) else {
                    return Vec::new();
                };
                match request.args.first().and_then(Arg::as_i64) {
                    Some(on) => {
                        debug!("Virtual X32 ch {} -> bus {}: {}", channel, bus, on);
                        self.sends.insert((channel, bus), on != 0);
                        Vec::new()
                    }
                    None => vec![Packet::new(request.address.clone())
                        .with_arg(i32::from(self.send_enabled(channel, bus)))],
                }
            }
            _ => Vec::new(),
        }
    }

    fn label(&mut self, category: Category, id: u32, label: &str) {
        self.set_name(category, id, label);
    }

    fn remove(&mut self, category: Category, id: u32) {
        self.set_name(category, id, "");
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed_at
            .is_some_and(|at| at.elapsed() < SUBSCRIPTION_TTL)
    }

    fn take_output(&mut self) -> Option<Packet> {
        self.pending_output.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_slot_replies_empty() {
        let mut x32 = VirtualX32::new();
        let replies = x32.respond(&Packet::new("/bus/16/config/name"));
        assert_eq!(replies, vec![Packet::new("/bus/16/config/name").with_arg("")]);
    }

    #[test]
    fn test_out_of_range_slot_is_silent() {
        let mut x32 = VirtualX32::new();
        assert!(x32.respond(&Packet::new("/ch/33/config/name")).is_empty());
        assert!(x32.respond(&Packet::new("/ch/00/config/name")).is_empty());
    }

    #[test]
    fn test_route_switch() {
        let mut x32 = VirtualX32::new();
        x32.respond(&Packet::new("/ch/03/mix/07/on").with_arg(1));
        assert!(x32.send_enabled(3, 7));
        let replies = x32.respond(&Packet::new("/ch/03/mix/07/on"));
        assert_eq!(replies[0].args, vec![Arg::Int(1)]);

        x32.respond(&Packet::new("/ch/03/mix/07/on").with_arg(0));
        assert!(!x32.send_enabled(3, 7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_lapses() {
        let mut x32 = VirtualX32::new();
        x32.respond(&Packet::new("/xremote"));
        x32.label(Category::Channel, 1, "Kick");
        assert_eq!(
            x32.take_output(),
            Some(Packet::new("/ch/01/config/name").with_arg("Kick"))
        );

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!x32.is_subscribed());
        x32.remove(Category::Channel, 1);
        assert!(x32.take_output().is_none());
        assert_eq!(x32.name(Category::Channel, 1), Some(""));
    }
}
