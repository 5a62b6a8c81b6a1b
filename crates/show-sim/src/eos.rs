//! Virtual Eos console
//!
//! Holds groups and presets keyed by number. Index `i` of a category is the
//! `i`-th object in number order, the way Eos enumerates its show file.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use show_protocol::{Arg, Category, Family, Packet};
use tracing::debug;

use crate::VirtualConsole;

/// A simulated Eos family console
#[derive(Debug, Default)]
pub struct VirtualEos {
    /// Objects by category, then by number
    objects: HashMap<Category, BTreeMap<u32, String>>,
    /// Whether `/eos/subscribe 1` has been received
    subscribed: bool,
    /// Sequence number carried by change notifications
    sequence: i32,
    /// Pending push notifications
    pending_output: VecDeque<Packet>,
    /// Command lines received, oldest first
    commands: Vec<String>,
    /// Index requests to ignore once, per category
    drop_once: HashMap<Category, BTreeSet<u32>>,
}

impl VirtualEos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of every object in `category`, by number
    pub fn labels(&self, category: Category) -> BTreeMap<u32, String> {
        self.objects.get(&category).cloned().unwrap_or_default()
    }

    /// Command lines received so far
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Ignore the next request for each of these indices, as if the reply was lost
    pub fn drop_index_replies(&mut self, category: Category, indices: impl IntoIterator<Item = u32>) {
        self.drop_once.entry(category).or_default().extend(indices);
    }

    fn tracked(category: &str) -> Option<Category> {
        category
            .parse::<Category>()
            .ok()
            .filter(|c| matches!(c, Category::Group | Category::Preset))
    }

    fn list_reply(&self, category: Category, number: u32) -> Packet {
        let objects = self.objects.get(&category);
        let entry = objects.and_then(|o| {
            o.iter()
                .enumerate()
                .find(|(_, (n, _))| **n == number)
                .map(|(index, (_, label))| (index, label))
        });

        match (entry, objects) {
            (Some((index, label)), Some(objects)) => Packet::new(format!(
                "/eos/out/get/{}/{}/list/{}/{}",
                category,
                number,
                index,
                objects.len()
            ))
            .with_arg(index as i32)
            .with_arg(format!("{:08x}-0000-4000-8000-{:012x}", number, number))
            .with_arg(label.as_str()),
            _ => Packet::new(format!("/eos/out/get/{}/{}", category, number)),
        }
    }

    fn notify(&mut self, category: Category, number: u32) {
        if !self.subscribed {
            return;
        }
        self.sequence = self.sequence.wrapping_add(1);
        let count = self.objects.get(&category).map_or(0, BTreeMap::len);
        self.pending_output.push_back(
            Packet::new(format!("/eos/out/notify/{}/list/0/{}", category, count))
                .with_arg(self.sequence)
                .with_arg(number as i32),
        );
    }
}

impl VirtualConsole for VirtualEos {
    fn family(&self) -> Family {
        Family::Eos
    }

    fn respond(&mut self, request: &Packet) -> Vec<Packet> {
        let segments = request.segments();
        match segments.as_slice() {
            ["", "eos", "subscribe"] => {
                self.subscribed = request.args.first().and_then(Arg::as_i64) != Some(0);
                debug!("Virtual Eos subscribed: {}", self.subscribed);
                Vec::new()
            }
            ["", "eos", "cmd"] | ["", "eos", "user", _, "cmd"] => {
                if let Some(line) = request.args.first().and_then(Arg::as_str) {
                    debug!("Virtual Eos command line: {}", line);
                    self.commands.push(line.to_string());
                }
                Vec::new()
            }
            ["", "eos", "get", category, "count"] => match Self::tracked(category) {
                Some(category) => {
                    let count = self.objects.get(&category).map_or(0, BTreeMap::len);
                    vec![Packet::new(format!("/eos/out/get/{}/count", category))
                        .with_arg(count as i32)]
                }
                None => Vec::new(),
            },
            ["", "eos", "get", category, "index", index] => {
                let (Some(category), Ok(index)) = (Self::tracked(category), index.parse::<u32>())
                else {
                    return Vec::new();
                };
                if self
                    .drop_once
                    .get_mut(&category)
                    .is_some_and(|dropped| dropped.remove(&index))
                {
                    debug!("Virtual Eos dropping {} index {}", category, index);
                    return Vec::new();
                }
                let number = self
                    .objects
                    .get(&category)
                    .and_then(|o| o.keys().nth(index as usize).copied());
                number
                    .map(|number| vec![self.list_reply(category, number)])
                    .unwrap_or_default()
            }
            ["", "eos", "get", category, number] => {
                match (Self::tracked(category), number.parse::<u32>()) {
                    (Some(category), Ok(number)) => vec![self.list_reply(category, number)],
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn label(&mut self, category: Category, id: u32, label: &str) {
        self.objects
            .entry(category)
            .or_default()
            .insert(id, label.to_string());
        self.notify(category, id);
    }

    fn remove(&mut self, category: Category, id: u32) {
        let removed = self
            .objects
            .get_mut(&category)
            .and_then(|o| o.remove(&id))
            .is_some();
        if removed {
            self.notify(category, id);
        }
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn take_output(&mut self) -> Option<Packet> {
        self.pending_output.pop_front()
    }
}
