//! Show Control Protocol Library
//!
//! This crate describes the OSC dialects spoken by the consoles that showhome
//! talks to. It does no I/O: it turns addresses into meaning and meaning back
//! into addresses.
//!
//! - **Eos**: ETC Eos family lighting consoles (`/eos/...` addresses)
//! - **X32**: Behringer X32 / Midas M32 audio consoles (`/ch/...`, `/bus/...`)
//!
//! # Architecture
//!
//! Each family module provides a [`Grammar`] implementation that knows:
//! - Which categories of objects the console exposes
//! - How to ask the console for those objects (count, index, targeted fetch)
//! - How to classify an inbound packet into an [`Inbound`] event
//! - How to encode a numeric [`DeviceCommand`] into a packet
//!
//! The two grammars are deliberately separate. Their path offsets differ and
//! a shared parser would misread one family's ids as the other's.
//!
//! # Example
//!
//! ```rust
//! use show_protocol::{eos::EosGrammar, Arg, Category, Grammar, Inbound, Packet};
//!
//! let grammar = EosGrammar::new();
//! let reply = Packet::new("/eos/out/get/group/4/list/0/1")
//!     .with_arg(0)
//!     .with_arg("8e1f0f32-uid")
//!     .with_arg("Front Wash");
//!
//! match grammar.classify(&reply).unwrap() {
//!     Inbound::Label { category, id, label, .. } => {
//!         assert_eq!(category, Category::Group);
//!         assert_eq!(id.as_str(), "4");
//!         assert_eq!(label, "Front Wash");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod category;
pub mod codec;
pub mod command;
pub mod eos;
pub mod error;
pub mod packet;
pub mod x32;

use std::time::Duration;

pub use category::{normalize_label, Category, DeviceId};
pub use command::{DeviceCommand, Inbound, LabelCommand};
pub use error::ProtocolError;
pub use packet::{Arg, Packet};

/// Identifies which console family a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Family {
    /// ETC Eos family lighting consoles
    Eos,
    /// Behringer X32 / Midas M32 audio consoles
    X32,
}

impl Family {
    /// Returns a human-readable name for the family
    pub fn name(&self) -> &'static str {
        match self {
            Family::Eos => "ETC Eos",
            Family::X32 => "Behringer X32",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a console lets us enumerate the objects of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumeration {
    /// Ask for a count first, then for each index below it
    Counted,
    /// The console has a fixed number of slots; probe every one of them
    Fixed(u32),
}

/// Which protocol handler an inbound route feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Count replies that drive the discovery cascade
    Discovery,
    /// Pushed list, delete and change packets
    Notification,
}

/// An inbound address pattern and the handler it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// Exact address, or a prefix ending in `*`
    pub pattern: String,
    /// Handler that receives matching packets
    pub target: RouteTarget,
}

impl RouteSpec {
    pub fn new(pattern: impl Into<String>, target: RouteTarget) -> Self {
        Self {
            pattern: pattern.into(),
            target,
        }
    }
}

/// A packet the console needs to see periodically to keep pushing updates
#[derive(Debug, Clone, PartialEq)]
pub struct Keepalive {
    /// Packet to send on every tick
    pub packet: Packet,
    /// Time between ticks
    pub period: Duration,
}

/// Object-safe description of one console family's address space
///
/// Implementations are pure: they build and classify packets but never send
/// them. This keeps each family's magic offsets in one place.
pub trait Grammar: Send + Sync {
    /// The family this grammar speaks
    fn family(&self) -> Family;

    /// Categories this family exposes labels for
    fn categories(&self) -> &'static [Category];

    /// Inbound routes to register with the packet router
    fn routes(&self) -> Vec<RouteSpec>;

    /// How objects in `category` are enumerated
    fn enumeration(&self, category: Category) -> Enumeration;

    /// Request for the number of objects in `category`, if the family counts
    fn count_request(&self, category: Category) -> Option<Packet>;

    /// Request for the object at `index` (zero based) in `category`
    fn index_request(&self, category: Category, index: u32) -> Packet;

    /// Request for the details of a single object by its device id
    fn fetch_request(&self, category: Category, id: &DeviceId) -> Packet;

    /// Packet that opts this client into pushed updates
    fn subscribe(&self) -> Option<Packet>;

    /// Periodic re-assertion of the subscription, if the family needs one
    fn keepalive(&self) -> Option<Keepalive>;

    /// Classify an inbound packet
    ///
    /// Packets that are well formed but carry nothing we track classify as
    /// [`Inbound::Ignored`]. Packets whose shape is wrong return
    /// [`ProtocolError::MalformedAddress`].
    fn classify(&self, packet: &Packet) -> Result<Inbound, ProtocolError>;

    /// Encode a numeric command for this family
    fn encode_command(&self, command: &DeviceCommand) -> Result<Packet, ProtocolError>;
}

/// Create the grammar for a family
///
/// `user` selects the Eos user whose command line receives commands; it is
/// ignored by families without users.
pub fn create_grammar(family: Family, user: Option<u32>) -> Box<dyn Grammar> {
    match family {
        Family::Eos => match user {
            Some(user) => Box::new(eos::EosGrammar::with_user(user)),
            None => Box::new(eos::EosGrammar::new()),
        },
        Family::X32 => Box::new(x32::X32Grammar::new()),
    }
}
