//! Virtual Console Simulation Library
//!
//! This crate provides consoles that answer the same requests the real
//! devices do, so the sync engine can be tested without hardware:
//!
//! - **VirtualEos**: counts, index and fetch replies, change notifications
//! - **VirtualX32**: fixed channel/bus name slots and `/xremote` pushes
//!
//! A console can be driven in-process through [`VirtualConsole::respond`], or
//! served on a UDP socket with [`run_virtual_console`].
//!
//! # Example
//!
//! ```rust
//! use show_protocol::{Category, Packet};
//! use show_sim::{VirtualConsole, VirtualX32};
//!
//! let mut console = VirtualX32::new();
//! console.label(Category::Channel, 3, "Vocal");
//!
//! let replies = console.respond(&Packet::new("/ch/03/config/name"));
//! assert_eq!(replies[0].args[0].as_str(), Some("Vocal"));
//! ```

pub mod eos;
pub mod task;
pub mod x32;

use show_protocol::{Category, Family, Packet};

pub use eos::VirtualEos;
pub use task::run_virtual_console;
pub use x32::VirtualX32;

/// A simulated console
pub trait VirtualConsole: Send {
    /// Family this console imitates
    fn family(&self) -> Family;

    /// Answer one inbound request; replies go back to the sender in order
    fn respond(&mut self, request: &Packet) -> Vec<Packet>;

    /// Set the label of object `id` in `category`, creating it if needed
    ///
    /// Queues a push notification when a client is subscribed.
    fn label(&mut self, category: Category, id: u32, label: &str);

    /// Remove object `id` from `category`
    ///
    /// Queues a push notification when a client is subscribed.
    fn remove(&mut self, category: Category, id: u32);

    /// Whether a client currently receives pushed updates
    fn is_subscribed(&self) -> bool;

    /// Take the next queued push notification
    fn take_output(&mut self) -> Option<Packet>;
}
