//! Console Label Synchronization Engine
//!
//! This crate keeps a local, label-indexed mirror of the object ids held by a
//! lighting or audio console, and uses it to turn human-addressed commands
//! into the numeric commands the console understands.
//!
//! # Architecture
//!
//! Inbound packets flow through the [`Router`] to one of two handlers, both
//! of which write the [`LabelCache`]:
//!
//! - **Discovery**: the count → index → list handshake that fills the cache
//! - **Notifications**: pushed list replies, delete signals and change
//!   notifications that keep it current
//!
//! The [`Translator`] reads the cache on the command path. The keepalive task
//! renews the console subscription on a timer. All of them send through one
//! shared [`Transport`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use show_protocol::{x32::X32Grammar, Category, LabelCommand, Packet};
//! use show_sync::{RecordingTransport, Session};
//!
//! let transport = Arc::new(RecordingTransport::new());
//! let session = Session::new(Arc::new(X32Grammar::new()), transport.clone()).unwrap();
//!
//! session.handle_packet(&Packet::new("/ch/03/config/name").with_arg("Vocal"));
//! session.handle_packet(&Packet::new("/bus/07/config/name").with_arg("Main"));
//! assert_eq!(session.snapshot(Category::Channel).len(), 1);
//!
//! session
//!     .set_by_label(&LabelCommand::Route {
//!         source: "vocal".into(),
//!         destination: "MAIN".into(),
//!         enabled: true,
//!     })
//!     .unwrap();
//! assert_eq!(transport.sent()[0].address, "/ch/03/mix/07/on");
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod keepalive;
pub mod notification;
pub mod router;
pub mod session;
pub mod translator;
pub mod transport;

pub use cache::LabelCache;
pub use config::SessionConfig;
pub use discovery::{Discovery, DiscoveryPhase};
pub use error::SyncError;
pub use keepalive::spawn_keepalive;
pub use notification::Notifications;
pub use router::{PacketHandler, Router};
pub use session::{connect, Session, SessionHandle};
pub use translator::Translator;
pub use transport::{RecordingTransport, Transport, UdpTransport};
