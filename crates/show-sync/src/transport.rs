//! Outbound packet transport
//!
//! Every sender in a session (handlers on the receive task, the command path,
//! the keepalive timer) shares one [`Transport`]. Sends are fire-and-forget:
//! nothing waits for the console to answer.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use show_protocol::{codec, Packet};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Sends packets to one console
pub trait Transport: Send + Sync {
    /// Send one packet without waiting for a reply
    fn send(&self, packet: &Packet) -> Result<(), SyncError>;
}

/// Send a packet, logging instead of returning a failure
pub(crate) fn send_logged(transport: &dyn Transport, packet: &Packet) {
    debug!("-> {}", packet);
    if let Err(e) = transport.send(packet) {
        warn!("Failed to send {}: {}", packet.address, e);
    }
}

/// UDP transport that writes to the console from the session's socket
///
/// The X32 only pushes updates back to the port a subscription came from, so
/// the same socket is used for sending and receiving. Encoded datagrams are
/// queued to a writer task, which waits for the socket to become writable;
/// senders never block and nothing is dropped while the socket is busy.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    console: SocketAddr,
}

impl UdpTransport {
    /// Start the writer task for `socket`
    ///
    /// The task runs until `cancel` fires or every clone of the transport is
    /// dropped.
    pub fn spawn(
        socket: Arc<UdpSocket>,
        console: SocketAddr,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (outbound, queue) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(socket, console, queue, cancel));
        (Self { outbound, console }, task)
    }

    /// Address packets are sent to
    pub fn console(&self) -> SocketAddr {
        self.console
    }
}

impl Transport for UdpTransport {
    fn send(&self, packet: &Packet) -> Result<(), SyncError> {
        let bytes = codec::encode(packet)?;
        self.outbound
            .send(bytes)
            .map_err(|_| SyncError::TransportClosed)
    }
}

async fn run_writer(
    socket: Arc<UdpSocket>,
    console: SocketAddr,
    mut queue: mpsc::UnboundedReceiver<Vec<u8>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = queue.recv() => match next {
                Some(bytes) => {
                    if let Err(e) = socket.send_to(&bytes, console).await {
                        warn!("Send to {} failed: {}", console, e);
                    }
                }
                None => break,
            }
        }
    }
    debug!("Writer for {} stopped", console);
}

/// Transport that keeps every packet it is asked to send
///
/// Lets the engine be driven without a network.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Packet>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets sent so far
    pub fn sent(&self) -> Vec<Packet> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return the packets sent so far
    pub fn take(&self) -> Vec<Packet> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Transport for RecordingTransport {
    fn send(&self, packet: &Packet) -> Result<(), SyncError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet.clone());
        Ok(())
    }
}
