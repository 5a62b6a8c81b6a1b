//! Serve a virtual console over UDP
//!
//! Requests are answered to whoever sent them. Push notifications go to the
//! most recent sender, which is how both real consoles pick their client.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use show_protocol::{codec, Packet};
use tokio::net::UdpSocket;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::VirtualConsole;

/// How often queued push notifications are flushed
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

fn lock<C>(console: &Mutex<C>) -> MutexGuard<'_, C> {
    console.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn send_packet(socket: &UdpSocket, packet: &Packet, to: SocketAddr) {
    match codec::encode(packet) {
        Ok(bytes) => {
            if let Err(e) = socket.send_to(&bytes, to).await {
                warn!("Virtual console failed to send {}: {}", packet.address, e);
            }
        }
        Err(e) => warn!("Virtual console cannot encode {}: {}", packet, e),
    }
}

/// Run a virtual console on `socket` until `cancel` fires
///
/// The console stays shared so tests can relabel objects while it is served.
pub async fn run_virtual_console<C>(
    socket: UdpSocket,
    console: Arc<Mutex<C>>,
    cancel: CancellationToken,
) -> io::Result<()>
where
    C: VirtualConsole + 'static,
{
    let family = lock(&console).family();
    info!("Virtual {} listening on {}", family, socket.local_addr()?);

    let mut buf = vec![0u8; 65_535];
    let mut client: Option<SocketAddr> = None;
    let mut flush = interval(FLUSH_INTERVAL);
    flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = socket.recv_from(&mut buf) => {
                let (len, from) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("Virtual {} receive failed: {}", family, e);
                        continue;
                    }
                };
                client = Some(from);

                let requests = match codec::decode(&buf[..len]) {
                    Ok(packets) => packets,
                    Err(e) => {
                        warn!("Virtual {} dropping datagram: {}", family, e);
                        continue;
                    }
                };

                let replies: Vec<Packet> = {
                    let mut console = lock(&console);
                    requests.iter().flat_map(|r| console.respond(r)).collect()
                };
                for reply in &replies {
                    debug!("Virtual {} -> {}", family, reply);
                    send_packet(&socket, reply, from).await;
                }
            }
            _ = flush.tick() => {
                let Some(to) = client else { continue };
                let pushes: Vec<Packet> = {
                    let mut console = lock(&console);
                    std::iter::from_fn(|| console.take_output()).collect()
                };
                for push in &pushes {
                    debug!("Virtual {} pushes {}", family, push);
                    send_packet(&socket, push, to).await;
                }
            }
        }
    }

    info!("Virtual {} stopped", family);
    Ok(())
}
