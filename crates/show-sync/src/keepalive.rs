//! Keepalive scheduler
//!
//! Some consoles stop pushing updates unless the subscription is renewed on a
//! timer. The scheduler sends the renewal packet once per period until its
//! cancellation token fires. There is no backoff and no acknowledgment.

use std::sync::Arc;
use std::time::Duration;

use show_protocol::Packet;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::{send_logged, Transport};

/// Spawn a task sending `packet` every `period`
///
/// The first packet goes out one period after the call; the subscription
/// itself is sent by the session at start.
pub fn spawn_keepalive(
    transport: Arc<dyn Transport>,
    packet: Packet,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(keepalive_task(transport, packet, period, cancel))
}

async fn keepalive_task(
    transport: Arc<dyn Transport>,
    packet: Packet,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    debug!("Keepalive {} every {:?}", packet.address, period);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => send_logged(transport.as_ref(), &packet),
        }
    }
    debug!("Keepalive {} stopped", packet.address);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;

    #[tokio::test(start_paused = true)]
    async fn test_sends_once_per_period() {
        let transport = Arc::new(RecordingTransport::new());
        let cancel = CancellationToken::new();
        let handle = spawn_keepalive(
            transport.clone(),
            Packet::new("/xremote"),
            Duration::from_secs(9),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(8_900)).await;
        assert!(transport.sent().is_empty());

        tokio::time::sleep(Duration::from_secs(19)).await;
        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|p| p.address == "/xremote"));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_cancel() {
        let transport = Arc::new(RecordingTransport::new());
        let cancel = CancellationToken::new();
        let handle = spawn_keepalive(
            transport.clone(),
            Packet::new("/xremote"),
            Duration::from_secs(1),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        cancel.cancel();
        handle.await.unwrap();
        let sent = transport.sent().len();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.sent().len(), sent);
        assert_eq!(sent, 1);
    }
}
