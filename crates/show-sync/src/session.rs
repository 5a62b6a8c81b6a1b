//! Console session
//!
//! A [`Session`] wires the engine together for one console: the router feeds
//! discovery and notifications, which write the label cache, which the
//! translator reads. It does no I/O of its own; [`connect`] puts it on a UDP
//! socket and spawns the background tasks.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use show_protocol::{
    codec, create_grammar, Category, DeviceCommand, DeviceId, Family, Grammar, LabelCommand,
    Packet, RouteTarget,
};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::LabelCache;
use crate::config::SessionConfig;
use crate::discovery::{Discovery, DiscoveryPhase};
use crate::error::SyncError;
use crate::keepalive::spawn_keepalive;
use crate::notification::Notifications;
use crate::router::{PacketHandler, Router};
use crate::translator::Translator;
use crate::transport::{send_logged, Transport, UdpTransport};

/// Largest datagram the receive loop accepts
const MAX_DATAGRAM: usize = 65_535;

/// The synchronization engine for one console
pub struct Session {
    grammar: Arc<dyn Grammar>,
    transport: Arc<dyn Transport>,
    cache: Arc<LabelCache>,
    discovery: Arc<Discovery>,
    translator: Translator,
    router: Router,
}

impl Session {
    /// Build a session and register the grammar's inbound routes
    pub fn new(grammar: Arc<dyn Grammar>, transport: Arc<dyn Transport>) -> Result<Self, SyncError> {
        let cache = Arc::new(LabelCache::new());
        let discovery = Arc::new(Discovery::new(grammar.clone(), transport.clone()));
        let notifications = Arc::new(Notifications::new(
            grammar.clone(),
            cache.clone(),
            discovery.clone(),
            transport.clone(),
        ));

        let mut router = Router::new();
        for route in grammar.routes() {
            let handler: Arc<dyn PacketHandler> = match route.target {
                RouteTarget::Discovery => discovery.clone(),
                RouteTarget::Notification => notifications.clone(),
            };
            router.register(&route.pattern, handler)?;
        }

        let translator = Translator::new(grammar.clone(), cache.clone(), transport.clone());

        Ok(Self {
            grammar,
            transport,
            cache,
            discovery,
            translator,
            router,
        })
    }

    pub fn family(&self) -> Family {
        self.grammar.family()
    }

    /// Categories this console exposes labels for
    pub fn categories(&self) -> &'static [Category] {
        self.grammar.categories()
    }

    /// The label mirror
    pub fn cache(&self) -> &LabelCache {
        &self.cache
    }

    /// Subscribe to pushed updates and discover every category
    pub fn start(&self) {
        if let Some(subscribe) = self.grammar.subscribe() {
            send_logged(self.transport.as_ref(), &subscribe);
        }
        for &category in self.categories() {
            self.discovery.start(category);
        }
    }

    /// Route one inbound packet to its handler
    ///
    /// Returns `false` if no route matched.
    pub fn handle_packet(&self, packet: &Packet) -> bool {
        debug!("<- {}", packet);
        self.router.dispatch(packet)
    }

    /// Forget every label and run discovery again
    pub fn resync(&self) {
        info!("Resynchronizing {} labels", self.family());
        for &category in self.categories() {
            self.cache.clear(category);
            self.discovery.reset(category);
            self.discovery.start(category);
        }
    }

    /// Known labels in `category`, sorted
    pub fn snapshot(&self, category: Category) -> BTreeMap<String, DeviceId> {
        self.cache.snapshot(category)
    }

    /// Device id currently bound to `label`
    pub fn resolve(&self, category: Category, label: &str) -> Result<DeviceId, SyncError> {
        self.translator.resolve(category, label)
    }

    /// Resolve a label command and send it; nothing is sent unless every label resolves
    pub fn set_by_label(&self, command: &LabelCommand) -> Result<DeviceCommand, SyncError> {
        self.translator.send(command)
    }

    /// Send a command that is already addressed by device id
    pub fn set_by_number(&self, command: &DeviceCommand) -> Result<(), SyncError> {
        self.translator.execute(command)
    }

    /// Send a raw console command line
    pub fn send_command_line(&self, line: &str) -> Result<(), SyncError> {
        self.translator
            .execute(&DeviceCommand::CommandLine(line.to_string()))
    }

    /// Discovery progress for `category`
    pub fn discovery_progress(&self, category: Category) -> DiscoveryPhase {
        self.discovery.progress(category)
    }

    /// Re-request whatever discovery is still missing
    pub fn retry_discovery(&self) -> usize {
        self.discovery.retry()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("family", &self.family())
            .field("router", &self.router)
            .finish()
    }
}

/// A session running on a UDP socket
///
/// Dropping the handle leaves the tasks running; call [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct SessionHandle {
    session: Arc<Session>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Local address replies arrive on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the writer, receive loop, keepalive and retry tasks
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Session task failed: {}", e);
            }
        }
        info!("{} session on {} stopped", self.session.family(), self.local_addr);
    }
}

/// Open a session: bind the socket, start the background tasks, then
/// subscribe and begin discovery
pub async fn connect(config: &SessionConfig) -> Result<SessionHandle, SyncError> {
    let socket = Arc::new(UdpSocket::bind(config.listen).await?);
    let local_addr = socket.local_addr()?;

    let cancel = CancellationToken::new();
    let (udp, writer) = UdpTransport::spawn(socket.clone(), config.console, cancel.clone());

    let grammar: Arc<dyn Grammar> = Arc::from(create_grammar(config.family, config.user));
    let transport: Arc<dyn Transport> = Arc::new(udp);
    let session = Arc::new(Session::new(grammar.clone(), transport.clone())?);

    let mut tasks = vec![
        writer,
        tokio::spawn(receive_loop(socket, session.clone(), cancel.clone())),
    ];

    if let Some(keepalive) = grammar.keepalive() {
        let period = config.keepalive_period().unwrap_or(keepalive.period);
        tasks.push(spawn_keepalive(
            transport,
            keepalive.packet,
            period,
            cancel.clone(),
        ));
    }

    if let Some(period) = config.discovery_retry() {
        tasks.push(tokio::spawn(discovery_retry_task(
            session.clone(),
            period,
            cancel.clone(),
        )));
    }

    info!(
        "{} session on {} talking to {}",
        config.family, local_addr, config.console
    );
    session.start();

    Ok(SessionHandle {
        session,
        local_addr,
        cancel,
        tasks,
    })
}

/// Decode datagrams and dispatch their packets until cancelled
///
/// A datagram that fails to decode is logged and dropped; the loop keeps going.
async fn receive_loop(socket: Arc<UdpSocket>, session: Arc<Session>, cancel: CancellationToken) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, from)) => match codec::decode(&buf[..len]) {
                    Ok(packets) => {
                        for packet in &packets {
                            session.handle_packet(packet);
                        }
                    }
                    Err(e) => warn!("Dropping datagram from {}: {}", from, e),
                },
                Err(e) => warn!("Receive failed: {}", e),
            }
        }
    }
    debug!("Receive loop stopped");
}

async fn discovery_retry_task(session: Arc<Session>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let resent = session.retry_discovery();
                if resent > 0 {
                    debug!("Re-sent {} discovery requests", resent);
                }
            }
        }
    }
}
