//! Discovery protocol
//!
//! Populates the label cache from a console that offers no bulk dump. For
//! counted families the cascade is `count` → one `index` request per object →
//! one `list` reply per object. Fixed-range families skip the count and probe
//! every slot straight away.
//!
//! Nothing here waits on the network. Each step is triggered by whatever
//! arrives next on the receive task; replies can come back in any order.
//!
//! Progress is tracked per category so a caller can tell when every expected
//! reply has arrived, and an optional watchdog can re-send what is missing.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use show_protocol::{Category, Enumeration, Grammar, Inbound, Packet};
use tracing::{debug, info, warn};

use crate::router::PacketHandler;
use crate::transport::{send_logged, Transport};

/// Retry rounds without a new reply before a counted category is recounted
pub const MAX_INDEX_RETRIES: u32 = 3;

/// Where discovery of one category stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiscoveryPhase {
    /// Discovery has not been started
    #[default]
    Idle,
    /// Count request sent, no count received yet
    AwaitingCount,
    /// Index requests sent for `0..expected`
    AwaitingReplies {
        /// Number of objects the console reported
        expected: u32,
        /// Indices that have been answered
        received: BTreeSet<u32>,
        /// Retry rounds since the last new reply
        retries: u32,
    },
    /// Every expected reply has arrived
    Settled {
        /// Number of objects discovered
        count: u32,
    },
}

impl DiscoveryPhase {
    pub fn is_settled(&self) -> bool {
        matches!(self, DiscoveryPhase::Settled { .. })
    }
}

impl std::fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryPhase::Idle => f.write_str("idle"),
            DiscoveryPhase::AwaitingCount => f.write_str("waiting for count"),
            DiscoveryPhase::AwaitingReplies {
                expected, received, ..
            } => {
                write!(f, "{}/{} replies", received.len(), expected)
            }
            DiscoveryPhase::Settled { count } => write!(f, "settled ({})", count),
        }
    }
}

/// Drives the count → index handshake for every category of one console
pub struct Discovery {
    grammar: Arc<dyn Grammar>,
    transport: Arc<dyn Transport>,
    phases: Mutex<HashMap<Category, DiscoveryPhase>>,
}

impl Discovery {
    pub fn new(grammar: Arc<dyn Grammar>, transport: Arc<dyn Transport>) -> Self {
        Self {
            grammar,
            transport,
            phases: Mutex::new(HashMap::new()),
        }
    }

    fn phases(&self) -> MutexGuard<'_, HashMap<Category, DiscoveryPhase>> {
        self.phases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin (or restart) discovery of `category`
    pub fn start(&self, category: Category) {
        match self.grammar.enumeration(category) {
            Enumeration::Counted => {
                let Some(request) = self.grammar.count_request(category) else {
                    warn!("{} cannot count {}", self.grammar.family(), category.plural());
                    return;
                };
                self.phases().insert(category, DiscoveryPhase::AwaitingCount);
                debug!("Requesting {} count", category.noun());
                send_logged(self.transport.as_ref(), &request);
            }
            Enumeration::Fixed(slots) => {
                debug!("Probing {} {}", slots, category.plural());
                self.expect(category, slots);
            }
        }
    }

    /// A count reply arrived: request every index below it
    pub fn on_count(&self, category: Category, count: u32) {
        info!("Found {} {}", count, category.plural());
        self.expect(category, count);
    }

    fn expect(&self, category: Category, expected: u32) {
        let phase = if expected == 0 {
            DiscoveryPhase::Settled { count: 0 }
        } else {
            DiscoveryPhase::AwaitingReplies {
                expected,
                received: BTreeSet::new(),
                retries: 0,
            }
        };
        self.phases().insert(category, phase);

        // sent after the lock is released; replies may arrive immediately
        for index in 0..expected {
            let request = self.grammar.index_request(category, index);
            send_logged(self.transport.as_ref(), &request);
        }
    }

    /// Note that the reply for `index` arrived
    ///
    /// Replies outside the expected range, or for a category that is not
    /// being discovered, are pushed updates and change nothing here.
    pub fn mark_received(&self, category: Category, index: u32) {
        let mut phases = self.phases();
        let Some(phase) = phases.get_mut(&category) else {
            return;
        };

        if let DiscoveryPhase::AwaitingReplies {
            expected,
            received,
            retries,
        } = phase
        {
            if index >= *expected {
                return;
            }
            if received.insert(index) {
                *retries = 0;
            }
            if received.len() as u32 == *expected {
                info!("Discovered all {} {}", expected, category.plural());
                *phase = DiscoveryPhase::Settled { count: *expected };
            }
        }
    }

    /// Current progress for `category`
    pub fn progress(&self, category: Category) -> DiscoveryPhase {
        self.phases().get(&category).cloned().unwrap_or_default()
    }

    /// Indices still unanswered for `category`
    pub fn missing(&self, category: Category) -> Vec<u32> {
        match self.phases().get(&category) {
            Some(DiscoveryPhase::AwaitingReplies {
                expected, received, ..
            }) => {
                (0..*expected).filter(|i| !received.contains(i)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Re-send whatever is still outstanding in every category
    ///
    /// A counted category whose missing indices stay unanswered for
    /// [`MAX_INDEX_RETRIES`] rounds is counted again, since objects may have
    /// been deleted after the first count. Returns the number of packets sent.
    pub fn retry(&self) -> usize {
        let mut requests: Vec<Packet> = Vec::new();
        {
            let mut phases = self.phases();
            for &category in self.grammar.categories() {
                let Some(phase) = phases.get_mut(&category) else {
                    continue;
                };

                let stalled = matches!(
                    &*phase,
                    DiscoveryPhase::AwaitingReplies { retries, .. } if *retries >= MAX_INDEX_RETRIES
                );
                if stalled {
                    if let Some(request) = self.grammar.count_request(category) {
                        info!("{} replies stalled, recounting", category.noun());
                        *phase = DiscoveryPhase::AwaitingCount;
                        requests.push(request);
                        continue;
                    }
                }

                match phase {
                    DiscoveryPhase::AwaitingCount => {
                        requests.extend(self.grammar.count_request(category));
                    }
                    DiscoveryPhase::AwaitingReplies {
                        expected,
                        received,
                        retries,
                    } => {
                        *retries += 1;
                        let missing: Vec<u32> =
                            (0..*expected).filter(|i| !received.contains(i)).collect();
                        info!(
                            "Re-requesting {} missing {}",
                            missing.len(),
                            category.plural()
                        );
                        requests.extend(
                            missing
                                .into_iter()
                                .map(|index| self.grammar.index_request(category, index)),
                        );
                    }
                    DiscoveryPhase::Idle | DiscoveryPhase::Settled { .. } => {}
                }
            }
        }

        // sent after the lock is released; replies may arrive immediately
        for request in &requests {
            send_logged(self.transport.as_ref(), request);
        }
        requests.len()
    }

    /// Forget progress for `category`
    pub fn reset(&self, category: Category) {
        self.phases().remove(&category);
    }
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("family", &self.grammar.family())
            .field("phases", &*self.phases())
            .finish()
    }
}

impl PacketHandler for Discovery {
    fn handle(&self, packet: &Packet) {
        match self.grammar.classify(packet) {
            Ok(Inbound::Count { category, count }) => self.on_count(category, count),
            Ok(other) => debug!("Discovery ignoring {:?} from {}", other, packet.address),
            Err(e) => warn!("Dropping {}: {}", packet, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use show_protocol::{eos::EosGrammar, x32::X32Grammar};

    use super::*;
    use crate::transport::RecordingTransport;

    fn eos() -> (Discovery, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        (
            Discovery::new(Arc::new(EosGrammar::new()), transport.clone()),
            transport,
        )
    }

    fn addresses(transport: &RecordingTransport) -> Vec<String> {
        transport.take().into_iter().map(|p| p.address).collect()
    }

    #[test]
    fn test_start_requests_count() {
        let (discovery, transport) = eos();
        discovery.start(Category::Group);

        assert_eq!(addresses(&transport), vec!["/eos/get/group/count"]);
        assert_eq!(discovery.progress(Category::Group), DiscoveryPhase::AwaitingCount);
    }

    #[test]
    fn test_count_emits_exactly_n_index_requests() {
        let (discovery, transport) = eos();
        discovery.start(Category::Group);
        transport.take();

        discovery.handle(&Packet::new("/eos/out/get/group/count").with_arg(3));

        assert_eq!(
            addresses(&transport),
            vec![
                "/eos/get/group/index/0",
                "/eos/get/group/index/1",
                "/eos/get/group/index/2",
            ]
        );
        assert_eq!(discovery.missing(Category::Group), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_count_settles() {
        let (discovery, transport) = eos();
        discovery.on_count(Category::Preset, 0);
        assert!(transport.sent().is_empty());
        assert_eq!(
            discovery.progress(Category::Preset),
            DiscoveryPhase::Settled { count: 0 }
        );
    }

    #[test]
    fn test_settles_when_every_index_answered() {
        let (discovery, _transport) = eos();
        discovery.on_count(Category::Group, 3);

        discovery.mark_received(Category::Group, 2);
        discovery.mark_received(Category::Group, 0);
        discovery.mark_received(Category::Group, 0);
        assert_eq!(discovery.missing(Category::Group), vec![1]);
        assert_eq!(discovery.progress(Category::Group).to_string(), "2/3 replies");

        discovery.mark_received(Category::Group, 1);
        assert!(discovery.progress(Category::Group).is_settled());
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let (discovery, _transport) = eos();
        discovery.on_count(Category::Group, 1);
        discovery.mark_received(Category::Group, 7);
        discovery.mark_received(Category::Preset, 0);
        assert_eq!(discovery.missing(Category::Group), vec![0]);
        assert_eq!(discovery.progress(Category::Preset), DiscoveryPhase::Idle);
    }

    #[test]
    fn test_retry_resends_only_missing() {
        let (discovery, transport) = eos();
        discovery.start(Category::Preset);
        discovery.on_count(Category::Group, 3);
        discovery.mark_received(Category::Group, 1);
        transport.take();

        assert_eq!(discovery.retry(), 3);
        assert_eq!(
            addresses(&transport),
            vec![
                "/eos/get/group/index/0",
                "/eos/get/group/index/2",
                "/eos/get/preset/count",
            ]
        );
    }

    #[test]
    fn test_retry_after_settled_sends_nothing() {
        let (discovery, transport) = eos();
        discovery.on_count(Category::Group, 1);
        discovery.mark_received(Category::Group, 0);
        transport.take();
        assert_eq!(discovery.retry(), 0);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_fixed_range_probes_every_slot() {
        let transport = Arc::new(RecordingTransport::new());
        let discovery = Discovery::new(Arc::new(X32Grammar::new()), transport.clone());
        discovery.start(Category::Bus);

        let sent = addresses(&transport);
        assert_eq!(sent.len(), 16);
        assert_eq!(sent[0], "/bus/01/config/name");
        assert_eq!(sent[15], "/bus/16/config/name");
        assert_eq!(discovery.missing(Category::Bus).len(), 16);
    }

    #[test]
    fn test_malformed_count_is_dropped() {
        let (discovery, transport) = eos();
        discovery.start(Category::Group);
        transport.take();
        discovery.handle(&Packet::new("/eos/out/get/group/count"));
        assert!(transport.sent().is_empty());
        assert_eq!(discovery.progress(Category::Group), DiscoveryPhase::AwaitingCount);
    }

    #[test]
    fn test_oversized_count_is_dropped() {
        let (discovery, transport) = eos();
        discovery.start(Category::Group);
        transport.take();

        discovery.handle(&Packet::new("/eos/out/get/group/count").with_arg(2_000_000_000));

        assert!(transport.sent().is_empty());
        assert_eq!(discovery.progress(Category::Group), DiscoveryPhase::AwaitingCount);
        assert!(discovery.missing(Category::Group).is_empty());
    }

    #[test]
    fn test_stalled_replies_fall_back_to_recount() {
        let (discovery, transport) = eos();
        discovery.on_count(Category::Group, 3);
        discovery.mark_received(Category::Group, 0);
        discovery.mark_received(Category::Group, 1);
        transport.take();

        for _ in 0..MAX_INDEX_RETRIES {
            assert_eq!(discovery.retry(), 1);
            assert_eq!(addresses(&transport), vec!["/eos/get/group/index/2"]);
        }

        assert_eq!(discovery.retry(), 1);
        assert_eq!(addresses(&transport), vec!["/eos/get/group/count"]);
        assert_eq!(discovery.progress(Category::Group), DiscoveryPhase::AwaitingCount);

        discovery.handle(&Packet::new("/eos/out/get/group/count").with_arg(2));
        assert_eq!(addresses(&transport).len(), 2);
        discovery.mark_received(Category::Group, 0);
        discovery.mark_received(Category::Group, 1);
        assert_eq!(
            discovery.progress(Category::Group),
            DiscoveryPhase::Settled { count: 2 }
        );
    }

    #[test]
    fn test_new_reply_resets_retry_rounds() {
        let (discovery, transport) = eos();
        discovery.on_count(Category::Group, 3);
        for _ in 0..MAX_INDEX_RETRIES {
            discovery.retry();
        }
        discovery.mark_received(Category::Group, 0);
        transport.take();

        assert_eq!(discovery.retry(), 2);
        assert_eq!(
            addresses(&transport),
            vec!["/eos/get/group/index/1", "/eos/get/group/index/2"]
        );
    }

    #[test]
    fn test_fixed_range_never_recounts() {
        let transport = Arc::new(RecordingTransport::new());
        let discovery = Discovery::new(Arc::new(X32Grammar::new()), transport.clone());
        discovery.start(Category::Bus);
        for index in 0..15 {
            discovery.mark_received(Category::Bus, index);
        }
        transport.take();

        for _ in 0..=MAX_INDEX_RETRIES {
            assert_eq!(discovery.retry(), 1);
            assert_eq!(addresses(&transport), vec!["/bus/16/config/name"]);
        }
    }

    #[test]
    fn test_reset() {
        let (discovery, _transport) = eos();
        discovery.on_count(Category::Group, 2);
        discovery.reset(Category::Group);
        assert_eq!(discovery.progress(Category::Group), DiscoveryPhase::Idle);
        assert!(discovery.missing(Category::Group).is_empty());
    }
}
