//! Notification protocol
//!
//! Keeps the label cache current from packets the console pushes on its own:
//! list replies (creation, rename, and the answers to discovery's index
//! requests), delete signals, and generic "these ids changed" notifications.
//!
//! A change notification triggers one targeted fetch per id instead of a full
//! resync; the fetched details come back as an ordinary list reply.

use std::sync::Arc;

use show_protocol::{normalize_label, Category, DeviceId, Grammar, Inbound, Packet};
use tracing::{debug, info, warn};

use crate::cache::LabelCache;
use crate::discovery::Discovery;
use crate::router::PacketHandler;
use crate::transport::{send_logged, Transport};

/// Applies pushed updates to the label cache
pub struct Notifications {
    grammar: Arc<dyn Grammar>,
    cache: Arc<LabelCache>,
    discovery: Arc<Discovery>,
    transport: Arc<dyn Transport>,
}

impl Notifications {
    pub fn new(
        grammar: Arc<dyn Grammar>,
        cache: Arc<LabelCache>,
        discovery: Arc<Discovery>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            grammar,
            cache,
            discovery,
            transport,
        }
    }

    /// Apply one classified packet
    pub fn apply(&self, inbound: Inbound) {
        match inbound {
            Inbound::Label {
                category,
                id,
                label,
                index,
            } => {
                self.apply_label(category, id, &label);
                if let Some(index) = index {
                    self.discovery.mark_received(category, index);
                }
            }
            Inbound::Deleted { category, id } => {
                if let Some(label) = self.cache.delete_by_id(category, &id) {
                    info!("{} {} ('{}') removed", category.noun(), id, label);
                }
            }
            Inbound::Changed { category, ids } => {
                debug!("{} {} changed", ids.len(), category.plural());
                for id in &ids {
                    let request = self.grammar.fetch_request(category, id);
                    send_logged(self.transport.as_ref(), &request);
                }
            }
            Inbound::Count { category, count } => self.discovery.on_count(category, count),
            Inbound::Ignored => {}
        }
    }

    fn apply_label(&self, category: Category, id: DeviceId, label: &str) {
        // an unnamed object cannot be addressed by label
        if label.trim().is_empty() {
            if let Some(old) = self.cache.delete_by_id(category, &id) {
                debug!("{} {} lost its label '{}'", category.noun(), id, old);
            }
            return;
        }

        match self.cache.upsert(category, label, id.clone()) {
            Some(old) if old == normalize_label(label) => {}
            Some(old) => info!("{} {} renamed '{}' -> '{}'", category.noun(), id, old, label),
            None => debug!("{} {} is '{}'", category.noun(), id, label),
        }
    }
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifications")
            .field("family", &self.grammar.family())
            .finish()
    }
}

impl PacketHandler for Notifications {
    fn handle(&self, packet: &Packet) {
        match self.grammar.classify(packet) {
            Ok(inbound) => self.apply(inbound),
            Err(e) => warn!("Dropping {}: {}", packet, e),
        }
    }
}
