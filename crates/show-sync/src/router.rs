//! Inbound packet router
//!
//! Maps address patterns to handlers. A pattern is either an exact address
//! or a prefix ending in a single trailing `*` that matches any suffix.
//!
//! When several patterns match, the most specific one wins: an exact address
//! beats any wildcard, and a longer wildcard prefix beats a shorter one. Ties
//! go to the pattern registered first. Exactly one handler sees each packet.

use std::sync::Arc;

use show_protocol::Packet;
use tracing::debug;

use crate::error::SyncError;

/// Receiver of routed packets
///
/// Handlers run synchronously on the receive task, so they must not block.
pub trait PacketHandler: Send + Sync {
    /// Handle one inbound packet
    fn handle(&self, packet: &Packet);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
}

impl Pattern {
    fn parse(pattern: &str) -> Result<Self, SyncError> {
        let invalid = |reason| SyncError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if !pattern.starts_with('/') {
            return Err(invalid("patterns must start with '/'"));
        }

        match pattern.find('*') {
            None => Ok(Pattern::Exact(pattern.to_string())),
            Some(pos) if pos + 1 == pattern.len() => Ok(Pattern::Prefix(pattern[..pos].to_string())),
            Some(_) => Err(invalid("'*' is only allowed as the final character")),
        }
    }

    fn matches(&self, address: &str) -> bool {
        match self {
            Pattern::Exact(exact) => address == exact,
            Pattern::Prefix(prefix) => address.starts_with(prefix.as_str()),
        }
    }

    /// Sort key: exact patterns first, then longer prefixes
    fn specificity(&self) -> (bool, usize) {
        match self {
            Pattern::Exact(exact) => (true, exact.len()),
            Pattern::Prefix(prefix) => (false, prefix.len()),
        }
    }
}

struct Route {
    pattern: Pattern,
    source: String,
    handler: Arc<dyn PacketHandler>,
}

/// Pattern router for inbound packets
#[derive(Default)]
pub struct Router {
    /// Kept sorted by descending specificity, registration order within ties
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field(
                "patterns",
                &self.routes.iter().map(|r| r.source.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a pattern
    pub fn register(
        &mut self,
        pattern: &str,
        handler: Arc<dyn PacketHandler>,
    ) -> Result<(), SyncError> {
        let parsed = Pattern::parse(pattern)?;
        if self.routes.iter().any(|r| r.pattern == parsed) {
            return Err(SyncError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern already registered",
            });
        }

        self.routes.push(Route {
            pattern: parsed,
            source: pattern.to_string(),
            handler,
        });
        // stable sort keeps registration order among equally specific patterns
        self.routes
            .sort_by(|a, b| b.pattern.specificity().cmp(&a.pattern.specificity()));
        Ok(())
    }

    /// Registered patterns, most specific first
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.source.as_str())
    }

    /// Deliver a packet to the most specific matching handler
    ///
    /// Returns `false` if no pattern matched.
    pub fn dispatch(&self, packet: &Packet) -> bool {
        match self.routes.iter().find(|r| r.pattern.matches(&packet.address)) {
            Some(route) => {
                route.handler.handle(packet);
                true
            }
            None => {
                debug!("No route for {}", packet.address);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl PacketHandler for Recorder {
        fn handle(&self, packet: &Packet) {
            self.seen.lock().unwrap().push(packet.address.clone());
        }
    }

    impl Recorder {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_wildcard_matches_suffix() {
        let handler = Arc::new(Recorder::default());
        let mut router = Router::new();
        router.register("/ch/*", handler.clone()).unwrap();

        assert!(router.dispatch(&Packet::new("/ch/01/config/name")));
        assert!(!router.dispatch(&Packet::new("/bus/01/config/name")));
        assert!(!router.dispatch(&Packet::new("/chx")));
        assert_eq!(handler.seen(), vec!["/ch/01/config/name"]);
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let count = Arc::new(Recorder::default());
        let rest = Arc::new(Recorder::default());
        let mut router = Router::new();
        // wildcard registered first on purpose
        router.register("/eos/out/get/group/*", rest.clone()).unwrap();
        router.register("/eos/out/get/group/count", count.clone()).unwrap();

        router.dispatch(&Packet::new("/eos/out/get/group/count"));
        router.dispatch(&Packet::new("/eos/out/get/group/3/list/0/4"));

        assert_eq!(count.seen(), vec!["/eos/out/get/group/count"]);
        assert_eq!(rest.seen(), vec!["/eos/out/get/group/3/list/0/4"]);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let broad = Arc::new(Recorder::default());
        let narrow = Arc::new(Recorder::default());
        let mut router = Router::new();
        router.register("/eos/out/*", broad.clone()).unwrap();
        router.register("/eos/out/notify/*", narrow.clone()).unwrap();

        router.dispatch(&Packet::new("/eos/out/notify/preset/list/0/1"));
        router.dispatch(&Packet::new("/eos/out/ping"));

        assert_eq!(narrow.seen(), vec!["/eos/out/notify/preset/list/0/1"]);
        assert_eq!(broad.seen(), vec!["/eos/out/ping"]);
    }

    #[test]
    fn test_one_handler_per_packet() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let mut router = Router::new();
        router.register("/x/*", a.clone()).unwrap();
        router.register("/x*", b.clone()).unwrap();

        router.dispatch(&Packet::new("/x/1"));
        assert_eq!(a.seen().len() + b.seen().len(), 1);
        assert_eq!(a.seen(), vec!["/x/1"]);
    }

    #[test]
    fn test_invalid_patterns() {
        let handler = Arc::new(Recorder::default());
        let mut router = Router::new();
        assert!(router.register("ch/*", handler.clone()).is_err());
        assert!(router.register("/ch/*/name", handler.clone()).is_err());
        router.register("/ch/*", handler.clone()).unwrap();
        assert!(matches!(
            router.register("/ch/*", handler),
            Err(SyncError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_patterns_listed_most_specific_first() {
        let handler = Arc::new(Recorder::default());
        let mut router = Router::new();
        router.register("/eos/out/notify/*", handler.clone()).unwrap();
        router.register("/eos/out/get/group/*", handler.clone()).unwrap();
        router.register("/eos/out/get/group/count", handler).unwrap();

        let patterns: Vec<&str> = router.patterns().collect();
        assert_eq!(
            patterns,
            vec![
                "/eos/out/get/group/count",
                "/eos/out/get/group/*",
                "/eos/out/notify/*",
            ]
        );
    }
}
