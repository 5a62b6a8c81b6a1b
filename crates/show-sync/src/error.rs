//! Error types for the synchronization engine

use show_protocol::{Category, ProtocolError};
use thiserror::Error;

/// Errors that can occur in the synchronization engine
#[derive(Debug, Error)]
pub enum SyncError {
    /// A label is not present in the mirror
    #[error("no {} called '{label}'", .category.noun())]
    Resolution {
        /// Category that was searched
        category: Category,
        /// Label as the caller gave it
        label: String,
    },

    /// Route pattern the router cannot use
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The writer task behind a transport has stopped
    #[error("transport closed")]
    TransportClosed,

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_names_label() {
        let err = SyncError::Resolution {
            category: Category::Channel,
            label: "Ghost".into(),
        };
        assert_eq!(err.to_string(), "no channel called 'Ghost'");
    }
}
