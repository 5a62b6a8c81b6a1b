//! Error types for packet classification and encoding

use thiserror::Error;

use crate::Family;

/// Errors produced while interpreting or building console packets
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Inbound address does not have the shape its family uses
    #[error("malformed address {address}: {reason}")]
    MalformedAddress {
        /// The offending address
        address: String,
        /// What was wrong with it
        reason: String,
    },

    /// Category tag not known to any grammar
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Wire encoding failed
    #[error("encode error: {0}")]
    Encode(String),

    /// Wire decoding failed
    #[error("decode error: {0}")]
    Decode(String),

    /// Argument type we do not carry through
    #[error("unsupported argument: {0}")]
    UnsupportedArgument(String),

    /// Command has no equivalent in the target family
    #[error("{family} consoles do not support {command}")]
    UnsupportedCommand {
        /// Family the command was encoded for
        family: Family,
        /// Short name of the command
        command: &'static str,
    },
}

impl ProtocolError {
    /// Build a [`ProtocolError::MalformedAddress`]
    pub fn malformed(address: &str, reason: impl Into<String>) -> Self {
        Self::MalformedAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}
