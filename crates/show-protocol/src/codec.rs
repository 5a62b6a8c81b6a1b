//! Wire codec adapter
//!
//! OSC encoding itself is delegated to `rosc`; this module only converts
//! between its message types and our [`Packet`]s.

use rosc::{OscMessage, OscPacket, OscType};
use tracing::trace;

use crate::error::ProtocolError;
use crate::packet::{Arg, Packet};

/// Encode a packet into a single UDP datagram
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let message = OscMessage {
        addr: packet.address.clone(),
        args: packet.args.iter().map(to_osc).collect(),
    };
    rosc::encoder::encode(&OscPacket::Message(message))
        .map_err(|e| ProtocolError::Encode(format!("{:?}", e)))
}

/// Decode one UDP datagram into the packets it carries
///
/// Bundles are flattened in order; their time tags are ignored.
pub fn decode(datagram: &[u8]) -> Result<Vec<Packet>, ProtocolError> {
    let (_, packet) = rosc::decoder::decode_udp(datagram)
        .map_err(|e| ProtocolError::Decode(format!("{:?}", e)))?;

    let mut packets = Vec::new();
    flatten(packet, &mut packets)?;
    Ok(packets)
}

fn flatten(packet: OscPacket, out: &mut Vec<Packet>) -> Result<(), ProtocolError> {
    match packet {
        OscPacket::Message(message) => {
            let args = message
                .args
                .into_iter()
                .map(from_osc)
                .collect::<Result<Vec<_>, _>>()?;
            out.push(Packet {
                address: message.addr,
                args,
            });
        }
        OscPacket::Bundle(bundle) => {
            trace!("Flattening bundle of {} packets", bundle.content.len());
            for inner in bundle.content {
                flatten(inner, out)?;
            }
        }
    }
    Ok(())
}

fn to_osc(arg: &Arg) -> OscType {
    match arg {
        Arg::Int(n) => OscType::Int(*n),
        Arg::Long(n) => OscType::Long(*n),
        Arg::Float(n) => OscType::Float(*n),
        Arg::Double(n) => OscType::Double(*n),
        Arg::Str(s) => OscType::String(s.clone()),
        Arg::Bool(b) => OscType::Bool(*b),
        Arg::Blob(bytes) => OscType::Blob(bytes.clone()),
        Arg::Nil => OscType::Nil,
    }
}

fn from_osc(arg: OscType) -> Result<Arg, ProtocolError> {
    match arg {
        OscType::Int(n) => Ok(Arg::Int(n)),
        OscType::Long(n) => Ok(Arg::Long(n)),
        OscType::Float(n) => Ok(Arg::Float(n)),
        OscType::Double(n) => Ok(Arg::Double(n)),
        OscType::String(s) => Ok(Arg::Str(s)),
        OscType::Char(c) => Ok(Arg::Str(c.to_string())),
        OscType::Bool(b) => Ok(Arg::Bool(b)),
        OscType::Blob(bytes) => Ok(Arg::Blob(bytes)),
        OscType::Nil | OscType::Inf => Ok(Arg::Nil),
        other => Err(ProtocolError::UnsupportedArgument(format!("{:?}", other))),
    }
}
