//! Address + argument packets
//!
//! A [`Packet`] is the unit the transport moves: one OSC address and its
//! arguments. Bundles are flattened by the codec before they get here.

use std::fmt;

use crate::category::DeviceId;

/// A single packet argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// String
    Str(String),
    /// Boolean
    Bool(bool),
    /// Opaque bytes
    Blob(Vec<u8>),
    /// Explicit empty value
    Nil,
}

impl Arg {
    /// String content, if this is a string argument
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, accepting integral floats and numeric strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Arg::Int(n) => Some(i64::from(*n)),
            Arg::Long(n) => Some(*n),
            Arg::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Arg::Double(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Arg::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret this argument as a console object id
    ///
    /// Integral floats lose their fraction (`5.0` becomes `"5"`), other
    /// floats keep it (`2.5` stays `"2.5"`).
    pub fn to_device_id(&self) -> Option<DeviceId> {
        match self {
            Arg::Int(n) => Some(DeviceId::new(n.to_string())),
            Arg::Long(n) => Some(DeviceId::new(n.to_string())),
            Arg::Float(f) if f.is_finite() => Some(DeviceId::new(if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            })),
            Arg::Double(f) if f.is_finite() => Some(DeviceId::new(if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            })),
            Arg::Str(s) if !s.trim().is_empty() => Some(DeviceId::new(s.trim())),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(n) => write!(f, "{}", n),
            Arg::Long(n) => write!(f, "{}", n),
            Arg::Float(n) => write!(f, "{}", n),
            Arg::Double(n) => write!(f, "{}", n),
            Arg::Str(s) => write!(f, "{:?}", s),
            Arg::Bool(b) => write!(f, "{}", b),
            Arg::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Arg::Nil => f.write_str("nil"),
        }
    }
}

impl From<i32> for Arg {
    fn from(n: i32) -> Self {
        Arg::Int(n)
    }
}

impl From<f32> for Arg {
    fn from(n: f32) -> Self {
        Arg::Float(n)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Bool(b)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

/// One address and its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Slash-separated address
    pub address: String,
    /// Arguments in wire order
    pub args: Vec<Arg>,
}

impl Packet {
    /// Create a packet with no arguments
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Address split on `/`; index 0 is the empty string before the leading slash
    pub fn segments(&self) -> Vec<&str> {
        self.address.split('/').collect()
    }

    /// Whether the packet carries any arguments
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_offsets() {
        let packet = Packet::new("/eos/out/get/group/5/list/0/3");
        let segments = packet.segments();
        assert_eq!(segments[0], "");
        assert_eq!(segments[4], "group");
        assert_eq!(segments[5], "5");
        assert_eq!(segments[6], "list");
    }

    #[test]
    fn test_arg_integer_coercion() {
        assert_eq!(Arg::Int(4).as_i64(), Some(4));
        assert_eq!(Arg::Float(3.0).as_i64(), Some(3));
        assert_eq!(Arg::Float(3.5).as_i64(), None);
        assert_eq!(Arg::from(" 12 ").as_i64(), Some(12));
        assert_eq!(Arg::Nil.as_i64(), None);
    }

    #[test]
    fn test_arg_device_id() {
        assert_eq!(Arg::Int(7).to_device_id(), Some(DeviceId::from("7")));
        assert_eq!(Arg::Float(5.0).to_device_id(), Some(DeviceId::from("5")));
        assert_eq!(Arg::Float(2.5).to_device_id(), Some(DeviceId::from("2.5")));
        assert_eq!(Arg::from("").to_device_id(), None);
    }

    #[test]
    fn test_packet_display() {
        let packet = Packet::new("/ch/01/mix/02/on").with_arg(1);
        assert_eq!(packet.to_string(), "/ch/01/mix/02/on 1");
        let packet = Packet::new("/eos/cmd").with_arg("Group 1 Preset 2#");
        assert_eq!(packet.to_string(), "/eos/cmd \"Group 1 Preset 2#\"");
    }
}
