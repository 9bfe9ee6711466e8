//! Error taxonomy for the synchronization engine and input router
//!
//! None of these are fatal. Transport errors drop the current flush, routing
//! errors drop the event, encoding errors clamp the value.

use thiserror::Error;

/// A transport write failed
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI send failed: {0}")]
    Midi(String),

    #[error("OSC encoding failed: {0}")]
    Osc(String),

    #[error("transport not connected")]
    Disconnected,
}

/// An inbound event could not be routed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("message too short ({0} bytes)")]
    Malformed(usize),

    #[error("unsupported status byte 0x{0:02X}")]
    Unsupported(u8),

    #[error("shift control reported velocity {0} (expected 0 or 127)")]
    ShiftVelocity(u8),

    #[error("no handler for {control} in view {view}")]
    UnknownControl { view: String, control: String },
}

/// A value is outside what the wire format can represent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("value {value} outside {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },
}

impl EncodingError {
    /// The nearest representable value
    pub fn clamped(&self) -> i64 {
        match *self {
            EncodingError::OutOfRange { value, min, max } => value.clamp(min, max),
        }
    }
}

/// An inbound OSC message does not describe a model update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown address {0}")]
    UnknownAddress(String),

    #[error("bad arguments for {0}")]
    BadArguments(String),
}
