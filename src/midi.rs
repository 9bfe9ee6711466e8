//! Inbound MIDI message parsing
//!
//! Only the channel messages a control surface produces are modelled. Everything
//! else is reported as unsupported and dropped by the router.

use crate::error::RoutingError;
use std::fmt;

/// Velocity a button reports while pressed
pub const VELOCITY_PRESSED: u8 = 127;

/// Velocity a button reports when released
pub const VELOCITY_RELEASED: u8 = 0;

/// Channel messages sent by the surfaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// System Exclusive payload without the F0/F7 framing
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse one complete message.
    ///
    /// Note On with velocity 0 is reported as Note Off, as surfaces use both
    /// forms for a release.
    pub fn parse(data: &[u8]) -> Result<Self, RoutingError> {
        let Some(&status) = data.first() else {
            return Err(RoutingError::Malformed(0));
        };

        // Running status is never sent by the supported devices
        if status < 0x80 {
            return Err(RoutingError::Unsupported(status));
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 | 0x90 | 0xB0 if data.len() < 3 => Err(RoutingError::Malformed(data.len())),
            0x80 => Ok(MidiMessage::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            0x90 => {
                let note = data[1] & 0x7F;
                let velocity = data[2] & 0x7F;
                if velocity == 0 {
                    Ok(MidiMessage::NoteOff { channel, note, velocity })
                } else {
                    Ok(MidiMessage::NoteOn { channel, note, velocity })
                }
            }
            0xB0 => Ok(MidiMessage::ControlChange {
                channel,
                cc: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            0xF0 if status == 0xF0 => match data.iter().position(|&b| b == 0xF7) {
                Some(end) => Ok(MidiMessage::SysEx {
                    data: data[1..end].to_vec(),
                }),
                None => Err(RoutingError::Malformed(data.len())),
            },
            _ => Err(RoutingError::Unsupported(status)),
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::SysEx { ref data } => {
                let mut bytes = Vec::with_capacity(data.len() + 2);
                bytes.push(0xF0);
                bytes.extend_from_slice(data);
                bytes.push(0xF7);
                bytes
            }
        }
    }

    /// Channel (0-15), None for SysEx
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::ControlChange { channel, .. } => Some(channel),
            MidiMessage::SysEx { .. } => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// 7-bit value as a unit-range float
pub fn to_unit(value: u8) -> f64 {
    f64::from(value & 0x7F) / 127.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let msg = MidiMessage::parse(&[0x92, 7, 127]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 2,
                note: 7,
                velocity: 127,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_release() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            }
        );
    }

    #[test]
    fn test_control_change() {
        let msg = MidiMessage::parse(&[0xB2, 21, 100]).unwrap();
        assert_eq!(msg.channel(), Some(2));
        assert_eq!(msg.to_string(), "CC ch:3 cc:21 v:100");
    }

    #[test]
    fn test_short_message_is_malformed() {
        assert_eq!(MidiMessage::parse(&[]), Err(RoutingError::Malformed(0)));
        assert_eq!(MidiMessage::parse(&[0x90, 60]), Err(RoutingError::Malformed(2)));
        assert_eq!(
            MidiMessage::parse(&[0xF0, 0x00, 0x20]),
            Err(RoutingError::Malformed(3))
        );
    }

    #[test]
    fn test_unsupported_status() {
        assert_eq!(
            MidiMessage::parse(&[0xE0, 0x00, 0x40]),
            Err(RoutingError::Unsupported(0xE0))
        );
        assert_eq!(MidiMessage::parse(&[0xF8]), Err(RoutingError::Unsupported(0xF8)));
        assert_eq!(MidiMessage::parse(&[0x40, 1]), Err(RoutingError::Unsupported(0x40)));
    }

    #[test]
    fn test_sysex_roundtrip_framing() {
        let raw = [0xF0, 0x00, 0x20, 0x29, 0xF7];
        let msg = MidiMessage::parse(&raw).unwrap();
        assert_eq!(msg.channel(), None);
        assert_eq!(msg.encode(), raw.to_vec());
    }

    #[test]
    fn test_to_unit() {
        assert_eq!(to_unit(0), 0.0);
        assert_eq!(to_unit(127), 1.0);
    }
}
