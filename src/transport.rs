//! MIDI transport
//!
//! Ports are found by case-insensitive substring match on their names. The
//! input callback runs on a midir thread and forwards raw bytes into a bounded
//! tokio channel; the router is the only consumer. Output goes through
//! [`MidiSink`], one `send` per SysEx frame.

use crate::error::TransportError;
use crate::wire::format_hex;
use crate::writer::TransportSink;
use anyhow::{anyhow, Context, Result};
use midir::{MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

const CLIENT_NAME: &str = "Surface-Sync";

/// Raw message received from a surface
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub timestamp: Instant,
    pub raw: Vec<u8>,
}

/// Shared handle to an output port
#[derive(Clone)]
pub struct MidiSink {
    port_name: String,
    conn: Arc<Mutex<MidiOutputConnection>>,
}

impl MidiSink {
    /// Connect to the first output port whose name contains `pattern`
    pub fn open(pattern: &str) -> Result<Self> {
        let midi_out =
            MidiOutput::new(&format!("{}-Output", CLIENT_NAME)).context("Failed to create MIDI output")?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (port, port_name) = find_port(&midi_out, pattern)
            .ok_or_else(|| anyhow!("Output port '{}' not found", pattern))?;

        info!("Connecting to output port: {}", port_name);
        let conn = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", port_name, e))?;

        Ok(Self {
            port_name,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn send_frame(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.conn
            .lock()
            .send(bytes)
            .map_err(|e| TransportError::Midi(e.to_string()))?;
        trace!("Sent: {}", format_hex(bytes));
        Ok(())
    }
}

impl TransportSink<Vec<u8>> for MidiSink {
    fn transmit(&self, frames: &[Vec<u8>]) -> Result<(), TransportError> {
        for frame in frames {
            self.send_frame(frame)?;
        }
        Ok(())
    }
}

/// Connect the input port matching `pattern`; events are sent on `tx`.
///
/// The connection closes when the returned value is dropped.
pub fn open_input(pattern: &str, tx: mpsc::Sender<InboundEvent>) -> Result<MidiInputConnection<()>> {
    let mut midi_in =
        MidiInput::new(&format!("{}-Input", CLIENT_NAME)).context("Failed to create MIDI input")?;
    // SysEx replies are wanted; clock and active sensing are not
    midi_in.ignore(midir::Ignore::TimeAndActiveSense);
    debug!("Found {} MIDI input ports", midi_in.port_count());

    let (port, port_name) = find_port(&midi_in, pattern)
        .ok_or_else(|| anyhow!("Input port '{}' not found", pattern))?;

    info!("Connecting to input port: {}", port_name);
    midi_in
        .connect(
            &port,
            CLIENT_NAME,
            move |_stamp, data, _| {
                let event = InboundEvent {
                    timestamp: Instant::now(),
                    raw: data.to_vec(),
                };
                // Never block the driver thread
                if tx.try_send(event).is_err() {
                    warn!("Inbound queue full, dropped {}", format_hex(data));
                }
            },
            (),
        )
        .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", port_name, e))
}

/// Case-insensitive substring match
pub fn port_matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

fn find_port<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if port_matches(&name, pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

/// Names of all input and output ports
pub fn list_ports() -> Result<(Vec<String>, Vec<String>)> {
    let midi_in = MidiInput::new(&format!("{}-Scanner", CLIENT_NAME))?;
    let midi_out = MidiOutput::new(&format!("{}-Scanner", CLIENT_NAME))?;
    Ok((port_names(&midi_in), port_names(&midi_out)))
}

pub fn print_ports() -> Result<()> {
    let (inputs, outputs) = list_ports()?;

    println!("\n=== MIDI Input Ports ===");
    for (i, name) in inputs.iter().enumerate() {
        println!("  {}: {}", i, name);
    }

    println!("\n=== MIDI Output Ports ===");
    for (i, name) in outputs.iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_matching_ignores_case() {
        assert!(port_matches("Novation SL MkIII MIDI", "sl mkiii"));
        assert!(port_matches("Arturia BeatStep Pro", "BEATSTEP"));
        assert!(!port_matches("loopMIDI Port", "beatstep"));
    }

    #[test]
    fn test_port_listing_does_not_panic() {
        // No MIDI backend on CI machines is fine
        let _ = list_ports();
    }
}
