//! OSC surface - differential writer keyed by address
//!
//! Values are diffed per address (or per explicit cache key) and the pending
//! messages of a flush go out as one immediate bundle through [`OscClient`].

pub mod client;
pub mod listener;

pub use client::OscClient;
pub use listener::spawn_listener;

use crate::cache::SurfaceValue;
use crate::error::TransportError;
use crate::wire::osc as codec;
use crate::writer::{DifferentialWriter, Encoder, TransportSink};
use rosc::OscMessage;
use std::collections::HashSet;

/// Encodes `(address, value)` into an OSC message
#[derive(Debug, Clone, Default)]
pub struct OscEncoder {
    heartbeats: HashSet<String>,
}

impl OscEncoder {
    /// `heartbeats` are addresses hidden from output logging
    pub fn new<I, S>(heartbeats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            heartbeats: heartbeats.into_iter().map(Into::into).collect(),
        }
    }
}

impl Encoder for OscEncoder {
    type Coord = String;
    type Frame = OscMessage;

    fn encode(&self, address: &String, value: &SurfaceValue) -> OscMessage {
        codec::message(address, value)
    }

    fn describe(&self, frame: &OscMessage) -> String {
        codec::describe(frame)
    }

    fn is_heartbeat(&self, frame: &OscMessage) -> bool {
        self.heartbeats.contains(&frame.addr)
    }
}

/// Typed sends on top of the differential writer
pub struct OscWriter {
    writer: DifferentialWriter<OscEncoder>,
}

impl OscWriter {
    pub fn new(encoder: OscEncoder, log_output: bool) -> Self {
        Self {
            writer: DifferentialWriter::new("osc", encoder, 256).with_output_logging(log_output),
        }
    }

    pub fn writer(&self) -> &DifferentialWriter<OscEncoder> {
        &self.writer
    }

    pub fn send_bool(&self, address: &str, value: bool, dump: bool) -> bool {
        self.send(address, SurfaceValue::Bool(value), dump)
    }

    pub fn send_int(&self, address: &str, value: i64, dump: bool) -> bool {
        self.send(address, SurfaceValue::Numeric(value), dump)
    }

    pub fn send_float(&self, address: &str, value: f64, dump: bool) -> bool {
        self.send(address, SurfaceValue::Float(value), dump)
    }

    pub fn send_str(&self, address: &str, value: &str, dump: bool) -> bool {
        self.send(address, SurfaceValue::Text(value.to_string()), dump)
    }

    pub fn send_ints(&self, address: &str, values: &[i32], dump: bool) -> bool {
        let list = values.iter().map(|&v| SurfaceValue::ColorIndex(v)).collect();
        self.send(address, SurfaceValue::List(list), dump)
    }

    /// Send a unit-range color as `rgb(r,g,b)`
    pub fn send_color(&self, address: &str, red: f64, green: f64, blue: f64, dump: bool) -> bool {
        let (r, g, b) = codec::unit_rgb(red, green, blue);
        self.send(address, SurfaceValue::Rgb(r, g, b), dump)
    }

    /// Cache under `cache_key` with `test_value`, but send `value` to `address`
    pub fn send_keyed(
        &self,
        cache_key: &str,
        address: &str,
        test_value: SurfaceValue,
        value: &SurfaceValue,
        dump: bool,
    ) -> bool {
        self.writer
            .update_keyed(cache_key.to_string(), test_value, dump, || {
                codec::message(address, value)
            })
    }

    /// Dump one message and flush right away
    pub fn fast_send(
        &self,
        address: &str,
        values: &[i32],
        sink: &dyn TransportSink<OscMessage>,
    ) -> Result<usize, TransportError> {
        self.send_ints(address, values, true);
        self.flush(sink)
    }

    pub fn flush(&self, sink: &dyn TransportSink<OscMessage>) -> Result<usize, TransportError> {
        self.writer.flush(sink)
    }

    fn send(&self, address: &str, value: SurfaceValue, dump: bool) -> bool {
        self.writer.update(address.to_string(), value, dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ErrorReporter;
    use parking_lot::Mutex;
    use rosc::OscType;
    use std::sync::Arc;

    #[derive(Default)]
    struct CaptureSink {
        batches: Mutex<Vec<Vec<OscMessage>>>,
    }

    impl TransportSink<OscMessage> for CaptureSink {
        fn transmit(&self, frames: &[OscMessage]) -> Result<(), TransportError> {
            self.batches.lock().push(frames.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct LogCapture {
        lines: Mutex<Vec<String>>,
    }

    impl ErrorReporter for LogCapture {
        fn report_error(&self, message: &str, _cause: &dyn std::error::Error) {
            self.lines.lock().push(format!("error: {}", message));
        }

        fn trace(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
    }

    #[test]
    fn test_typed_sends_are_diffed() {
        let osc = OscWriter::new(OscEncoder::default(), false);
        assert!(osc.send_bool("/play", true, false));
        assert!(!osc.send_bool("/play", true, false));
        assert!(osc.send_float("/tempo", 120.0, false));
        assert!(!osc.send_float("/tempo", 120.0, false));
        assert!(osc.send_str("/track/1/name", "Bass", false));
        assert!(osc.send_str("/track/1/name", "Bass", true));
        assert_eq!(osc.writer().pending_len(), 4);
    }

    #[test]
    fn test_message_arguments() {
        let osc = OscWriter::new(OscEncoder::default(), false);
        let sink = CaptureSink::default();
        osc.send_bool("/play", true, false);
        osc.send_color("/track/1/color", 1.0, 0.5, 0.0, false);
        osc.send_int("/track/1/volume", 99, false);
        osc.flush(&sink).unwrap();

        let batch = sink.batches.lock()[0].clone();
        assert_eq!(batch[0].args, vec![OscType::Int(1)]);
        assert_eq!(batch[1].args, vec![OscType::String("rgb(255,128,0)".into())]);
        assert_eq!(batch[2].args, vec![OscType::Int(99)]);
    }

    #[test]
    fn test_int_lists_compare_structurally() {
        let osc = OscWriter::new(OscEncoder::default(), false);
        assert!(osc.send_ints("/vu", &[1, 2], false));
        assert!(!osc.send_ints("/vu", &[1, 2], false));
        assert!(osc.send_ints("/vu", &[1, 2, 3], false));
    }

    #[test]
    fn test_send_keyed_caches_under_key() {
        let osc = OscWriter::new(OscEncoder::default(), false);
        let sink = CaptureSink::default();
        let value = SurfaceValue::Text("Kick".into());

        assert!(osc.send_keyed("/track/1/name#bank0", "/track/1/name", 0i64.into(), &value, false));
        assert!(!osc.send_keyed("/track/1/name#bank0", "/track/1/name", 0i64.into(), &value, false));
        osc.flush(&sink).unwrap();

        let batch = sink.batches.lock()[0].clone();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].addr, "/track/1/name");
        assert!(osc.writer().cached(&"/track/1/name".to_string()).is_none());
    }

    #[test]
    fn test_fast_send_flushes_immediately() {
        let osc = OscWriter::new(OscEncoder::default(), false);
        let sink = CaptureSink::default();

        assert_eq!(osc.fast_send("/pad/36", &[127], &sink).unwrap(), 1);
        assert_eq!(osc.fast_send("/pad/36", &[127], &sink).unwrap(), 1);
        assert_eq!(sink.batches.lock().len(), 2);
    }

    #[test]
    fn test_output_logging_skips_heartbeats() {
        let log = Arc::new(LogCapture::default());
        let osc = OscWriter {
            writer: DifferentialWriter::new("osc", OscEncoder::new(["/beat/str"]), 8)
                .with_output_logging(true)
                .with_reporter(log.clone()),
        };
        let sink = CaptureSink::default();

        osc.send_str("/beat/str", "1.1.1", false);
        osc.send_ints("/track/1/vu", &[64, 60], false);
        osc.flush(&sink).unwrap();

        assert_eq!(
            log.lines.lock().clone(),
            vec!["Sending: /track/1/vu [ 64, 60 ]".to_string()]
        );
        assert_eq!(sink.batches.lock()[0].len(), 2);
    }
}
