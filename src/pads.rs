//! Pad LED grid
//!
//! Pads are addressed by their note number. The firmware lights a pad on its
//! own when it is hit, so the router asks for a forced retransmission shortly
//! after note-off (see [`crate::scheduler`]).

use crate::cache::SurfaceValue;
use crate::error::TransportError;
use crate::scheduler::ResyncTarget;
use crate::wire::format_hex;
use crate::wire::sysex;
use crate::writer::{DifferentialWriter, Encoder, TransportSink};
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// SysEx id of the first pad
pub const FIRST_PAD_ID: u8 = 0x70;

/// BeatStep pad color encoder
#[derive(Debug, Clone)]
pub struct PadEncoder {
    first_note: u8,
}

impl PadEncoder {
    pub fn new(first_note: u8) -> Self {
        Self { first_note }
    }

    fn pad_id(&self, note: u8) -> u8 {
        FIRST_PAD_ID + note.saturating_sub(self.first_note)
    }
}

impl Encoder for PadEncoder {
    type Coord = u8;
    type Frame = Vec<u8>;

    fn encode(&self, note: &u8, value: &SurfaceValue) -> Vec<u8> {
        let color = value.as_integer().unwrap_or(0);
        sysex::pad_color(self.pad_id(*note), color)
    }

    fn describe(&self, frame: &Vec<u8>) -> String {
        format_hex(frame)
    }
}

/// Differential writer for the pad LEDs
pub struct PadGrid {
    notes: RangeInclusive<u8>,
    writer: DifferentialWriter<PadEncoder>,
}

impl PadGrid {
    pub fn new(notes: RangeInclusive<u8>) -> Self {
        let capacity = notes.clone().count();
        let writer = DifferentialWriter::new("pads", PadEncoder::new(*notes.start()), capacity);
        Self { notes, writer }
    }

    pub fn notes(&self) -> &RangeInclusive<u8> {
        &self.notes
    }

    pub fn writer(&self) -> &DifferentialWriter<PadEncoder> {
        &self.writer
    }

    /// Light a pad with a palette color
    pub fn set_color(&self, note: u8, color: i32) -> bool {
        if !self.notes.contains(&note) {
            warn!("Pad note {} outside {:?}, ignored", note, self.notes);
            return false;
        }
        self.writer
            .update(note, SurfaceValue::ColorIndex(color), false)
    }

    /// Dump `color` to every pad in the range, whatever the cache holds
    pub fn fill(&self, color: i32) -> usize {
        self.notes
            .clone()
            .filter(|note| {
                self.writer
                    .update(*note, SurfaceValue::ColorIndex(color), true)
            })
            .count()
    }

    /// Queue the cached color of one pad again
    pub fn force_flush(&self, note: u8) -> bool {
        self.writer.refresh(&note)
    }

    /// Queue the cached color of every pad again
    pub fn force_flush_all(&self) -> usize {
        self.writer.refresh_all()
    }

    /// Apply a due deferred task
    pub fn apply(&self, target: ResyncTarget) {
        match target {
            ResyncTarget::Pad(note) => {
                if !self.force_flush(note) {
                    debug!("Pad {} has no cached color yet", note);
                }
            }
            ResyncTarget::AllPads => {
                let count = self.force_flush_all();
                debug!("Redrawing {} pads", count);
            }
        }
    }

    pub fn flush(&self, sink: &dyn TransportSink<Vec<u8>>) -> Result<usize, TransportError> {
        self.writer.flush(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl TransportSink<Vec<u8>> for CaptureSink {
        fn transmit(&self, frames: &[Vec<u8>]) -> Result<(), TransportError> {
            self.frames.lock().extend_from_slice(frames);
            Ok(())
        }
    }

    #[test]
    fn test_pad_ids_follow_note_range() {
        let pads = PadGrid::new(36..=51);
        let sink = CaptureSink::default();
        pads.set_color(36, 1);
        pads.set_color(51, 2);
        pads.flush(&sink).unwrap();

        let frames = sink.frames.lock().clone();
        assert_eq!(frames[0], sysex::pad_color(0x70, 1));
        assert_eq!(frames[1], sysex::pad_color(0x7F, 2));
    }

    #[test]
    fn test_outside_range_is_ignored() {
        let pads = PadGrid::new(36..=51);
        assert!(!pads.set_color(52, 1));
        assert_eq!(pads.writer().pending_len(), 0);
    }

    #[test]
    fn test_apply_resync_targets() {
        let pads = PadGrid::new(36..=51);
        let sink = CaptureSink::default();
        pads.set_color(40, 3);
        pads.set_color(41, 4);
        pads.flush(&sink).unwrap();

        pads.apply(ResyncTarget::Pad(40));
        assert_eq!(pads.writer().pending_len(), 1);
        pads.apply(ResyncTarget::Pad(45));
        assert_eq!(pads.writer().pending_len(), 1, "uncached pad is skipped");

        pads.apply(ResyncTarget::AllPads);
        assert_eq!(pads.writer().pending_len(), 3);

        pads.flush(&sink).unwrap();
        let frames = sink.frames.lock().clone();
        assert_eq!(frames[2], sysex::pad_color(0x74, 3));
    }

    #[test]
    fn test_stale_resync_is_harmless() {
        let pads = PadGrid::new(36..=51);
        let sink = CaptureSink::default();
        pads.set_color(40, 3);
        pads.flush(&sink).unwrap();

        // Color changed before the deferred task fired
        pads.set_color(40, 7);
        pads.apply(ResyncTarget::Pad(40));
        pads.flush(&sink).unwrap();

        let frames = sink.frames.lock().clone();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], sysex::pad_color(0x74, 7));
    }

    struct FailingSink;

    impl TransportSink<Vec<u8>> for FailingSink {
        fn transmit(&self, _frames: &[Vec<u8>]) -> Result<(), TransportError> {
            Err(TransportError::Disconnected)
        }
    }

    #[test]
    fn test_fill_dumps_every_pad() {
        let pads = PadGrid::new(36..=51);
        pads.set_color(40, 0);
        assert!(pads.flush(&FailingSink).is_err());

        let sink = CaptureSink::default();
        assert_eq!(pads.fill(0), 16);
        pads.flush(&sink).unwrap();

        let frames = sink.frames.lock().clone();
        assert_eq!(frames.len(), 16);
        assert!(frames.contains(&sysex::pad_color(0x74, 0)));
        assert_eq!(pads.writer().cached(&51), Some(SurfaceValue::ColorIndex(0)));
    }
}
