//! SL MkIII screen driver
//!
//! Four text rows of nine cells, plus per-position color and value
//! properties and RGB fader LEDs, all addressed through SysEx property
//! commands. The device cannot be queried, so every property is diffed
//! against the writer's cache.

use super::{Geometry, TextGrid};
use crate::cache::SurfaceValue;
use crate::error::TransportError;
use crate::wire::format_hex;
use crate::wire::sysex::{self, Property, ScreenLayout};
use crate::writer::{DifferentialWriter, Encoder, TransportSink};
use tracing::{debug, info};

/// Color index used to hide elements
pub const BLACK: i32 = 0;

/// First fader LED index
pub const FADER_LED_1: u8 = 0x36;

/// Number of fader LEDs
pub const FADER_LED_COUNT: u8 = 8;

/// Addressable element of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayCoord {
    Property { kind: Property, h: u8, v: u8 },
    Led(u8),
}

impl DisplayCoord {
    pub fn text(h: u8, v: u8) -> Self {
        DisplayCoord::Property {
            kind: Property::Text,
            h,
            v,
        }
    }

    pub fn color(h: u8, v: u8) -> Self {
        DisplayCoord::Property {
            kind: Property::Color,
            h,
            v,
        }
    }

    pub fn value(h: u8, v: u8) -> Self {
        DisplayCoord::Property {
            kind: Property::Value,
            h,
            v,
        }
    }
}

/// SysEx encoder for the SL MkIII property protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyEncoder;

impl Encoder for PropertyEncoder {
    type Coord = DisplayCoord;
    type Frame = Vec<u8>;

    fn encode(&self, coord: &DisplayCoord, value: &SurfaceValue) -> Vec<u8> {
        match (*coord, value) {
            (DisplayCoord::Property { kind: Property::Text, h, v }, value) => {
                let text = match value {
                    SurfaceValue::Text(s) => s.clone(),
                    other => other.to_string(),
                };
                sysex::property_text(h, v, &text)
            }
            (DisplayCoord::Property { kind, h, v }, value) => {
                let n = value.as_integer().unwrap_or(0);
                sysex::property(kind, h, v, &[sysex::clamped_data_byte(n)])
            }
            (DisplayCoord::Led(led), SurfaceValue::Rgb(r, g, b)) => sysex::led_rgb(led, *r, *g, *b),
            (DisplayCoord::Led(led), _) => sysex::led_rgb(led, 0, 0, 0),
        }
    }

    fn describe(&self, frame: &Vec<u8>) -> String {
        format_hex(frame)
    }
}

/// Text grid plus differential SysEx writer for one screen
pub struct PropertyDisplay {
    grid: TextGrid,
    writer: DifferentialWriter<PropertyEncoder>,
}

impl PropertyDisplay {
    pub fn new(geometry: Geometry) -> Self {
        // text cells + color/value properties + LEDs
        let capacity = geometry.cell_count() * 3 + FADER_LED_COUNT as usize;
        Self {
            grid: TextGrid::new(geometry),
            writer: DifferentialWriter::new("display", PropertyEncoder, capacity),
        }
    }

    pub fn grid(&self) -> &TextGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut TextGrid {
        &mut self.grid
    }

    pub fn writer(&self) -> &DifferentialWriter<PropertyEncoder> {
        &self.writer
    }

    /// Set a color property (index 0-127)
    pub fn set_color(&self, h_position: u8, v_position: u8, color: i32) -> bool {
        self.writer.update(
            DisplayCoord::color(h_position, v_position),
            SurfaceValue::ColorIndex(color),
            false,
        )
    }

    /// Set a value property (turns the bottom box on/off)
    pub fn set_value(&self, h_position: u8, v_position: u8, value: i64) -> bool {
        self.writer.update(
            DisplayCoord::value(h_position, v_position),
            SurfaceValue::Numeric(value),
            false,
        )
    }

    /// Set one of the fader LEDs from a brightness and a unit-range RGB color
    pub fn set_fader_led(&self, led: u8, hue: f64, color: [f64; 3]) -> bool {
        let rgb = SurfaceValue::Rgb(
            sysex::scale_component(hue, color[0]),
            sysex::scale_component(hue, color[1]),
            sysex::scale_component(hue, color[2]),
        );
        self.writer.update(DisplayCoord::Led(led), rgb, false)
    }

    /// Switch the screen layout.
    ///
    /// The device resets its screen, so the layout frame is followed by every
    /// cached color, value and LED, and the whole text grid goes out again on
    /// the next flush.
    pub fn set_layout(&self, layout: ScreenLayout) {
        info!("Display layout -> {:?}", layout);
        let properties = self.cached_properties();
        self.writer.invalidate();
        self.writer.enqueue_uncached(sysex::layout(layout));
        for (coord, value) in properties {
            self.writer.update(coord, value, true);
        }
    }

    /// Show a transient popup message
    pub fn notify(&self, text: &str) {
        self.writer.enqueue_uncached(sysex::notification(text));
    }

    /// Queue every text cell that differs from what the device shows
    pub fn queue_text(&self, dump: bool) -> usize {
        self.grid
            .iter()
            .filter(|((row, cell), text)| {
                self.writer.update(
                    DisplayCoord::text(*cell as u8, *row as u8),
                    SurfaceValue::Text((*text).to_string()),
                    dump,
                )
            })
            .count()
    }

    /// Diff the text grid and transmit everything queued
    pub fn flush(&self, sink: &dyn TransportSink<Vec<u8>>) -> Result<usize, TransportError> {
        self.queue_text(false);
        self.writer.flush(sink)
    }

    /// Retransmit every property, LED and text cell in one flush
    pub fn resync(&self, sink: &dyn TransportSink<Vec<u8>>) -> Result<usize, TransportError> {
        let mut values = self.cached_properties();
        values.extend(self.text_values());
        debug!("Display resync: {} properties", values.len());
        self.writer.resync(values, sink)
    }

    /// Blank all elements and ask the user to start the host again.
    ///
    /// Everything is dumped: the cache may hold values from a failed flush.
    pub fn shutdown(
        &mut self,
        host_name: &str,
        sink: &dyn TransportSink<Vec<u8>>,
    ) -> Result<usize, TransportError> {
        let mut values = Vec::new();
        for h in 0..=8 {
            for v in 0..=2 {
                values.push((DisplayCoord::color(h, v), SurfaceValue::ColorIndex(BLACK)));
            }
            values.push((DisplayCoord::value(h, 1), SurfaceValue::Numeric(0)));
        }
        for led in 0..FADER_LED_COUNT {
            values.push((DisplayCoord::Led(FADER_LED_1 + led), SurfaceValue::Rgb(0, 0, 0)));
        }

        self.grid
            .clear()
            .set_cell(1, 2, "Please")
            .set_cell(1, 3, "start")
            .set_cell(1, 4, &format!("{}...", host_name));
        values.extend(self.text_values());
        self.writer.resync(values, sink)
    }

    fn cached_properties(&self) -> Vec<(DisplayCoord, SurfaceValue)> {
        self.writer
            .cached_entries()
            .into_iter()
            .filter(|(coord, _)| {
                !matches!(coord, DisplayCoord::Property { kind: Property::Text, .. })
            })
            .collect()
    }

    fn text_values(&self) -> Vec<(DisplayCoord, SurfaceValue)> {
        self.grid
            .iter()
            .map(|((row, cell), text)| {
                (
                    DisplayCoord::text(cell as u8, row as u8),
                    SurfaceValue::Text(text.to_string()),
                )
            })
            .collect()
    }
}
