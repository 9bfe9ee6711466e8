//! Host-side model updates
//!
//! The host drives the surfaces by sending OSC messages to the gateway. Each
//! message is decoded into a [`ModelUpdate`] which the main loop applies to
//! the display and pad writers.
//!
//! | address                        | arguments             |
//! |--------------------------------|-----------------------|
//! | `/display/{row}/{cell}`        | text or number        |
//! | `/display/{row}/block/{n}`     | text                  |
//! | `/display/color/{h}/{v}`       | palette index         |
//! | `/display/value/{h}/{v}`       | number                |
//! | `/pad/{note}/color`            | palette index         |
//! | `/led/{n}/rgb`                 | r g b (0-1) [bright]  |
//! | `/layout`                      | `empty`/`knob`/`box`  |

use crate::display::sysex::{FADER_LED_1, FADER_LED_COUNT};
use crate::display::PropertyDisplay;
use crate::error::ModelError;
use crate::pads::PadGrid;
use crate::wire::sysex::ScreenLayout;
use rosc::{OscMessage, OscType};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelUpdate {
    Cell { row: usize, cell: usize, text: String },
    Block { row: usize, block: usize, text: String },
    Color { h: u8, v: u8, color: i32 },
    Value { h: u8, v: u8, value: i64 },
    PadColor { note: u8, color: i32 },
    /// `led` is the device LED index
    FaderLed { led: u8, brightness: f64, rgb: [f64; 3] },
    Layout(ScreenLayout),
}

impl ModelUpdate {
    pub fn from_osc(message: &OscMessage) -> Result<Self, ModelError> {
        let parts: Vec<&str> = message.addr.trim_start_matches('/').split('/').collect();
        let unknown = || ModelError::UnknownAddress(message.addr.clone());
        let bad = || ModelError::BadArguments(message.addr.clone());
        let args = &message.args;

        match parts.as_slice() {
            ["display", "color", h, v] => Ok(ModelUpdate::Color {
                h: index(h).ok_or_else(unknown)?,
                v: index(v).ok_or_else(unknown)?,
                color: saturate(first_int(args).ok_or_else(bad)?),
            }),
            ["display", "value", h, v] => Ok(ModelUpdate::Value {
                h: index(h).ok_or_else(unknown)?,
                v: index(v).ok_or_else(unknown)?,
                value: first_int(args).ok_or_else(bad)?,
            }),
            ["display", row, "block", block] => Ok(ModelUpdate::Block {
                row: index(row).ok_or_else(unknown)?,
                block: index(block).ok_or_else(unknown)?,
                text: first_text(args).ok_or_else(bad)?,
            }),
            ["display", row, cell] => Ok(ModelUpdate::Cell {
                row: index(row).ok_or_else(unknown)?,
                cell: index(cell).ok_or_else(unknown)?,
                text: first_text(args).ok_or_else(bad)?,
            }),
            ["pad", note, "color"] => Ok(ModelUpdate::PadColor {
                note: index(note).ok_or_else(unknown)?,
                color: saturate(first_int(args).ok_or_else(bad)?),
            }),
            ["led", n, "rgb"] => {
                let n: u8 = index(n).ok_or_else(unknown)?;
                if n >= FADER_LED_COUNT {
                    return Err(unknown());
                }
                let components: Vec<f64> = args.iter().filter_map(as_float).collect();
                if components.len() < 3 {
                    return Err(bad());
                }
                Ok(ModelUpdate::FaderLed {
                    led: FADER_LED_1 + n,
                    brightness: components.get(3).copied().unwrap_or(1.0),
                    rgb: [components[0], components[1], components[2]],
                })
            }
            ["layout"] => parse_layout(args).map(ModelUpdate::Layout).ok_or_else(bad),
            _ => Err(unknown()),
        }
    }

    /// Apply to the surfaces; true if something was queued
    pub fn apply(self, display: &mut PropertyDisplay, pads: &PadGrid) -> bool {
        match self {
            ModelUpdate::Cell { row, cell, text } => {
                display.grid_mut().set_cell(row, cell, &text);
                true
            }
            ModelUpdate::Block { row, block, text } => {
                display.grid_mut().set_block(row, block, &text);
                true
            }
            ModelUpdate::Color { h, v, color } => display.set_color(h, v, color),
            ModelUpdate::Value { h, v, value } => display.set_value(h, v, value),
            ModelUpdate::PadColor { note, color } => pads.set_color(note, color),
            ModelUpdate::FaderLed { led, brightness, rgb } => {
                display.set_fader_led(led, brightness, rgb)
            }
            ModelUpdate::Layout(layout) => {
                display.set_layout(layout);
                true
            }
        }
    }
}

fn index<T: std::str::FromStr>(part: &str) -> Option<T> {
    part.parse().ok()
}

fn as_int(arg: &OscType) -> Option<i64> {
    match *arg {
        OscType::Int(i) => Some(i as i64),
        OscType::Long(l) => Some(l),
        OscType::Float(f) => Some(f.round() as i64),
        OscType::Double(d) => Some(d.round() as i64),
        OscType::Bool(b) => Some(b as i64),
        _ => None,
    }
}

fn as_float(arg: &OscType) -> Option<f64> {
    match *arg {
        OscType::Float(f) => Some(f as f64),
        OscType::Double(d) => Some(d),
        OscType::Int(i) => Some(i as f64),
        _ => None,
    }
}

/// Saturate to `i32` so the 7-bit clamp still sees the sign and magnitude
fn saturate(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(if n < 0 { i32::MIN } else { i32::MAX })
}

fn first_int(args: &[OscType]) -> Option<i64> {
    args.first().and_then(as_int)
}

fn first_text(args: &[OscType]) -> Option<String> {
    match args.first()? {
        OscType::String(s) => Some(s.clone()),
        other => as_int(other).map(|n| n.to_string()),
    }
}

fn parse_layout(args: &[OscType]) -> Option<ScreenLayout> {
    match args.first()? {
        OscType::String(name) => match name.to_ascii_lowercase().as_str() {
            "empty" => Some(ScreenLayout::Empty),
            "knob" => Some(ScreenLayout::Knob),
            "box" => Some(ScreenLayout::Box),
            _ => None,
        },
        other => match as_int(other)? {
            0 => Some(ScreenLayout::Empty),
            1 => Some(ScreenLayout::Knob),
            2 => Some(ScreenLayout::Box),
            _ => None,
        },
    }
}
