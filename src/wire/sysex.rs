//! SysEx command framing
//!
//! Two device families are covered: the SL MkIII screen/LED protocol and the
//! BeatStep pad color protocol. Every builder returns a complete frame
//! including `F0` and `F7`.

use crate::error::EncodingError;
use crate::wire::text::fix_ascii;
use tracing::warn;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// SL MkIII SysEx header (after `F0`)
pub const MKIII_HEADER: [u8; 6] = [0x00, 0x20, 0x29, 0x02, 0x0A, 0x01];

/// BeatStep SysEx header (after `F0`)
pub const BEATSTEP_HEADER: [u8; 8] = [0x00, 0x20, 0x6B, 0x7F, 0x42, 0x02, 0x00, 0x10];

const CMD_LAYOUT: u8 = 0x01;
const CMD_PROPERTY: u8 = 0x02;
const CMD_LED: u8 = 0x03;
const CMD_NOTIFICATION: u8 = 0x04;

/// Screen layouts of the SL MkIII display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenLayout {
    Empty = 0,
    Knob = 1,
    Box = 2,
}

/// Display property kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Text = 1,
    Color = 2,
    Value = 3,
}

/// Convert a value to a 7-bit data byte
pub fn data_byte(value: i64) -> Result<u8, EncodingError> {
    if (0..=127).contains(&value) {
        Ok(value as u8)
    } else {
        Err(EncodingError::OutOfRange {
            value,
            min: 0,
            max: 127,
        })
    }
}

/// Convert a value to a 7-bit data byte, clamping and warning when out of range
pub fn clamped_data_byte(value: i64) -> u8 {
    data_byte(value).unwrap_or_else(|e| {
        warn!("Clamping SysEx data byte: {}", e);
        e.clamped() as u8
    })
}

fn frame(header: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(header.len() + body.len() + 2);
    out.push(SYSEX_START);
    out.extend_from_slice(header);
    out.extend_from_slice(body);
    out.push(SYSEX_END);
    out
}

/// Text payload: ASCII-fixed bytes followed by a null terminator
pub fn text_payload(text: &str) -> Vec<u8> {
    let mut bytes = fix_ascii(text).into_bytes();
    bytes.push(0x00);
    bytes
}

/// `02 <h> <property> <v> <payload>`
pub fn property(property: Property, h_position: u8, v_position: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![
        CMD_PROPERTY,
        h_position & 0x7F,
        property as u8,
        v_position & 0x7F,
    ];
    body.extend_from_slice(payload);
    frame(&MKIII_HEADER, &body)
}

pub fn property_text(h_position: u8, v_position: u8, text: &str) -> Vec<u8> {
    property(Property::Text, h_position, v_position, &text_payload(text))
}

pub fn property_color(h_position: u8, v_position: u8, color: i64) -> Vec<u8> {
    property(Property::Color, h_position, v_position, &[clamped_data_byte(color)])
}

pub fn property_value(h_position: u8, v_position: u8, value: i64) -> Vec<u8> {
    property(Property::Value, h_position, v_position, &[clamped_data_byte(value)])
}

/// `01 <layout>`
pub fn layout(layout: ScreenLayout) -> Vec<u8> {
    frame(&MKIII_HEADER, &[CMD_LAYOUT, layout as u8])
}

/// `03 <led> 01 <r> <g> <b>`
pub fn led_rgb(led: u8, red: u8, green: u8, blue: u8) -> Vec<u8> {
    frame(
        &MKIII_HEADER,
        &[CMD_LED, led & 0x7F, 0x01, red & 0x7F, green & 0x7F, blue & 0x7F],
    )
}

/// `04 <text>` notification popup
pub fn notification(text: &str) -> Vec<u8> {
    let mut body = vec![CMD_NOTIFICATION];
    body.extend(text_payload(text));
    frame(&MKIII_HEADER, &body)
}

/// BeatStep pad color: `<pad id> <color>`
pub fn pad_color(pad_id: u8, color: i64) -> Vec<u8> {
    frame(&BEATSTEP_HEADER, &[pad_id & 0x7F, clamped_data_byte(color)])
}

/// Scale a unit-range brightness and color component to a 7-bit channel
pub fn scale_component(hue: f64, component: f64) -> u8 {
    (hue * component * 127.0).round().clamp(0.0, 127.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_text_frame() {
        let msg = property_text(2, 1, "Pan");
        assert_eq!(
            msg,
            vec![
                0xF0, 0x00, 0x20, 0x29, 0x02, 0x0A, 0x01, // header
                0x02, 0x02, 0x01, 0x01, // property text at h=2 v=1
                b'P', b'a', b'n', 0x00, // text + terminator
                0xF7
            ]
        );
    }

    #[test]
    fn test_property_color_and_value() {
        assert_eq!(
            property_color(8, 0, 5),
            vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0A, 0x01, 0x02, 0x08, 0x02, 0x00, 0x05, 0xF7]
        );
        assert_eq!(
            property_value(3, 1, 1),
            vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0A, 0x01, 0x02, 0x03, 0x03, 0x01, 0x01, 0xF7]
        );
    }

    #[test]
    fn test_color_is_clamped() {
        let msg = property_color(0, 0, 300);
        assert_eq!(msg[11], 127);
        let msg = property_color(0, 0, -4);
        assert_eq!(msg[11], 0);
    }

    #[test]
    fn test_layout_and_led() {
        assert_eq!(
            layout(ScreenLayout::Knob),
            vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0A, 0x01, 0x01, 0x01, 0xF7]
        );
        assert_eq!(
            led_rgb(0x36, 127, 0, 64),
            vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0A, 0x01, 0x03, 0x36, 0x01, 0x7F, 0x00, 0x40, 0xF7]
        );
    }

    #[test]
    fn test_pad_color_frame() {
        assert_eq!(
            pad_color(0x70, 9),
            vec![0xF0, 0x00, 0x20, 0x6B, 0x7F, 0x42, 0x02, 0x00, 0x10, 0x70, 0x09, 0xF7]
        );
    }

    #[test]
    fn test_data_byte_range() {
        assert_eq!(data_byte(127), Ok(127));
        assert!(data_byte(128).is_err());
        assert_eq!(
            data_byte(-1).unwrap_err().clamped(),
            0
        );
    }

    #[test]
    fn test_text_payload_fixes_ascii() {
        assert_eq!(text_payload("Süß"), b"Suess\0".to_vec());
    }

    #[test]
    fn test_scale_component() {
        assert_eq!(scale_component(1.0, 1.0), 127);
        assert_eq!(scale_component(0.5, 1.0), 64);
        assert_eq!(scale_component(1.0, 0.0), 0);
    }
}
