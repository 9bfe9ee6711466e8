//! OSC message shaping and bundle codec

use crate::cache::SurfaceValue;
use crate::error::TransportError;
use crate::wire::text::fix_ascii;
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

/// "Process immediately" time tag
pub const IMMEDIATE: OscTime = OscTime {
    seconds: 0,
    fractional: 1,
};

/// Convert a surface value into OSC arguments.
///
/// The wire has no boolean type, so booleans become `0`/`1`. Floats go out at
/// single precision since some receivers read doubles as zero.
pub fn to_args(value: &SurfaceValue) -> Vec<OscType> {
    let mut args = Vec::new();
    push_args(value, &mut args);
    args
}

fn push_args(value: &SurfaceValue, args: &mut Vec<OscType>) {
    match value {
        SurfaceValue::Text(s) => args.push(OscType::String(fix_ascii(s))),
        SurfaceValue::ColorIndex(c) => args.push(OscType::Int(*c)),
        SurfaceValue::Numeric(n) => args.push(OscType::Int(saturate_i32(*n))),
        SurfaceValue::Rgb(r, g, b) => args.push(OscType::String(rgb_string(*r, *g, *b))),
        SurfaceValue::Bool(b) => args.push(OscType::Int(*b as i32)),
        SurfaceValue::Float(v) => args.push(OscType::Float(*v as f32)),
        SurfaceValue::List(values) => {
            for v in values {
                push_args(v, args);
            }
        }
    }
}

fn saturate_i32(n: i64) -> i32 {
    n.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

pub fn rgb_string(red: u8, green: u8, blue: u8) -> String {
    format!("rgb({},{},{})", red, green, blue)
}

/// Scale unit-range color components to 0-255
pub fn unit_rgb(red: f64, green: f64, blue: f64) -> (u8, u8, u8) {
    let scale = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    (scale(red), scale(green), scale(blue))
}

pub fn message(address: &str, value: &SurfaceValue) -> OscMessage {
    OscMessage {
        addr: address.to_string(),
        args: to_args(value),
    }
}

/// Encode messages as a single immediate bundle
pub fn encode_bundle(messages: &[OscMessage]) -> Result<Vec<u8>, TransportError> {
    let bundle = OscPacket::Bundle(OscBundle {
        timetag: IMMEDIATE,
        content: messages.iter().cloned().map(OscPacket::Message).collect(),
    });
    rosc::encoder::encode(&bundle).map_err(|e| TransportError::Osc(e.to_string()))
}

/// Decode a packet into its messages, flattening nested bundles
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<OscMessage>, TransportError> {
    let (_, packet) =
        rosc::decoder::decode_udp(bytes).map_err(|e| TransportError::Osc(e.to_string()))?;
    let mut out = Vec::new();
    flatten(packet, &mut out);
    Ok(out)
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for p in bundle.content {
                flatten(p, out);
            }
        }
    }
}

/// Human-readable `addr [ v1, v2 ]` form used by output logging
pub fn describe(message: &OscMessage) -> String {
    let values: Vec<String> = message
        .args
        .iter()
        .map(|arg| match arg {
            OscType::Int(i) => i.to_string(),
            OscType::Float(f) => f.to_string(),
            OscType::String(s) => s.clone(),
            other => format!("{:?}", other),
        })
        .collect();
    format!("{} [ {} ]", message.addr, values.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_becomes_int() {
        assert_eq!(to_args(&SurfaceValue::Bool(true)), vec![OscType::Int(1)]);
        assert_eq!(to_args(&SurfaceValue::Bool(false)), vec![OscType::Int(0)]);
    }

    #[test]
    fn test_float_is_single_precision() {
        assert_eq!(
            to_args(&SurfaceValue::Float(0.1)),
            vec![OscType::Float(0.1f64 as f32)]
        );
    }

    #[test]
    fn test_list_flattens() {
        let value = SurfaceValue::List(vec![
            SurfaceValue::Numeric(3),
            SurfaceValue::Bool(true),
            SurfaceValue::Text("Kick".into()),
        ]);
        assert_eq!(
            to_args(&value),
            vec![OscType::Int(3), OscType::Int(1), OscType::String("Kick".into())]
        );
    }

    #[test]
    fn test_unit_rgb() {
        assert_eq!(unit_rgb(1.0, 0.5, 0.0), (255, 128, 0));
        assert_eq!(rgb_string(255, 128, 0), "rgb(255,128,0)");
    }

    #[test]
    fn test_bundle_decodes_to_original_values() {
        let messages = vec![
            message("/track/1/name", &"Drums".into()),
            message("/track/1/mute", &SurfaceValue::Bool(true)),
            message("/track/1/volume", &SurfaceValue::Float(0.75)),
            message("/track/1/color", &SurfaceValue::Rgb(10, 20, 30)),
        ];

        let bytes = encode_bundle(&messages).unwrap();
        let decoded = decode_packet(&bytes).unwrap();

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0].args, vec![OscType::String("Drums".into())]);
        assert_eq!(decoded[1].args, vec![OscType::Int(1)]);
        assert_eq!(decoded[2].args, vec![OscType::Float(0.75)]);
        assert_eq!(decoded[3].args, vec![OscType::String("rgb(10,20,30)".into())]);
        assert_eq!(decoded[3].addr, "/track/1/color");
    }

    #[test]
    fn test_describe() {
        let msg = message("/beat", &SurfaceValue::List(vec![1i64.into(), 2i64.into()]));
        assert_eq!(describe(&msg), "/beat [ 1, 2 ]");
    }
}
