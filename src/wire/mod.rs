//! Wire encoders
//!
//! Pure functions from logical updates to protocol frames. Nothing in here
//! holds state or touches a transport.

pub mod osc;
pub mod sysex;
pub mod text;

pub use text::{fix_ascii, pad, split_block};

/// Format bytes as spaced upper-case hex for logging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
