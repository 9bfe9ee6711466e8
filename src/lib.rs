//! Surface Sync
//!
//! Mirrors a host-side UI model (text cells, colors, values, LED states) onto
//! MIDI SysEx control surfaces and OSC endpoints, sending only what changed,
//! and routes the surfaces' controls through a shift-layer state machine.

pub mod browser;
pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod midi;
pub mod model;
pub mod osc;
pub mod pads;
pub mod router;
pub mod scheduler;
pub mod transport;
pub mod wire;
pub mod writer;
