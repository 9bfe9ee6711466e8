//! Gateway configuration
//!
//! Loaded once at startup from a YAML file and validated before any port is
//! opened.

use crate::display::Geometry;
use crate::router::ControlId;
use crate::wire::sysex::ScreenLayout;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{SocketAddr, ToSocketAddrs};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub midi: MidiConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub osc: OscConfig,
    pub router: RouterSection,
    /// Period of the flush timer
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,
}

/// MIDI port name patterns (case-insensitive substrings)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    pub input_port: String,
    pub output_port: String,
    /// Port for the screen; pads and screen share `output_port` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_port: Option<String>,
}

/// Pad first/last note
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct NoteRange {
    pub first: u8,
    pub last: u8,
}

/// Surface identity and timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// 1-based MIDI channel the surface sends on; all channels when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_channel: Option<u8>,
    #[serde(default = "default_shift_note")]
    pub shift_note: u8,
    #[serde(default = "default_pad_notes")]
    pub pad_notes: NoteRange,
    #[serde(default = "default_resync_delay")]
    pub resync_delay_ms: u64,
    /// Shown on the screen at shutdown
    #[serde(default = "default_host_name")]
    pub host_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_cells")]
    pub cells: usize,
    #[serde(default = "default_chars_per_cell")]
    pub chars_per_cell: usize,
    #[serde(default = "default_layout")]
    pub layout: ScreenLayout,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OscConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_osc_host")]
    pub host: String,
    #[serde(default = "default_osc_port")]
    pub port: u16,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Log every outgoing message
    #[serde(default)]
    pub log_output: bool,
    /// Hide `heartbeat_addresses` from the output log
    #[serde(default = "default_true")]
    pub filter_heartbeat: bool,
    #[serde(default)]
    pub heartbeat_addresses: Vec<String>,
}

/// Views and control bindings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterSection {
    pub views: Vec<String>,
    pub initial_view: String,
    pub shift_view: String,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Sends the control value to `address` while `view` is active
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Binding {
    pub view: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<u8>,
    #[serde(default)]
    pub address: String,
    /// Switch to this view on press instead of (or besides) sending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_view: Option<String>,
}

impl Binding {
    pub fn control(&self) -> Option<ControlId> {
        match (self.note, self.cc) {
            (Some(note), None) => Some(ControlId::Note(note)),
            (None, Some(cc)) => Some(ControlId::Cc(cc)),
            _ => None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.is_empty() {
            bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.is_empty() {
            bail!("MIDI output_port cannot be empty");
        }
        if matches!(self.midi.display_port.as_deref(), Some("")) {
            bail!("MIDI display_port cannot be empty");
        }

        let device = &self.device;
        if let Some(channel) = device.control_channel {
            if channel == 0 || channel > 16 {
                bail!("Invalid control_channel {} (must be 1-16)", channel);
            }
        }
        if device.shift_note > 127 {
            bail!("Invalid shift_note {} (must be 0-127)", device.shift_note);
        }
        let pads = device.pad_notes;
        if pads.last > 127 {
            bail!("Invalid pad note {} (must be 0-127)", pads.last);
        }
        if pads.first > pads.last {
            bail!("Pad range {}..={} is empty", pads.first, pads.last);
        }
        if pads.last - pads.first >= 0x10 {
            bail!("Pad range {}..={} exceeds 16 pads", pads.first, pads.last);
        }
        if (pads.first..=pads.last).contains(&device.shift_note) {
            bail!("shift_note {} lies inside the pad range", device.shift_note);
        }

        let display = &self.display;
        if display.rows == 0 || display.cells == 0 || display.chars_per_cell == 0 {
            bail!("Display geometry must be non-zero");
        }
        if display.rows > 0x7F || display.cells > 0x7F {
            bail!(
                "Display geometry {}x{} exceeds 127 rows or cells",
                display.rows,
                display.cells
            );
        }

        if self.osc.enabled && self.osc.host.is_empty() {
            bail!("OSC host cannot be empty");
        }

        self.validate_router()?;

        if self.flush_interval_ms == 0 {
            bail!("flush_interval_ms must be greater than 0");
        }

        Ok(())
    }

    fn validate_router(&self) -> Result<()> {
        let router = &self.router;
        if router.views.is_empty() {
            bail!("At least one view must be defined");
        }

        let mut views = HashSet::new();
        for view in &router.views {
            if view.is_empty() {
                bail!("View name cannot be empty");
            }
            if !views.insert(view.as_str()) {
                bail!("View '{}' defined twice", view);
            }
        }
        for (what, view) in [("initial_view", &router.initial_view), ("shift_view", &router.shift_view)] {
            if !views.contains(view.as_str()) {
                bail!("{} '{}' is not a defined view", what, view);
            }
        }

        let mut bound = HashSet::new();
        for (idx, binding) in router.bindings.iter().enumerate() {
            self.validate_binding(binding, &views, &mut bound)
                .with_context(|| format!("Invalid binding {} ({})", idx, binding.address))?;
        }
        Ok(())
    }

    fn validate_binding<'a>(
        &self,
        binding: &'a Binding,
        views: &HashSet<&str>,
        bound: &mut HashSet<(&'a str, ControlId)>,
    ) -> Result<()> {
        if !views.contains(binding.view.as_str()) {
            bail!("Unknown view '{}'", binding.view);
        }
        if let Some(target) = &binding.select_view {
            if !views.contains(target.as_str()) {
                bail!("Unknown select_view '{}'", target);
            }
        }
        if binding.address.is_empty() && binding.select_view.is_none() {
            bail!("Binding needs an address or a select_view");
        }
        if !binding.address.is_empty() && !binding.address.starts_with('/') {
            bail!("OSC address '{}' must start with '/'", binding.address);
        }

        let Some(control) = binding.control() else {
            bail!("Exactly one of 'note' or 'cc' is required");
        };
        match control {
            ControlId::Note(n) | ControlId::Cc(n) if n > 127 => {
                bail!("Invalid control number {} (must be 0-127)", n)
            }
            ControlId::Note(n) if n == self.device.shift_note => {
                bail!("Note {} is the shift control", n)
            }
            ControlId::Note(n) if self.pad_notes().contains(&n) => {
                bail!("Note {} is a pad; pads are not bound individually", n)
            }
            _ => {}
        }
        if !bound.insert((binding.view.as_str(), control)) {
            bail!("{} bound twice in view '{}'", control, binding.view);
        }
        Ok(())
    }

    /// 0-based channel for the wire
    pub fn control_channel(&self) -> Option<u8> {
        self.device.control_channel.map(|c| c - 1)
    }

    pub fn pad_notes(&self) -> RangeInclusive<u8> {
        self.device.pad_notes.first..=self.device.pad_notes.last
    }

    pub fn resync_delay(&self) -> Duration {
        Duration::from_millis(self.device.resync_delay_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            rows: self.display.rows,
            cells: self.display.cells,
            chars_per_cell: self.display.chars_per_cell,
        }
    }

    /// Heartbeat addresses to hide from the output log
    pub fn heartbeat_filter(&self) -> Vec<String> {
        if self.osc.filter_heartbeat {
            self.osc.heartbeat_addresses.clone()
        } else {
            Vec::new()
        }
    }

    pub fn osc_target(&self) -> Result<SocketAddr> {
        (self.osc.host.as_str(), self.osc.port)
            .to_socket_addrs()
            .with_context(|| format!("Cannot resolve OSC host {}", self.osc.host))?
            .next()
            .with_context(|| format!("No address for OSC host {}", self.osc.host))
    }

    pub fn osc_listen_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.osc.listen_port).into()
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            control_channel: None,
            shift_note: default_shift_note(),
            pad_notes: default_pad_notes(),
            resync_delay_ms: default_resync_delay(),
            host_name: default_host_name(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cells: default_cells(),
            chars_per_cell: default_chars_per_cell(),
            layout: default_layout(),
        }
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_osc_host(),
            port: default_osc_port(),
            listen_port: default_listen_port(),
            log_output: false,
            filter_heartbeat: true,
            heartbeat_addresses: Vec::new(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_flush_interval() -> u64 { 30 }
fn default_shift_note() -> u8 { 7 }
fn default_pad_notes() -> NoteRange { NoteRange { first: 36, last: 51 } }
fn default_resync_delay() -> u64 { 100 }
fn default_host_name() -> String { "Bitwig".to_string() }
fn default_rows() -> usize { 4 }
fn default_cells() -> usize { 9 }
fn default_chars_per_cell() -> usize { 9 }
fn default_layout() -> ScreenLayout { ScreenLayout::Knob }
fn default_osc_host() -> String { "127.0.0.1".to_string() }
fn default_osc_port() -> u16 { 9000 }
fn default_listen_port() -> u16 { 8000 }
