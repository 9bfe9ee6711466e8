//! Input router - shift layer state machine and control dispatch
//!
//! Raw MIDI from a surface passes through, in order:
//! - the channel filter (events on other channels are dropped silently)
//! - the shift control, which toggles the shift layer
//! - pad notes, dispatched to the active view's pad handler; a note-off also
//!   schedules a deferred LED resync for that pad
//! - every other note or CC, dispatched to the handler bound to
//!   `(active view, control)`
//!
//! Nothing here is fatal. Protocol violations are logged and dropped without
//! touching the layer state.

mod layer;

pub use layer::LayerState;

#[cfg(test)]
mod tests;

use crate::error::RoutingError;
use crate::midi::{MidiMessage, VELOCITY_PRESSED};
use crate::scheduler::{DeferredTask, ResyncTarget, Scheduler};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Physical control as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Note(u8),
    Cc(u8),
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Note(n) => write!(f, "note {}", n),
            ControlId::Cc(n) => write!(f, "cc {}", n),
        }
    }
}

/// What happened to a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Press,
    Release,
    /// Continuous controller moved
    Change,
}

/// Event handed to handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub control: ControlId,
    pub kind: EventKind,
    /// Velocity or CC value (0-127)
    pub value: u8,
}

/// Receives control events for one `(view, control)` binding
pub trait Handler<V>: Send {
    fn handle(&mut self, layer: &mut LayerState<V>, event: &ControlEvent);
}

impl<V, F> Handler<V> for F
where
    F: FnMut(&mut LayerState<V>, &ControlEvent) + Send,
{
    fn handle(&mut self, layer: &mut LayerState<V>, event: &ControlEvent) {
        self(layer, event)
    }
}

/// Static routing parameters
#[derive(Debug, Clone)]
pub struct RouterConfig<V> {
    /// 0-based channel the bound device sends on; None accepts all
    pub control_channel: Option<u8>,
    pub shift_note: u8,
    pub pad_notes: RangeInclusive<u8>,
    /// Delay between a pad note-off and its LED resync
    pub resync_delay: Duration,
    pub shift_view: V,
}

/// Result of routing one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Wrong channel, dropped before the state machine
    Filtered,
    ShiftPressed,
    ShiftReleased,
    /// A handler ran
    Dispatched,
    /// Valid but nothing to do (repeated shift edge, SysEx echo)
    Ignored,
}

/// Shift layer state machine plus handler table
pub struct InputRouter<V> {
    config: RouterConfig<V>,
    layer: LayerState<V>,
    handlers: HashMap<(V, ControlId), Box<dyn Handler<V>>>,
    pad_handlers: HashMap<V, Box<dyn Handler<V>>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<V> InputRouter<V>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(config: RouterConfig<V>, initial_view: V, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            config,
            layer: LayerState::new(initial_view),
            handlers: HashMap::new(),
            pad_handlers: HashMap::new(),
            scheduler,
        }
    }

    pub fn layer(&self) -> &LayerState<V> {
        &self.layer
    }

    pub fn config(&self) -> &RouterConfig<V> {
        &self.config
    }

    /// Bind a handler to a control in one view, replacing any previous one
    pub fn bind(&mut self, view: V, control: ControlId, handler: impl Handler<V> + 'static) {
        self.handlers.insert((view, control), Box::new(handler));
    }

    /// Bind the handler receiving all pad notes in one view
    pub fn bind_pads(&mut self, view: V, handler: impl Handler<V> + 'static) {
        self.pad_handlers.insert(view, Box::new(handler));
    }

    /// Route one raw message; failures are logged before being returned
    pub fn process(&mut self, raw: &[u8]) -> Result<RouteOutcome, RoutingError> {
        let result = MidiMessage::parse(raw).and_then(|message| self.route(&message));

        if let Err(ref e) = result {
            match e {
                RoutingError::Malformed(_) | RoutingError::ShiftVelocity(_) => {
                    error!("Protocol violation: {} ({})", e, crate::wire::format_hex(raw))
                }
                RoutingError::UnknownControl { .. } => warn!("{}", e),
                RoutingError::Unsupported(_) => debug!("Dropped: {}", e),
            }
        }
        result
    }

    fn route(&mut self, message: &MidiMessage) -> Result<RouteOutcome, RoutingError> {
        if let (Some(expected), Some(channel)) = (self.config.control_channel, message.channel()) {
            if channel != expected {
                trace!("Ignoring {} (bound to channel {})", message, expected + 1);
                return Ok(RouteOutcome::Filtered);
            }
        }

        match *message {
            MidiMessage::NoteOn { note, velocity, .. } if note == self.config.shift_note => {
                self.shift_pressed(velocity)
            }
            MidiMessage::NoteOff { note, .. } if note == self.config.shift_note => {
                Ok(self.shift_released())
            }
            MidiMessage::NoteOn { note, velocity, .. } => self.dispatch(ControlEvent {
                control: ControlId::Note(note),
                kind: EventKind::Press,
                value: velocity,
            }),
            MidiMessage::NoteOff { note, velocity, .. } => {
                if self.config.pad_notes.contains(&note) {
                    // The firmware relights the pad on its own; redraw it afterwards
                    self.scheduler.schedule_once(DeferredTask::after(
                        ResyncTarget::Pad(note),
                        self.config.resync_delay,
                    ));
                }
                self.dispatch(ControlEvent {
                    control: ControlId::Note(note),
                    kind: EventKind::Release,
                    value: velocity,
                })
            }
            MidiMessage::ControlChange { cc, value, .. } => self.dispatch(ControlEvent {
                control: ControlId::Cc(cc),
                kind: EventKind::Change,
                value,
            }),
            MidiMessage::SysEx { .. } => Ok(RouteOutcome::Ignored),
        }
    }

    fn shift_pressed(&mut self, velocity: u8) -> Result<RouteOutcome, RoutingError> {
        if velocity != VELOCITY_PRESSED {
            return Err(RoutingError::ShiftVelocity(velocity));
        }
        if !self.layer.press_shift(&self.config.shift_view) {
            return Ok(RouteOutcome::Ignored);
        }
        debug!("Shift held, view -> {:?}", self.layer.active_view());
        Ok(RouteOutcome::ShiftPressed)
    }

    fn shift_released(&mut self) -> RouteOutcome {
        if !self.layer.release_shift(&self.config.shift_view) {
            return RouteOutcome::Ignored;
        }
        debug!("Shift released, view -> {:?}", self.layer.active_view());
        // Pad LEDs may have been changed by the firmware while shifted
        self.scheduler
            .schedule_once(DeferredTask::now(ResyncTarget::AllPads));
        RouteOutcome::ShiftReleased
    }

    fn dispatch(&mut self, event: ControlEvent) -> Result<RouteOutcome, RoutingError> {
        let view = self.layer.active_view().clone();

        let handler = match event.control {
            ControlId::Note(note) if self.config.pad_notes.contains(&note) => {
                self.pad_handlers.get_mut(&view)
            }
            control => self.handlers.get_mut(&(view.clone(), control)),
        };

        match handler {
            Some(handler) => {
                trace!("{:?}: {} {:?} {}", view, event.control, event.kind, event.value);
                handler.handle(&mut self.layer, &event);
                Ok(RouteOutcome::Dispatched)
            }
            None => Err(RoutingError::UnknownControl {
                view: format!("{:?}", view),
                control: event.control.to_string(),
            }),
        }
    }
}
