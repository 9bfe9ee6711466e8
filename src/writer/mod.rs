//! Differential writer - cache, compare, encode, queue, flush
//!
//! One `DifferentialWriter` exists per surface. It owns that surface's
//! [`StateCache`] and its queue of pending frames, both behind a single
//! mutex:
//!
//! - `update` encodes and queues a frame only when the value differs from the
//!   cache (or when a dump is requested), then records the value.
//! - `flush` snapshots the queue, clears it and hands the snapshot to the
//!   transport inside the same critical section, so frames from concurrent
//!   updates are never interleaved or lost mid-flush.
//!
//! Failed flushes are reported and dropped. The next differing update (or a
//! forced resync) retransmits.
//!
//! Device specifics live behind the [`Encoder`] trait; transports behind
//! [`TransportSink`].


use crate::cache::{StateCache, SurfaceValue};
use crate::error::TransportError;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{error, info, trace};

/// Device family capability: turns a coordinate and value into a frame
pub trait Encoder: Send + Sync {
    /// Logical coordinate on the surface (cell, LED, address, ...)
    type Coord: Clone + Eq + Hash + fmt::Debug + Send;
    /// Complete protocol unit ready for transmission
    type Frame: Clone + fmt::Debug + Send;

    fn encode(&self, coord: &Self::Coord, value: &SurfaceValue) -> Self::Frame;

    /// One-line description for output logging
    fn describe(&self, frame: &Self::Frame) -> String;

    /// Frames hidden from output logging (still transmitted)
    fn is_heartbeat(&self, _frame: &Self::Frame) -> bool {
        false
    }
}

/// Outbound channel for a batch of frames
pub trait TransportSink<F>: Send + Sync {
    fn transmit(&self, frames: &[F]) -> Result<(), TransportError>;
}

/// Receives failures and trace output; must not block or panic
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, message: &str, cause: &dyn std::error::Error);
    fn trace(&self, message: &str);
}

/// Reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_error(&self, message: &str, cause: &dyn std::error::Error) {
        error!("{}: {}", message, cause);
    }

    fn trace(&self, message: &str) {
        info!("{}", message);
    }
}

struct WriterState<C, F> {
    cache: StateCache<C>,
    pending: Vec<F>,
}

/// Differential state writer for one surface
pub struct DifferentialWriter<E: Encoder> {
    name: String,
    encoder: E,
    state: Mutex<WriterState<E::Coord, E::Frame>>,
    reporter: Arc<dyn ErrorReporter>,
    log_output: bool,
}

impl<E: Encoder> DifferentialWriter<E> {
    /// Create a writer whose cache is sized for `capacity` coordinates
    pub fn new(name: impl Into<String>, encoder: E, capacity: usize) -> Self {
        Self {
            name: name.into(),
            encoder,
            state: Mutex::new(WriterState {
                cache: StateCache::with_capacity(capacity),
                pending: Vec::new(),
            }),
            reporter: Arc::new(TracingReporter),
            log_output: false,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Trace every non-heartbeat frame before it is transmitted
    pub fn with_output_logging(mut self, enabled: bool) -> Self {
        self.log_output = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Queue `value` for `coord` if it differs from the cache or `dump` is set.
    ///
    /// Returns true when a frame was queued.
    pub fn update(&self, coord: E::Coord, value: SurfaceValue, dump: bool) -> bool {
        let mut state = self.state.lock();
        self.update_locked(&mut state, coord, value, dump)
    }

    /// Like [`update`](Self::update), but the cache key and compared value
    /// may differ from what the frame carries.
    pub fn update_keyed<F>(
        &self,
        cache_key: E::Coord,
        test_value: SurfaceValue,
        dump: bool,
        frame: F,
    ) -> bool
    where
        F: FnOnce() -> E::Frame,
    {
        let mut state = self.state.lock();
        if !dump && state.cache.is_current(&cache_key, &test_value) {
            return false;
        }
        state.cache.record(cache_key, test_value);
        state.pending.push(frame());
        true
    }

    /// Queue a frame that has no cached coordinate (layout switch, popup)
    pub fn enqueue_uncached(&self, frame: E::Frame) {
        self.state.lock().pending.push(frame);
    }

    /// Re-queue the cached value of `coord`.
    ///
    /// Returns false if nothing was ever sent for it.
    pub fn refresh(&self, coord: &E::Coord) -> bool {
        let mut state = self.state.lock();
        let Some(value) = state.cache.get(coord).cloned() else {
            return false;
        };
        let frame = self.encoder.encode(coord, &value);
        state.pending.push(frame);
        true
    }

    /// Re-queue every cached value
    pub fn refresh_all(&self) -> usize {
        let mut state = self.state.lock();
        let frames: Vec<E::Frame> = state
            .cache
            .iter()
            .map(|(coord, value)| self.encoder.encode(coord, value))
            .collect();
        let count = frames.len();
        state.pending.extend(frames);
        count
    }

    /// Forget all cached values; the next update of every coordinate is sent
    pub fn invalidate(&self) {
        self.state.lock().cache.invalidate();
    }

    pub fn cached(&self, coord: &E::Coord) -> Option<SurfaceValue> {
        self.state.lock().cache.get(coord).cloned()
    }

    /// Snapshot of every cached coordinate and value
    pub fn cached_entries(&self) -> Vec<(E::Coord, SurfaceValue)> {
        self.state
            .lock()
            .cache
            .iter()
            .map(|(coord, value)| (coord.clone(), value.clone()))
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Transmit all queued frames as one unit.
    ///
    /// Returns the number of frames handed to the sink. On failure the frames
    /// are dropped, the reporter is notified and the error is returned.
    pub fn flush(&self, sink: &dyn TransportSink<E::Frame>) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        self.transmit_locked(&mut state, sink)
    }

    /// Dump every given coordinate and transmit them in a single flush
    pub fn resync<I>(
        &self,
        values: I,
        sink: &dyn TransportSink<E::Frame>,
    ) -> Result<usize, TransportError>
    where
        I: IntoIterator<Item = (E::Coord, SurfaceValue)>,
    {
        let mut state = self.state.lock();
        for (coord, value) in values {
            self.update_locked(&mut state, coord, value, true);
        }
        self.transmit_locked(&mut state, sink)
    }

    fn update_locked(
        &self,
        state: &mut WriterState<E::Coord, E::Frame>,
        coord: E::Coord,
        value: SurfaceValue,
        dump: bool,
    ) -> bool {
        if !dump && state.cache.is_current(&coord, &value) {
            return false;
        }
        let frame = self.encoder.encode(&coord, &value);
        trace!("{}: queue {:?} = {}", self.name, coord, value);
        state.cache.record(coord, value);
        state.pending.push(frame);
        true
    }

    fn transmit_locked(
        &self,
        state: &mut WriterState<E::Coord, E::Frame>,
        sink: &dyn TransportSink<E::Frame>,
    ) -> Result<usize, TransportError> {
        let frames = std::mem::take(&mut state.pending);
        if frames.is_empty() {
            return Ok(0);
        }

        if self.log_output {
            self.log_frames(&frames);
        }

        match sink.transmit(&frames) {
            Ok(()) => {
                trace!("{}: flushed {} frames", self.name, frames.len());
                Ok(frames.len())
            }
            Err(e) => {
                let message = format!(
                    "{}: could not send {} frames",
                    self.name,
                    frames.len()
                );
                self.reporter.report_error(&message, &e);
                Err(e)
            }
        }
    }

    fn log_frames(&self, frames: &[E::Frame]) {
        let lines: Vec<String> = frames
            .iter()
            .filter(|f| !self.encoder.is_heartbeat(f))
            .map(|f| format!("Sending: {}", self.encoder.describe(f)))
            .collect();
        if !lines.is_empty() {
            self.reporter.trace(&lines.join("\n"));
        }
    }
}
