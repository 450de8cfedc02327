//! Per-frame decision procedure and the handles the host drives it through.
//!
//! The host owns two threads. The primary thread calls
//! [`StillReplaceFilter::chain`] and [`StillReplaceFilter::handle_event`];
//! the replacement thread calls the same pair on a [`ReplacementInput`].
//! Any thread may hold a [`Controller`].

use super::flow::{FlowError, FlowResult, FrameSink, StreamEvent};
use crate::analysis::{Comparison, FrameComparator};
use crate::compose::{overwrite, CopyStats};
use crate::config::{ConfigError, Settings};
use crate::handoff::{Replacement, ReplacementSlot, SlotState, Taken};
use crate::reference::{ControlPlane, ControlSnapshot, Reference};
use crate::video::{FormatDescriptor, FormatError, Frame, MapError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Counters for the primary path.
#[derive(Debug, Clone, Copy, Default)]
struct PrimaryCounters {
    frames: u64,
    replaced: u64,
    unavailable: u64,
    mapping_failures: u64,
    last_score: Option<f64>,
}

/// Point-in-time view of everything the filter counts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterStats {
    /// Primary frames received.
    pub frames: u64,
    /// Frames whose pixels were replaced.
    pub replaced: u64,
    /// Replace triggers that found no replacement frame.
    pub unavailable: u64,
    /// Frames forwarded unmodified because mapping failed.
    pub mapping_failures: u64,
    /// Most recent decisive similarity score.
    pub last_score: Option<f64>,
    /// References captured.
    pub captures: u64,
    /// Reset commands that cleared a reference.
    pub resets: u64,
    /// Replacement frames accepted by the slot.
    pub delivered: u64,
    /// Replacement frames dropped by the slot.
    pub discarded: u64,
    /// Repeat-last hand-outs of an unlinked replacement input.
    pub repeated: u64,
}

#[derive(Debug)]
struct Shared {
    control: ControlPlane,
    slot: ReplacementSlot,
    counters: Mutex<PrimaryCounters>,
}

impl Shared {
    fn stats(&self) -> FilterStats {
        let primary = *self.counters.lock();
        let control = self.control.stats();
        let slot = self.slot.stats();
        FilterStats {
            frames: primary.frames,
            replaced: primary.replaced,
            unavailable: primary.unavailable,
            mapping_failures: primary.mapping_failures,
            last_score: primary.last_score,
            captures: control.captures,
            resets: control.resets,
            delivered: slot.delivered,
            discarded: slot.discarded,
            repeated: slot.repeated,
        }
    }
}

/// Primary path: compares each frame with the reference still and swaps in
/// replacement pixels when it matches.
pub struct StillReplaceFilter<S> {
    shared: Arc<Shared>,
    sink: S,
    eos: bool,
}

impl<S: FrameSink> StillReplaceFilter<S> {
    /// Creates a filter that forwards to `sink`.
    pub fn new(settings: Settings, sink: S) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                control: ControlPlane::new(settings),
                slot: ReplacementSlot::new(),
                counters: Mutex::new(PrimaryCounters::default()),
            }),
            sink,
            eos: false,
        })
    }

    /// Handle for the thread delivering replacement frames.
    pub fn replacement_input(&self) -> ReplacementInput {
        ReplacementInput {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Handle for settings, reset and statistics.
    pub fn controller(&self) -> Controller {
        Controller {
            shared: Arc::clone(&self.shared),
        }
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// True once end-of-stream was seen on the primary input.
    #[inline]
    pub fn is_eos(&self) -> bool {
        self.eos
    }

    /// Handles an event arriving on the primary input and forwards it.
    ///
    /// Caps that cannot be resolved are rejected and not forwarded.
    pub fn handle_event(&mut self, event: StreamEvent) -> Result<(), FormatError> {
        match &event {
            StreamEvent::Caps(caps) => {
                let format = caps.resolve()?;
                let format = self.shared.control.set_primary_format(format);
                info!(%format, "primary caps negotiated");
            }
            StreamEvent::Eos => {
                self.eos = true;
                self.shared.slot.signal_eos();
                debug!("primary end of stream");
            }
            StreamEvent::FlushStart => {
                self.shared.slot.signal_flushing();
                debug!("primary flush started");
            }
            StreamEvent::FlushStop => {}
        }
        self.sink.event(&event);
        Ok(())
    }

    /// Processes one primary frame and pushes exactly one frame downstream.
    ///
    /// Once the flush signal is raised frames are dropped with
    /// [`FlowError::Flushing`].
    pub fn chain(&mut self, frame: Frame) -> FlowResult {
        if self.shared.slot.is_flushing() {
            trace!(sequence = frame.sequence(), "flushing, dropping frame");
            return Err(FlowError::Flushing);
        }

        let snapshot = self.shared.control.snapshot();
        let Some(format) = snapshot.primary_format.clone() else {
            warn!(sequence = frame.sequence(), "frame before caps, rejecting");
            return Err(FlowError::NotNegotiated);
        };

        let frame = self.process(frame, &snapshot, &format);
        self.push(frame)
    }

    fn process(
        &mut self,
        mut frame: Frame,
        snapshot: &ControlSnapshot,
        format: &Arc<FormatDescriptor>,
    ) -> Frame {
        self.shared.counters.lock().frames += 1;
        let settings = snapshot.settings;

        if self.eos {
            trace!(sequence = frame.sequence(), "after end of stream, passing through");
            return frame;
        }

        let Some(reference) = &snapshot.reference else {
            self.shared
                .control
                .publish_if_absent(frame.clone(), Arc::clone(format));
            return frame;
        };

        let comparator = FrameComparator::new(settings.compare_lines, settings.threshold);
        if !comparator.is_enabled() {
            return frame;
        }

        let comparison = match compare(&comparator, reference, &frame, format) {
            Ok(comparison) => comparison,
            Err(e) => {
                warn!(sequence = frame.sequence(), error = %e, "cannot map frame for comparison");
                self.shared.counters.lock().mapping_failures += 1;
                return frame;
            }
        };

        self.shared.counters.lock().last_score = comparison.score();
        if settings.silent {
            trace!(sequence = frame.sequence(), score = ?comparison.score(), "compared");
        } else {
            debug!(
                sequence = frame.sequence(),
                score = ?comparison.score(),
                threshold = settings.threshold,
                replace = comparison.is_replace(),
                "compared"
            );
        }

        if !comparison.is_replace() {
            return frame;
        }

        match self.shared.slot.take() {
            Taken::Frame(replacement) => match composite(&mut frame, format, &replacement) {
                Ok(stats) => {
                    self.shared.counters.lock().replaced += 1;
                    trace!(sequence = frame.sequence(), bytes = stats.bytes, "replaced pixels");
                }
                Err(e) => {
                    warn!(sequence = frame.sequence(), error = %e, "cannot map frames for replacement");
                    self.shared.counters.lock().mapping_failures += 1;
                }
            },
            Taken::Unavailable(reason) => {
                warn!(sequence = frame.sequence(), %reason, "no replacement frame available");
                self.shared.counters.lock().unavailable += 1;
            }
        }

        frame
    }

    fn push(&mut self, frame: Frame) -> FlowResult {
        let result = self.sink.push(frame);
        match &result {
            Ok(()) => {}
            Err(FlowError::Flushing) => {
                debug!("downstream flushing");
                self.shared.slot.signal_flushing();
            }
            Err(FlowError::Eos) => {
                // Nothing more will be pushed, so the replacement input is
                // closed too instead of only being woken.
                debug!("downstream reached end of stream");
                self.shared.slot.signal_eos();
            }
            Err(e) => {
                warn!(error = %e, "downstream push failed");
                self.shared.slot.wake_all();
            }
        }
        result
    }
}

fn compare(
    comparator: &FrameComparator,
    reference: &Reference,
    candidate: &Frame,
    format: &FormatDescriptor,
) -> Result<Comparison, MapError> {
    let reference_view = reference.frame().map_read(reference.format())?;
    let candidate_view = candidate.map_read(format)?;
    comparator.should_replace(&reference_view, &candidate_view)
}

fn composite(
    destination: &mut Frame,
    format: &FormatDescriptor,
    replacement: &Replacement,
) -> Result<CopyStats, MapError> {
    let source = replacement.frame.map_read(&replacement.format)?;
    let mut target = destination.map_write(format)?;
    Ok(overwrite(&mut target, &source))
}

/// Secondary path: feeds replacement frames into the handoff slot.
#[derive(Clone)]
pub struct ReplacementInput {
    shared: Arc<Shared>,
}

impl ReplacementInput {
    /// Marks a live replacement stream as connected.
    pub fn link(&self) {
        self.shared.slot.set_linked(true);
    }

    /// Marks the replacement stream as gone. A pending frame is then
    /// repeated for every later replace.
    pub fn unlink(&self) {
        self.shared.slot.set_linked(false);
    }

    pub fn is_linked(&self) -> bool {
        self.shared.slot.is_linked()
    }

    /// Handles an event on the replacement input. Nothing is forwarded.
    pub fn handle_event(&self, event: StreamEvent) -> Result<(), FormatError> {
        match event {
            StreamEvent::Caps(caps) => {
                let format = caps.resolve()?;
                let format = self.shared.control.set_replacement_format(format);
                info!(%format, "replacement caps negotiated");
            }
            StreamEvent::Eos => {
                debug!("replacement end of stream");
                self.shared.slot.signal_eos();
            }
            StreamEvent::FlushStart => {
                debug!("replacement flush started");
                self.shared.slot.signal_flushing();
            }
            StreamEvent::FlushStop => {}
        }
        Ok(())
    }

    /// Delivers one replacement frame, blocking while the previous one is
    /// still pending.
    pub fn chain(&self, frame: Frame) -> FlowResult {
        let Some(format) = self.shared.control.replacement_format() else {
            warn!(sequence = frame.sequence(), "replacement frame before caps, rejecting");
            return Err(FlowError::NotNegotiated);
        };

        self.shared
            .slot
            .deliver(Replacement { frame, format })
            .map_err(FlowError::from)
    }
}

/// Control handle: settings, the reset command, flush and statistics.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    pub fn settings(&self) -> Settings {
        self.shared.control.settings()
    }

    pub fn set_settings(&self, settings: Settings) -> Result<(), ConfigError> {
        self.shared.control.set_settings(settings)
    }

    pub fn update_settings(
        &self,
        update: impl FnOnce(&mut Settings),
    ) -> Result<Settings, ConfigError> {
        self.shared.control.update_settings(update)
    }

    /// One-shot reset: the next primary frame becomes the reference.
    pub fn reset_reference(&self) -> bool {
        self.shared.control.reset()
    }

    pub fn reference(&self) -> Option<Arc<Reference>> {
        self.shared.control.reference()
    }

    /// Raises the flush signal and releases both threads.
    pub fn flush(&self) {
        self.shared.slot.signal_flushing();
    }

    pub fn slot_state(&self) -> SlotState {
        self.shared.slot.state()
    }

    /// True once a flush reached the filter from any direction.
    pub fn is_flushing(&self) -> bool {
        self.shared.slot.is_flushing()
    }

    pub fn stats(&self) -> FilterStats {
        self.shared.stats()
    }
}
