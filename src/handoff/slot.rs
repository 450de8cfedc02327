//! Single-slot mailbox between the replacement input and the primary path.
//!
//! The replacement thread blocks in [`ReplacementSlot::deliver`] while a
//! frame is still pending, so it can never run more than one frame ahead
//! of consumption. The primary thread blocks in [`ReplacementSlot::take`]
//! until a frame, end-of-stream or a flush arrives.

use crate::video::{FormatDescriptor, Frame};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;

/// A replacement frame and the layout it was delivered under.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub frame: Frame,
    pub format: Arc<FormatDescriptor>,
}

/// Why the slot stopped accepting frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Eos,
    Flushing,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eos => f.write_str("end of stream"),
            Self::Flushing => f.write_str("flushing"),
        }
    }
}

/// Lifecycle of the slot. `Eos` and `Flushing` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Open,
    Eos,
    Flushing,
}

impl SlotState {
    fn closed(self) -> Option<CloseReason> {
        match self {
            Self::Open => None,
            Self::Eos => Some(CloseReason::Eos),
            Self::Flushing => Some(CloseReason::Flushing),
        }
    }
}

/// Result of [`ReplacementSlot::take`].
#[derive(Debug)]
pub enum Taken {
    Frame(Replacement),
    Unavailable(CloseReason),
}

/// Running counters, read for metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    /// Frames stored by `deliver`.
    pub delivered: u64,
    /// Frames moved out by `take`.
    pub taken: u64,
    /// Repeat-last hand-outs while the input is unlinked.
    pub repeated: u64,
    /// Frames dropped because the slot was closed or flushed.
    pub discarded: u64,
}

#[derive(Debug)]
struct Inner {
    state: SlotState,
    pending: Option<Replacement>,
    linked: bool,
    /// Raised by every flush, even one arriving after `Eos`.
    flushing: bool,
    stats: SlotStats,
}

/// Depth-one handoff queue.
#[derive(Debug)]
pub struct ReplacementSlot {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl ReplacementSlot {
    /// Creates an open, empty, unlinked slot.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SlotState::Open,
                pending: None,
                linked: false,
                flushing: false,
                stats: SlotStats::default(),
            }),
            changed: Condvar::new(),
        }
    }

    /// Stores `replacement`, waiting while a previous frame is pending.
    ///
    /// Once the slot is closed the frame is dropped and the close reason is
    /// returned.
    pub fn deliver(&self, replacement: Replacement) -> Result<(), CloseReason> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(reason) = inner.state.closed() {
                inner.stats.discarded += 1;
                tracing::trace!(%reason, "replacement discarded, slot closed");
                return Err(reason);
            }
            if inner.pending.is_none() {
                break;
            }
            self.changed.wait(&mut inner);
        }

        inner.pending = Some(replacement);
        inner.stats.delivered += 1;
        self.changed.notify_all();
        Ok(())
    }

    /// Takes the pending frame, waiting until one arrives or the slot
    /// closes.
    ///
    /// While the replacement input is unlinked a pending frame is handed out
    /// again on every call without being removed.
    pub fn take(&self) -> Taken {
        let mut inner = self.inner.lock();
        if !inner.linked {
            if let Some(pending) = inner.pending.clone() {
                inner.stats.repeated += 1;
                return Taken::Frame(pending);
            }
        }

        loop {
            if let Some(replacement) = inner.pending.take() {
                inner.stats.taken += 1;
                self.changed.notify_all();
                return Taken::Frame(replacement);
            }
            if let Some(reason) = inner.state.closed() {
                return Taken::Unavailable(reason);
            }
            self.changed.wait(&mut inner);
        }
    }

    /// Moves the slot to `Eos` and wakes every waiter.
    pub fn signal_eos(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SlotState::Open {
            inner.state = SlotState::Eos;
            tracing::debug!("replacement slot reached end of stream");
        }
        self.changed.notify_all();
    }

    /// Moves the slot to `Flushing`, drops any pending frame and wakes
    /// every waiter.
    ///
    /// A slot already at `Eos` keeps that state but still drops its frame
    /// and reports [`is_flushing`](Self::is_flushing).
    pub fn signal_flushing(&self) {
        let mut inner = self.inner.lock();
        inner.flushing = true;
        if inner.state == SlotState::Open {
            inner.state = SlotState::Flushing;
            tracing::debug!("replacement slot flushing");
        }
        if inner.pending.take().is_some() {
            inner.stats.discarded += 1;
        }
        self.changed.notify_all();
    }

    /// Wakes every waiter without changing state.
    pub fn wake_all(&self) {
        let _inner = self.inner.lock();
        self.changed.notify_all();
    }

    /// Records whether a live replacement stream is connected.
    pub fn set_linked(&self, linked: bool) {
        let mut inner = self.inner.lock();
        inner.linked = linked;
        self.changed.notify_all();
    }

    pub fn is_linked(&self) -> bool {
        self.inner.lock().linked
    }

    pub fn state(&self) -> SlotState {
        self.inner.lock().state
    }

    /// True once a flush was signalled, whatever the terminal state.
    pub fn is_flushing(&self) -> bool {
        self.inner.lock().flushing
    }

    pub fn is_occupied(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    pub fn stats(&self) -> SlotStats {
        self.inner.lock().stats
    }
}

impl Default for ReplacementSlot {
    fn default() -> Self {
        Self::new()
    }
}
