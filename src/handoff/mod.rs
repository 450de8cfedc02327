//! Cross-thread handoff of replacement frames.
//!
//! The slot has its own lock, never nested with the control-plane lock.

mod slot;

pub use slot::{CloseReason, Replacement, ReplacementSlot, SlotState, SlotStats, Taken};
