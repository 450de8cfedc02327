//! The still-replace stage as a host sees it.
//!
//! ```text
//! primary ──▶ StillReplaceFilter ──▶ FrameSink
//!                    ▲
//! replacement ──▶ ReplacementInput (single-slot handoff)
//! ```
//!
//! Each primary frame is compared with the reference still captured from
//! the first primary frame. When it scores above the threshold the next
//! replacement frame is taken from the handoff slot and copied over it.
//! Local problems (unmappable frames, no replacement) never halt the
//! stream; the frame is forwarded unmodified.

mod flow;
mod orchestrator;

pub use flow::{Caps, FlowError, FlowResult, FrameSink, StreamEvent};
pub use orchestrator::{Controller, FilterStats, ReplacementInput, StillReplaceFilter};
