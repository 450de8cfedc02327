//! Still Replace Filter Library
//!
//! A streaming video stage that watches a primary stream for frames that
//! match a captured reference still, and overwrites those frames with
//! pixels delivered on an independently clocked replacement input.
//!
//! # Architecture
//!
//! ```text
//!  primary thread                         replacement thread
//!       │                                        │
//!       ▼                                        ▼
//!  reference ──▶ analysis ──▶ handoff::take ◀── handoff::deliver
//!                                 │
//!                                 ▼
//!                              compose ──▶ downstream sink
//! ```
//!
//! The crate creates no threads. The host calls into the primary handle
//! and the replacement handle from its own two threads.
//!
//! # Design Principles
//!
//! - **Fail-open**: unmappable frames or a missing replacement forward the
//!   frame unmodified; the stream never stalls on local problems
//! - **Depth-one handoff**: the replacement input never runs more than one
//!   frame ahead of consumption
//! - **Separate locks**: the control-plane lock is never held across a
//!   handoff wait
//! - **Whole-value swaps**: the reference is replaced, never mutated, so a
//!   comparison in flight is unaffected by a reset
//!
//! # Example
//!
//! ```no_run
//! use still_replace::{
//!     config::Settings,
//!     filter::{Caps, FlowResult, FrameSink, StillReplaceFilter, StreamEvent},
//!     video::Frame,
//! };
//!
//! struct Discard;
//!
//! impl FrameSink for Discard {
//!     fn push(&mut self, _frame: Frame) -> FlowResult {
//!         Ok(())
//!     }
//! }
//!
//! let mut filter = StillReplaceFilter::new(Settings::default(), Discard).unwrap();
//! let replacement = filter.replacement_input();
//! replacement.link();
//!
//! let caps = Caps::new("GRAY8", 4, 4);
//! filter.handle_event(StreamEvent::Caps(caps.clone())).unwrap();
//! replacement.handle_event(StreamEvent::Caps(caps)).unwrap();
//!
//! std::thread::spawn(move || {
//!     let _ = replacement.chain(Frame::with_sequence(vec![255; 16], 0));
//! });
//!
//! // First frame becomes the reference, the second matches it.
//! filter.chain(Frame::with_sequence(vec![0; 16], 0)).unwrap();
//! filter.chain(Frame::with_sequence(vec![0; 16], 1)).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod compose;
pub mod config;
pub mod filter;
pub mod handoff;
pub mod metrics;
pub mod reference;
pub mod video;

// Re-export commonly used types at crate root
pub use analysis::{Comparison, FrameComparator};
pub use config::{FileConfig, Settings};
pub use filter::{
    Caps, Controller, FilterStats, FlowError, FlowResult, FrameSink, ReplacementInput,
    StillReplaceFilter, StreamEvent,
};
pub use video::{FormatDescriptor, Frame, FrameMeta, PixelFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
