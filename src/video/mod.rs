//! Frames, pixel layouts and synthetic sources.
//!
//! A frame is only a payload plus timing metadata. How its bytes are laid
//! out is described separately by the [`FormatDescriptor`] negotiated on the
//! input it arrived on.

mod format;
mod frame;
mod source;

pub use format::{FormatDescriptor, FormatError, PixelFormat, PlaneLayout};
pub use frame::{Frame, FrameMeta, FrameView, FrameViewMut, MapError};
pub use source::{FrameSource, Pattern, PatternSource, SourceError};
