//! Frame producers.
//!
//! The filter never pulls frames itself; hosts push them in. This trait
//! exists so the CLI and tests can drive both inputs from synthetic
//! generators without a real capture pipeline.

use super::{FormatDescriptor, Frame, FrameMeta};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a frame source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not negotiated")]
    NotNegotiated,
    #[error("source exhausted after {0} frames")]
    Exhausted(u64),
}

/// Something that produces frames under a fixed layout.
pub trait FrameSource {
    /// Layout of every frame this source produces.
    fn format(&self) -> Option<&FormatDescriptor>;

    /// Produces the next frame.
    fn next_frame(&mut self) -> Result<Frame, SourceError>;
}

/// Fill rule for generated pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Every byte holds the same value.
    Solid(u8),
    /// Bytes vary with position and sequence number, so no two frames
    /// match.
    Moving,
}

/// Synthetic source that fills frames with a [`Pattern`].
#[derive(Debug)]
pub struct PatternSource {
    format: Option<FormatDescriptor>,
    pattern: Pattern,
    sequence: u64,
    frame_duration: Duration,
    limit: Option<u64>,
}

impl PatternSource {
    pub fn new(format: FormatDescriptor, pattern: Pattern) -> Self {
        Self {
            format: Some(format),
            pattern,
            sequence: 0,
            frame_duration: Duration::from_millis(40),
            limit: None,
        }
    }

    /// Sets the frame rate used to stamp timestamps.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_duration = Duration::from_secs(1) / fps.max(1);
        self
    }

    /// Stops the source after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Switches the fill rule for subsequent frames.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    #[inline]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Number of frames produced so far.
    #[inline]
    pub fn produced(&self) -> u64 {
        self.sequence
    }
}

impl FrameSource for PatternSource {
    fn format(&self) -> Option<&FormatDescriptor> {
        self.format.as_ref()
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        let format = self.format.as_ref().ok_or(SourceError::NotNegotiated)?;
        if self.limit.is_some_and(|limit| self.sequence >= limit) {
            return Err(SourceError::Exhausted(self.sequence));
        }

        let size = format.min_size();
        let pixels: Vec<u8> = match self.pattern {
            Pattern::Solid(value) => vec![value; size],
            Pattern::Moving => (0..size)
                .map(|i| ((i as u64).wrapping_mul(31) ^ self.sequence.wrapping_mul(97)) as u8)
                .collect(),
        };

        let meta = FrameMeta {
            sequence: self.sequence,
            pts: u32::try_from(self.sequence)
                .ok()
                .and_then(|n| self.frame_duration.checked_mul(n)),
            duration: Some(self.frame_duration),
            discont: self.sequence == 0,
        };
        self.sequence += 1;
        Ok(Frame::new(pixels, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PixelFormat;

    fn format() -> FormatDescriptor {
        FormatDescriptor::resolve(PixelFormat::Rgba, 4, 4).unwrap()
    }

    #[test]
    fn test_solid_frames() {
        let mut source = PatternSource::new(format(), Pattern::Solid(42));
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.data().len(), 64);
        assert!(frame.data().iter().all(|&b| b == 42));
        assert!(frame.meta().discont);
    }

    #[test]
    fn test_sequence_and_timestamps_advance() {
        let mut source = PatternSource::new(format(), Pattern::Moving).with_fps(25);
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();

        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
        assert_eq!(second.meta().pts, Some(Duration::from_millis(40)));
        assert!(!second.meta().discont);
        assert_ne!(first.data(), second.data());
    }

    #[test]
    fn test_timestamp_beyond_u32_sequence_is_unset() {
        let mut source = PatternSource::new(format(), Pattern::Solid(0));
        source.sequence = u64::from(u32::MAX) + 1;
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.sequence(), u64::from(u32::MAX) + 1);
        assert_eq!(frame.meta().pts, None);
    }

    #[test]
    fn test_limit_exhausts_source() {
        let mut source = PatternSource::new(format(), Pattern::Solid(0)).with_limit(1);
        assert!(source.next_frame().is_ok());
        assert!(matches!(source.next_frame(), Err(SourceError::Exhausted(1))));
    }
}
