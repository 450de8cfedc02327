//! Frame type: a shared pixel payload plus non-pixel metadata.

use super::FormatDescriptor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Raised when a payload cannot be viewed under a layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("payload of {actual} bytes is smaller than the {needed} bytes the layout requires")]
    PayloadTooSmall { needed: usize, actual: usize },
}

/// Timing and flags carried alongside the pixels.
///
/// Forwarded untouched when the pixels of a frame are replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMeta {
    /// Monotonic sequence number assigned by the producer.
    pub sequence: u64,
    /// Presentation timestamp.
    pub pts: Option<Duration>,
    /// Frame duration.
    pub duration: Option<Duration>,
    /// Set on the first frame after a gap in the stream.
    pub discont: bool,
}

/// One unit of pixel data flowing through the stream.
///
/// Cloning shares the payload. Writers go through [`Frame::map_write`],
/// which copies the payload first if any other holder still shares it.
#[derive(Clone)]
pub struct Frame {
    data: Arc<Vec<u8>>,
    meta: FrameMeta,
}

impl Frame {
    /// Creates a frame owning `data`.
    pub fn new(data: Vec<u8>, meta: FrameMeta) -> Self {
        Self {
            data: Arc::new(data),
            meta,
        }
    }

    /// Creates a frame with only a sequence number set.
    pub fn with_sequence(data: Vec<u8>, sequence: u64) -> Self {
        Self::new(
            data,
            FrameMeta {
                sequence,
                ..Default::default()
            },
        )
    }

    /// Returns the raw payload.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn meta(&self) -> &FrameMeta {
        &self.meta
    }

    #[inline]
    pub fn meta_mut(&mut self) -> &mut FrameMeta {
        &mut self.meta
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    /// Returns true if another holder shares the payload.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// Returns true if both frames point at the same payload.
    pub fn shares_payload_with(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Maps the payload for reading under `format`.
    pub fn map_read<'a>(
        &'a self,
        format: &'a FormatDescriptor,
    ) -> Result<FrameView<'a>, MapError> {
        check_size(self.data.len(), format)?;
        Ok(FrameView {
            data: &self.data,
            format,
        })
    }

    /// Maps the payload for writing under `format`.
    ///
    /// A shared payload is copied first so other holders never observe
    /// the write.
    pub fn map_write<'a>(
        &'a mut self,
        format: &'a FormatDescriptor,
    ) -> Result<FrameViewMut<'a>, MapError> {
        check_size(self.data.len(), format)?;
        if self.is_shared() {
            tracing::trace!(sequence = self.meta.sequence, "copying shared payload before write");
        }
        Ok(FrameViewMut {
            data: Arc::make_mut(&mut self.data).as_mut_slice(),
            format,
        })
    }
}

fn check_size(actual: usize, format: &FormatDescriptor) -> Result<(), MapError> {
    let needed = format.min_size();
    if actual < needed {
        return Err(MapError::PayloadTooSmall { needed, actual });
    }
    Ok(())
}

fn plane_range(format: &FormatDescriptor, plane: usize) -> Option<std::ops::Range<usize>> {
    let layout = format.planes().get(plane)?;
    let start = layout.offset;
    Some(start..start + layout.stride * format.height() as usize)
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.meta.sequence)
            .field("pts", &self.meta.pts)
            .field("payload_bytes", &self.data.len())
            .field("shared", &self.is_shared())
            .finish()
    }
}

/// Read-only view of a mapped frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [u8],
    format: &'a FormatDescriptor,
}

impl<'a> FrameView<'a> {
    #[inline]
    pub fn format(&self) -> &'a FormatDescriptor {
        self.format
    }

    #[inline]
    pub fn n_planes(&self) -> usize {
        self.format.n_planes()
    }

    #[inline]
    pub fn stride(&self, plane: usize) -> usize {
        self.format.stride(plane)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.format.height() as usize
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.format.components()
    }

    /// Returns `stride * height` bytes of `plane`.
    pub fn plane(&self, plane: usize) -> Option<&'a [u8]> {
        plane_range(self.format, plane).map(|r| &self.data[r])
    }
}

/// Writable view of a mapped frame.
#[derive(Debug)]
pub struct FrameViewMut<'a> {
    data: &'a mut [u8],
    format: &'a FormatDescriptor,
}

impl<'a> FrameViewMut<'a> {
    #[inline]
    pub fn format(&self) -> &FormatDescriptor {
        self.format
    }

    #[inline]
    pub fn n_planes(&self) -> usize {
        self.format.n_planes()
    }

    #[inline]
    pub fn stride(&self, plane: usize) -> usize {
        self.format.stride(plane)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.format.height() as usize
    }

    /// Returns `stride * height` writable bytes of `plane`.
    pub fn plane_mut(&mut self, plane: usize) -> Option<&mut [u8]> {
        plane_range(self.format, plane).map(|r| &mut self.data[r])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PixelFormat;

    fn gray(width: u32, height: u32) -> FormatDescriptor {
        FormatDescriptor::resolve(PixelFormat::Gray8, width, height).unwrap()
    }

    #[test]
    fn test_frame_creation() {
        let frame = Frame::with_sequence(vec![0u8; 64], 7);
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.data().len(), 64);
        assert!(!frame.is_shared());
    }

    #[test]
    fn test_map_read_too_small() {
        let frame = Frame::with_sequence(vec![0u8; 10], 1);
        let format = gray(8, 8);
        assert!(matches!(
            frame.map_read(&format),
            Err(MapError::PayloadTooSmall { needed: 64, actual: 10 })
        ));
    }

    #[test]
    fn test_plane_view_covers_stride_times_height() {
        let frame = Frame::with_sequence(vec![3u8; 100], 1);
        let format = FormatDescriptor::packed(PixelFormat::Gray8, 8, 10, 10).unwrap();
        let view = frame.map_read(&format).unwrap();
        assert_eq!(view.plane(0).unwrap().len(), 100);
        assert!(view.plane(1).is_none());
    }

    #[test]
    fn test_map_write_copies_shared_payload() {
        let original = Frame::with_sequence(vec![1u8; 64], 1);
        let mut writer = original.clone();
        assert!(writer.shares_payload_with(&original));

        let format = gray(8, 8);
        {
            let mut view = writer.map_write(&format).unwrap();
            view.plane_mut(0).unwrap().fill(9);
        }

        assert!(!writer.shares_payload_with(&original));
        assert!(original.data().iter().all(|&b| b == 1));
        assert!(writer.data().iter().all(|&b| b == 9));
    }

    #[test]
    fn test_map_write_in_place_when_unique() {
        let mut frame = Frame::with_sequence(vec![1u8; 64], 1);
        let before = frame.data().as_ptr();
        let format = gray(8, 8);
        frame.map_write(&format).unwrap().plane_mut(0).unwrap()[0] = 5;
        assert_eq!(frame.data().as_ptr(), before);
        assert_eq!(frame.data()[0], 5);
    }
}
