//! Bounded pixel copy from a replacement frame into an outgoing frame.

use crate::video::{FrameView, FrameViewMut};

/// What a call to [`overwrite`] actually touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Planes copied.
    pub planes: usize,
    /// Rows copied per plane.
    pub rows: usize,
    /// Total bytes written.
    pub bytes: usize,
}

/// Overwrites `destination` with the pixels of `source`.
///
/// Copies the overlapping planes and rows, and per row the shorter of the
/// two strides. Each cursor advances by its own frame's stride, so layouts
/// from the same format family but with different padding or height never
/// overrun either buffer.
pub fn overwrite(destination: &mut FrameViewMut<'_>, source: &FrameView<'_>) -> CopyStats {
    let planes = destination.n_planes().min(source.n_planes());
    let rows = destination.height().min(source.height());
    let mut stats = CopyStats {
        planes,
        rows,
        bytes: 0,
    };

    for plane in 0..planes {
        let dst_stride = destination.stride(plane);
        let src_stride = source.stride(plane);
        let row_bytes = dst_stride.min(src_stride);

        let (Some(dst), Some(src)) = (destination.plane_mut(plane), source.plane(plane)) else {
            continue;
        };

        for (dst_row, src_row) in dst
            .chunks_mut(dst_stride)
            .zip(src.chunks(src_stride))
            .take(rows)
        {
            let n = row_bytes.min(dst_row.len()).min(src_row.len());
            dst_row[..n].copy_from_slice(&src_row[..n]);
            stats.bytes += n;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{FormatDescriptor, Frame, PixelFormat};

    #[test]
    fn test_same_layout_full_copy() {
        let format = FormatDescriptor::resolve(PixelFormat::Gray8, 100, 10).unwrap();
        let mut destination = Frame::with_sequence(vec![100u8; 1000], 0);
        let source = Frame::with_sequence(vec![7u8; 1000], 1);

        let stats = {
            let src = source.map_read(&format).unwrap();
            let mut dst = destination.map_write(&format).unwrap();
            overwrite(&mut dst, &src)
        };

        assert_eq!(stats.bytes, 1000);
        assert_eq!(destination.data(), source.data());
    }

    #[test]
    fn test_wider_source_stride_is_clipped() {
        let dst_format = FormatDescriptor::packed(PixelFormat::Gray8, 4, 2, 4).unwrap();
        let src_format = FormatDescriptor::packed(PixelFormat::Gray8, 4, 3, 8).unwrap();
        let mut destination = Frame::with_sequence(vec![0u8; 8], 0);
        let source = Frame::with_sequence((1..=24).collect(), 1);

        let stats = {
            let src = source.map_read(&src_format).unwrap();
            let mut dst = destination.map_write(&dst_format).unwrap();
            overwrite(&mut dst, &src)
        };

        assert_eq!(stats.rows, 2);
        assert_eq!(stats.bytes, 8);
        // Row 0 from source bytes 0..4, row 1 from source bytes 8..12.
        assert_eq!(destination.data(), &[1, 2, 3, 4, 9, 10, 11, 12]);
    }

    #[test]
    fn test_narrower_source_leaves_padding() {
        let dst_format = FormatDescriptor::packed(PixelFormat::Gray8, 2, 3, 4).unwrap();
        let src_format = FormatDescriptor::packed(PixelFormat::Gray8, 2, 2, 2).unwrap();
        let mut destination = Frame::with_sequence(vec![0xEE; 12], 0);
        let source = Frame::with_sequence(vec![1, 2, 3, 4], 1);

        let stats = {
            let src = source.map_read(&src_format).unwrap();
            let mut dst = destination.map_write(&dst_format).unwrap();
            overwrite(&mut dst, &src)
        };

        assert_eq!(stats.bytes, 4);
        assert_eq!(
            destination.data(),
            &[1, 2, 0xEE, 0xEE, 3, 4, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE]
        );
    }

    #[test]
    fn test_shared_destination_is_copied_on_write() {
        let format = FormatDescriptor::resolve(PixelFormat::Gray8, 4, 1).unwrap();
        let original = Frame::with_sequence(vec![0u8; 4], 0);
        let mut destination = original.clone();
        let source = Frame::with_sequence(vec![5u8; 4], 1);

        {
            let src = source.map_read(&format).unwrap();
            let mut dst = destination.map_write(&format).unwrap();
            overwrite(&mut dst, &src);
        }

        assert_eq!(original.data(), &[0, 0, 0, 0]);
        assert_eq!(destination.data(), &[5, 5, 5, 5]);
    }
}
