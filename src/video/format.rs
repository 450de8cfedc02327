//! Pixel formats and resolved frame layouts.
//!
//! A [`FormatDescriptor`] is what the host hands over once caps have been
//! negotiated on an input. The primary and replacement inputs each carry
//! their own descriptor and the two may differ in stride and height.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Row alignment applied by [`FormatDescriptor::resolve`].
const ROW_ALIGN: usize = 4;

/// Errors raised while resolving a layout. These reject the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unknown pixel format: {0}")]
    UnknownFormat(String),
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("components per pixel must be non-zero")]
    NoComponents,
    #[error("layout has no planes")]
    NoPlanes,
    #[error("plane {plane} stride {stride} is shorter than a row of {row_bytes} bytes")]
    StrideTooShort {
        plane: usize,
        stride: usize,
        row_bytes: usize,
    },
}

/// Packed 8-bit pixel formats accepted on every input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelFormat {
    Rgbx,
    Xrgb,
    Bgrx,
    Xbgr,
    Rgba,
    Argb,
    Bgra,
    Abgr,
    Rgb,
    Bgr,
    Gray8,
}

impl PixelFormat {
    /// Bytes (8-bit components) per pixel. Padding bytes count.
    pub fn components(self) -> usize {
        match self {
            Self::Rgbx
            | Self::Xrgb
            | Self::Bgrx
            | Self::Xbgr
            | Self::Rgba
            | Self::Argb
            | Self::Bgra
            | Self::Abgr => 4,
            Self::Rgb | Self::Bgr => 3,
            Self::Gray8 => 1,
        }
    }

    /// Canonical caps name of the format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rgbx => "RGBx",
            Self::Xrgb => "xRGB",
            Self::Bgrx => "BGRx",
            Self::Xbgr => "xBGR",
            Self::Rgba => "RGBA",
            Self::Argb => "ARGB",
            Self::Bgra => "BGRA",
            Self::Abgr => "ABGR",
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Gray8 => "GRAY8",
        }
    }

    /// All supported formats.
    pub const ALL: [PixelFormat; 11] = [
        Self::Rgbx,
        Self::Xrgb,
        Self::Bgrx,
        Self::Xbgr,
        Self::Rgba,
        Self::Argb,
        Self::Bgra,
        Self::Abgr,
        Self::Rgb,
        Self::Bgr,
        Self::Gray8,
    ];
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FormatError::UnknownFormat(s.to_string()))
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PixelFormat> for String {
    fn from(value: PixelFormat) -> Self {
        value.name().to_string()
    }
}

/// Location of one plane inside a frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset of the first row.
    pub offset: usize,
    /// Distance in bytes between the starts of consecutive rows.
    pub stride: usize,
}

/// Resolved pixel layout of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    format: PixelFormat,
    width: u32,
    height: u32,
    components: usize,
    planes: Vec<PlaneLayout>,
}

impl FormatDescriptor {
    /// Resolves the default single-plane layout for `format`.
    ///
    /// Rows are padded to a multiple of four bytes.
    pub fn resolve(format: PixelFormat, width: u32, height: u32) -> Result<Self, FormatError> {
        let row_bytes = width as usize * format.components();
        let stride = row_bytes.div_ceil(ROW_ALIGN) * ROW_ALIGN;
        Self::with_planes(
            format,
            width,
            height,
            format.components(),
            vec![PlaneLayout { offset: 0, stride }],
        )
    }

    /// Builds a layout from explicit planes.
    pub fn with_planes(
        format: PixelFormat,
        width: u32,
        height: u32,
        components: usize,
        planes: Vec<PlaneLayout>,
    ) -> Result<Self, FormatError> {
        if width == 0 || height == 0 {
            return Err(FormatError::InvalidDimensions { width, height });
        }
        if components == 0 {
            return Err(FormatError::NoComponents);
        }
        if planes.is_empty() {
            return Err(FormatError::NoPlanes);
        }
        let row_bytes = width as usize * components;
        for (plane, layout) in planes.iter().enumerate() {
            if layout.stride < row_bytes {
                return Err(FormatError::StrideTooShort {
                    plane,
                    stride: layout.stride,
                    row_bytes,
                });
            }
        }

        Ok(Self {
            format,
            width,
            height,
            components,
            planes,
        })
    }

    /// Builds a single-plane layout with an explicit stride.
    pub fn packed(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: usize,
    ) -> Result<Self, FormatError> {
        Self::with_planes(
            format,
            width,
            height,
            format.components(),
            vec![PlaneLayout { offset: 0, stride }],
        )
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved components per pixel.
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    #[inline]
    pub fn n_planes(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn planes(&self) -> &[PlaneLayout] {
        &self.planes
    }

    /// Stride of `plane`, or 0 when the plane does not exist.
    pub fn stride(&self, plane: usize) -> usize {
        self.planes.get(plane).map_or(0, |p| p.stride)
    }

    /// Minimum payload size needed to map a frame under this layout.
    pub fn min_size(&self) -> usize {
        self.planes
            .iter()
            .map(|p| p.offset + p.stride * self.height as usize)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} ({} plane(s), stride {})",
            self.format,
            self.width,
            self.height,
            self.planes.len(),
            self.stride(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_names() {
        assert_eq!("rgbx".parse::<PixelFormat>().unwrap(), PixelFormat::Rgbx);
        assert_eq!("xBGR".parse::<PixelFormat>().unwrap(), PixelFormat::Xbgr);
        assert_eq!("gray8".parse::<PixelFormat>().unwrap(), PixelFormat::Gray8);
        assert!(matches!(
            "I420".parse::<PixelFormat>(),
            Err(FormatError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_resolve_pads_rows() {
        let desc = FormatDescriptor::resolve(PixelFormat::Rgb, 5, 2).unwrap();
        // 5 * 3 = 15 bytes, padded to 16
        assert_eq!(desc.stride(0), 16);
        assert_eq!(desc.components(), 3);
        assert_eq!(desc.min_size(), 32);
    }

    #[test]
    fn test_resolve_rejects_zero_dimensions() {
        assert!(matches!(
            FormatDescriptor::resolve(PixelFormat::Rgba, 0, 10),
            Err(FormatError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_short_stride_rejected() {
        let result = FormatDescriptor::packed(PixelFormat::Rgba, 10, 10, 39);
        assert!(matches!(
            result,
            Err(FormatError::StrideTooShort { plane: 0, .. })
        ));
    }

    #[test]
    fn test_missing_plane_stride_is_zero() {
        let desc = FormatDescriptor::resolve(PixelFormat::Gray8, 8, 8).unwrap();
        assert_eq!(desc.stride(1), 0);
    }
}
