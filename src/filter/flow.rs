//! Host-facing flow types: downstream sink, flow results and stream events.

use crate::handoff::CloseReason;
use crate::video::{FormatDescriptor, FormatError, Frame, PixelFormat};
use thiserror::Error;

/// Non-success outcomes of pushing a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("flushing")]
    Flushing,
    #[error("end of stream")]
    Eos,
    #[error("downstream not linked")]
    NotLinked,
    #[error("caps not negotiated")]
    NotNegotiated,
    #[error("{0}")]
    Error(String),
}

impl From<CloseReason> for FlowError {
    fn from(reason: CloseReason) -> Self {
        match reason {
            CloseReason::Eos => Self::Eos,
            CloseReason::Flushing => Self::Flushing,
        }
    }
}

pub type FlowResult = Result<(), FlowError>;

/// Negotiated stream caps, before layout resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Explicit row stride; the default padded stride when `None`.
    pub stride: Option<usize>,
}

impl Caps {
    pub fn new(format: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            format: format.into(),
            width,
            height,
            stride: None,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    /// Resolves the caps into a layout.
    pub fn resolve(&self) -> Result<FormatDescriptor, FormatError> {
        let format: PixelFormat = self.format.parse()?;
        match self.stride {
            Some(stride) => FormatDescriptor::packed(format, self.width, self.height, stride),
            None => FormatDescriptor::resolve(format, self.width, self.height),
        }
    }
}

impl From<&FormatDescriptor> for Caps {
    fn from(desc: &FormatDescriptor) -> Self {
        Self {
            format: desc.format().name().to_string(),
            width: desc.width(),
            height: desc.height(),
            stride: Some(desc.stride(0)),
        }
    }
}

/// Serialized events travelling alongside frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Caps(Caps),
    Eos,
    FlushStart,
    FlushStop,
}

/// The downstream consumer of the primary path.
pub trait FrameSink: Send {
    /// Hands one frame downstream.
    fn push(&mut self, frame: Frame) -> FlowResult;

    /// Receives an event forwarded from the primary input.
    fn event(&mut self, _event: &StreamEvent) {}
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn push(&mut self, frame: Frame) -> FlowResult {
        (**self).push(frame)
    }

    fn event(&mut self, event: &StreamEvent) {
        (**self).event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_resolve() {
        let desc = Caps::new("RGB", 5, 2).resolve().unwrap();
        assert_eq!(desc.stride(0), 16);

        let desc = Caps::new("RGB", 5, 2).with_stride(20).resolve().unwrap();
        assert_eq!(desc.stride(0), 20);
    }

    #[test]
    fn test_caps_reject_unknown_format() {
        assert!(matches!(
            Caps::new("YUY2", 4, 4).resolve(),
            Err(FormatError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_caps_roundtrip_through_descriptor() {
        let desc = Caps::new("bgrx", 8, 2).resolve().unwrap();
        assert_eq!(Caps::from(&desc).resolve().unwrap(), desc);
    }

    #[test]
    fn test_close_reason_maps_to_flow() {
        assert_eq!(FlowError::from(CloseReason::Eos), FlowError::Eos);
        assert_eq!(FlowError::from(CloseReason::Flushing), FlowError::Flushing);
    }
}
