//! Reference-vs-candidate comparison.
//!
//! The trigger condition is "too similar to the reference": a candidate is
//! replaced as soon as any single plane/channel scores above the threshold.

use super::similarity::{channel_mse, psnr, ChannelScore};
use crate::video::{FrameView, MapError};
use std::ops::ControlFlow;

/// Outcome of [`FrameComparator::should_replace`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    /// Threshold is 0; nothing was scanned.
    Disabled,
    /// A channel scored above the threshold.
    Replace(ChannelScore),
    /// No channel crossed the threshold. Carries the highest score seen.
    Keep(Option<ChannelScore>),
}

impl Comparison {
    #[inline]
    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Replace(_))
    }

    /// Score that decided the outcome, if any channel was scanned.
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Disabled => None,
            Self::Replace(score) => Some(score.psnr),
            Self::Keep(best) => best.map(|s| s.psnr),
        }
    }
}

/// Scores candidates against a reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameComparator {
    compare_lines: u32,
    threshold: u32,
}

impl FrameComparator {
    /// `compare_lines == 0` compares the full height; `threshold == 0`
    /// disables comparison.
    pub fn new(compare_lines: u32, threshold: u32) -> Self {
        Self {
            compare_lines,
            threshold,
        }
    }

    #[inline]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.threshold > 0
    }

    /// Rows compared for a frame of `height` rows.
    pub fn lines_to_compare(&self, height: usize) -> usize {
        match self.compare_lines as usize {
            0 => height,
            lines if lines > height => height,
            lines => lines,
        }
    }

    /// Scores every plane/channel pair.
    pub fn score(
        &self,
        reference: &FrameView<'_>,
        candidate: &FrameView<'_>,
    ) -> Result<Vec<ChannelScore>, MapError> {
        let mut scores = Vec::new();
        self.scan(reference, candidate, |score| {
            scores.push(score);
            ControlFlow::Continue(())
        })?;
        Ok(scores)
    }

    /// Decides whether `candidate` should be replaced.
    ///
    /// Stops at the first channel whose score exceeds the threshold.
    pub fn should_replace(
        &self,
        reference: &FrameView<'_>,
        candidate: &FrameView<'_>,
    ) -> Result<Comparison, MapError> {
        if !self.is_enabled() {
            return Ok(Comparison::Disabled);
        }

        let threshold = self.threshold as f64;
        let mut best: Option<ChannelScore> = None;
        let mut hit = None;
        self.scan(reference, candidate, |score| {
            if score.psnr > threshold {
                hit = Some(score);
                return ControlFlow::Break(());
            }
            if best.map_or(true, |b| score.psnr > b.psnr) {
                best = Some(score);
            }
            ControlFlow::Continue(())
        })?;

        Ok(match hit {
            Some(score) => Comparison::Replace(score),
            None => Comparison::Keep(best),
        })
    }

    fn scan(
        &self,
        reference: &FrameView<'_>,
        candidate: &FrameView<'_>,
        mut visit: impl FnMut(ChannelScore) -> ControlFlow<()>,
    ) -> Result<(), MapError> {
        let lines = self.lines_to_compare(candidate.height());
        let components = candidate.components();
        let planes = reference.n_planes().min(candidate.n_planes());

        for plane in 0..planes {
            let stride = candidate.stride(plane);
            let len = stride * lines;
            let ref_bytes = sampled(reference, plane, len)?;
            let cand_bytes = sampled(candidate, plane, len)?;

            for channel in 0..components {
                let mse = channel_mse(ref_bytes, cand_bytes, channel, components, stride, lines);
                let score = ChannelScore {
                    plane,
                    channel,
                    mse,
                    psnr: psnr(mse),
                };
                if visit(score).is_break() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// First `len` bytes of `plane`, or an error if the plane is shorter.
fn sampled<'a>(view: &FrameView<'a>, plane: usize, len: usize) -> Result<&'a [u8], MapError> {
    let bytes = view.plane(plane).unwrap_or_default();
    bytes.get(..len).ok_or(MapError::PayloadTooSmall {
        needed: len,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{FormatDescriptor, Frame, PixelFormat};
    use proptest::prelude::*;

    fn gray(width: u32, height: u32) -> FormatDescriptor {
        FormatDescriptor::resolve(PixelFormat::Gray8, width, height).unwrap()
    }

    #[test]
    fn test_lines_to_compare() {
        assert_eq!(FrameComparator::new(0, 50).lines_to_compare(10), 10);
        assert_eq!(FrameComparator::new(4, 50).lines_to_compare(10), 4);
        assert_eq!(FrameComparator::new(40, 50).lines_to_compare(10), 10);
    }

    #[test]
    fn test_identical_frames_replace() {
        let format = gray(100, 10);
        let reference = Frame::with_sequence(vec![100u8; 1000], 0);
        let candidate = Frame::with_sequence(vec![100u8; 1000], 1);

        let comparison = FrameComparator::new(0, 50)
            .should_replace(
                &reference.map_read(&format).unwrap(),
                &candidate.map_read(&format).unwrap(),
            )
            .unwrap();

        assert!(comparison.is_replace());
        assert!(comparison.score().unwrap().is_infinite());
    }

    #[test]
    fn test_large_difference_keeps() {
        let format = gray(100, 10);
        let reference = Frame::with_sequence(vec![0u8; 1000], 0);
        let candidate = Frame::with_sequence(vec![200u8; 1000], 1);

        let comparison = FrameComparator::new(0, 50)
            .should_replace(
                &reference.map_read(&format).unwrap(),
                &candidate.map_read(&format).unwrap(),
            )
            .unwrap();

        assert!(!comparison.is_replace());
        assert!(comparison.score().unwrap() <= 50.0);
    }

    #[test]
    fn test_threshold_zero_disabled() {
        let format = gray(8, 8);
        let frame = Frame::with_sequence(vec![1u8; 64], 0);
        let view = frame.map_read(&format).unwrap();

        let comparison = FrameComparator::new(0, 0).should_replace(&view, &view).unwrap();
        assert_eq!(comparison, Comparison::Disabled);
    }

    #[test]
    fn test_compare_lines_ignores_bottom_rows() {
        let format = gray(12, 10);
        let reference = Frame::with_sequence(vec![50u8; 120], 0);
        let mut data = vec![50u8; 120];
        data[60..].fill(250);
        let candidate = Frame::with_sequence(data, 1);
        let r = reference.map_read(&format).unwrap();
        let c = candidate.map_read(&format).unwrap();

        assert!(FrameComparator::new(5, 60).should_replace(&r, &c).unwrap().is_replace());
        assert!(!FrameComparator::new(0, 60).should_replace(&r, &c).unwrap().is_replace());
    }

    #[test]
    fn test_any_single_channel_triggers() {
        // Channel 0 identical, channel 1 wildly different.
        let format = FormatDescriptor::with_planes(
            PixelFormat::Gray8,
            4,
            2,
            2,
            vec![crate::video::PlaneLayout { offset: 0, stride: 8 }],
        )
        .unwrap();
        let reference = Frame::with_sequence([10u8, 0].repeat(8), 0);
        let candidate = Frame::with_sequence([10u8, 255].repeat(8), 1);
        let r = reference.map_read(&format).unwrap();
        let c = candidate.map_read(&format).unwrap();

        let comparator = FrameComparator::new(0, 40);
        let scores = comparator.score(&r, &c).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0].psnr.is_infinite());
        assert!(scores[1].psnr < 1.0);

        match comparator.should_replace(&r, &c).unwrap() {
            Comparison::Replace(score) => assert_eq!(score.channel, 0),
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn test_short_reference_is_map_error() {
        let small = gray(12, 2);
        let large = gray(12, 10);
        let reference = Frame::with_sequence(vec![0u8; 24], 0);
        let candidate = Frame::with_sequence(vec![0u8; 120], 1);

        let result = FrameComparator::new(0, 30).should_replace(
            &reference.map_read(&small).unwrap(),
            &candidate.map_read(&large).unwrap(),
        );
        assert!(matches!(result, Err(MapError::PayloadTooSmall { .. })));
    }

    proptest! {
        #[test]
        fn prop_threshold_zero_never_replaces(
            a in proptest::collection::vec(any::<u8>(), 64),
            b in proptest::collection::vec(any::<u8>(), 64),
        ) {
            let format = gray(8, 8);
            let reference = Frame::with_sequence(a, 0);
            let candidate = Frame::with_sequence(b, 1);
            let comparison = FrameComparator::new(0, 0)
                .should_replace(
                    &reference.map_read(&format).unwrap(),
                    &candidate.map_read(&format).unwrap(),
                )
                .unwrap();
            prop_assert!(!comparison.is_replace());
        }

        #[test]
        fn prop_identical_frames_always_replace(
            data in proptest::collection::vec(any::<u8>(), 64),
            threshold in 1u32..255,
            lines in 0u32..16,
        ) {
            let format = gray(8, 8);
            let reference = Frame::with_sequence(data.clone(), 0);
            let candidate = Frame::with_sequence(data, 1);
            let comparison = FrameComparator::new(lines, threshold)
                .should_replace(
                    &reference.map_read(&format).unwrap(),
                    &candidate.map_read(&format).unwrap(),
                )
                .unwrap();
            prop_assert!(comparison.is_replace());
        }
    }
}
