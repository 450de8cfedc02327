//! Frame similarity scoring.
//!
//! A PSNR-style metric over fixed 8-bit samples decides whether a candidate
//! frame has frozen onto the reference still.

mod comparator;
mod similarity;

pub use comparator::{Comparison, FrameComparator};
pub use similarity::{channel_mse, psnr, squared_error, ChannelScore, PEAK_SQUARED};
