//! Pixel substitution.

mod compositor;

pub use compositor::{overwrite, CopyStats};
