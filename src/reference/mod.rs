//! Reference still cache and the control plane it shares a lock with.

mod cache;

pub use cache::{ControlPlane, ControlSnapshot, ControlStats, Reference};
