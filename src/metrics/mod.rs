//! Prometheus metrics exporter for the filter.
//!
//! # Metrics Exposed
//!
//! ## Primary path
//! - `still_replace_frames_total` - Primary frames received
//! - `still_replace_replaced_total` - Frames whose pixels were replaced
//! - `still_replace_replacement_unavailable_total` - Replace triggers without a replacement
//! - `still_replace_mapping_failures_total` - Frames forwarded unmodified after a mapping failure
//! - `still_replace_last_score_db` - Most recent similarity score
//!
//! ## Reference cache
//! - `still_replace_reference_captures_total`
//! - `still_replace_reference_resets_total`
//!
//! ## Handoff slot
//! - `still_replace_replacements_delivered_total`
//! - `still_replace_replacements_discarded_total`
//! - `still_replace_replacements_repeated_total`
//! - `still_replace_slot_open` - 1 while open, 0 after end-of-stream or flush
//!
//! # Example
//!
//! ```no_run
//! use still_replace::filter::FilterStats;
//! use still_replace::handoff::SlotState;
//! use still_replace::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let stats = FilterStats::default();
//! registry.update(&MetricsSnapshot::from_stats(&stats, SlotState::Open));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, ServerError};
