//! Metrics collection and registry.

use crate::filter::FilterStats;
use crate::handoff::SlotState;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of filter state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Primary frames received.
    pub frames: u64,
    /// Frames whose pixels were replaced.
    pub replaced: u64,
    /// Replace triggers without a replacement frame.
    pub unavailable: u64,
    /// Frames forwarded unmodified after a mapping failure.
    pub mapping_failures: u64,
    /// References captured.
    pub captures: u64,
    /// Reference resets.
    pub resets: u64,
    /// Replacement frames accepted.
    pub delivered: u64,
    /// Replacement frames dropped.
    pub discarded: u64,
    /// Repeat-last hand-outs.
    pub repeated: u64,
    /// Most recent decisive similarity score.
    pub last_score: Option<f64>,
    /// Whether the handoff slot still accepts frames.
    pub slot_open: bool,
}

impl MetricsSnapshot {
    /// Creates a snapshot from filter statistics and the slot state.
    pub fn from_stats(stats: &FilterStats, slot: SlotState) -> Self {
        Self {
            frames: stats.frames,
            replaced: stats.replaced,
            unavailable: stats.unavailable,
            mapping_failures: stats.mapping_failures,
            captures: stats.captures,
            resets: stats.resets,
            delivered: stats.delivered,
            discarded: stats.discarded,
            repeated: stats.repeated,
            last_score: stats.last_score,
            slot_open: slot == SlotState::Open,
        }
    }
}

/// Prometheus metrics registry for the filter.
pub struct MetricsRegistry {
    registry: Registry,

    // Primary path
    frames_total: IntCounter,
    replaced_total: IntCounter,
    unavailable_total: IntCounter,
    mapping_failures_total: IntCounter,
    last_score: Gauge,

    // Reference cache
    captures_total: IntCounter,
    resets_total: IntCounter,

    // Handoff slot
    delivered_total: IntCounter,
    discarded_total: IntCounter,
    repeated_total: IntCounter,
    slot_open: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all filter metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_total = IntCounter::new(
            "still_replace_frames_total",
            "Primary frames received",
        )?;
        let replaced_total = IntCounter::new(
            "still_replace_replaced_total",
            "Frames whose pixels were replaced",
        )?;
        let unavailable_total = IntCounter::new(
            "still_replace_replacement_unavailable_total",
            "Replace triggers that found no replacement frame",
        )?;
        let mapping_failures_total = IntCounter::new(
            "still_replace_mapping_failures_total",
            "Frames forwarded unmodified because mapping failed",
        )?;
        let last_score = Gauge::new(
            "still_replace_last_score_db",
            "Most recent similarity score in decibels",
        )?;
        let captures_total = IntCounter::new(
            "still_replace_reference_captures_total",
            "Reference stills captured",
        )?;
        let resets_total = IntCounter::new(
            "still_replace_reference_resets_total",
            "Reference resets",
        )?;
        let delivered_total = IntCounter::new(
            "still_replace_replacements_delivered_total",
            "Replacement frames accepted by the handoff slot",
        )?;
        let discarded_total = IntCounter::new(
            "still_replace_replacements_discarded_total",
            "Replacement frames dropped by the handoff slot",
        )?;
        let repeated_total = IntCounter::new(
            "still_replace_replacements_repeated_total",
            "Replacement frames handed out again while unlinked",
        )?;
        let slot_open = IntGauge::new(
            "still_replace_slot_open",
            "Handoff slot state (1=open, 0=eos or flushing)",
        )?;

        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(replaced_total.clone()))?;
        registry.register(Box::new(unavailable_total.clone()))?;
        registry.register(Box::new(mapping_failures_total.clone()))?;
        registry.register(Box::new(last_score.clone()))?;
        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(resets_total.clone()))?;
        registry.register(Box::new(delivered_total.clone()))?;
        registry.register(Box::new(discarded_total.clone()))?;
        registry.register(Box::new(repeated_total.clone()))?;
        registry.register(Box::new(slot_open.clone()))?;

        Ok(Self {
            registry,
            frames_total,
            replaced_total,
            unavailable_total,
            mapping_failures_total,
            last_score,
            captures_total,
            resets_total,
            delivered_total,
            discarded_total,
            repeated_total,
            slot_open,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.frames_total, snapshot.frames);
        advance(&self.replaced_total, snapshot.replaced);
        advance(&self.unavailable_total, snapshot.unavailable);
        advance(&self.mapping_failures_total, snapshot.mapping_failures);
        advance(&self.captures_total, snapshot.captures);
        advance(&self.resets_total, snapshot.resets);
        advance(&self.delivered_total, snapshot.delivered);
        advance(&self.discarded_total, snapshot.discarded);
        advance(&self.repeated_total, snapshot.repeated);

        if let Some(score) = snapshot.last_score {
            self.last_score.set(score);
        }
        self.slot_open.set(if snapshot.slot_open { 1 } else { 0 });
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Counters only move forward; bump by the difference.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let stats = FilterStats {
            frames: 10,
            replaced: 4,
            captures: 1,
            delivered: 5,
            last_score: Some(62.5),
            ..Default::default()
        };
        registry.update(&MetricsSnapshot::from_stats(&stats, SlotState::Open));

        let output = registry.encode().unwrap();
        assert!(output.contains("still_replace_frames_total 10"));
        assert!(output.contains("still_replace_replaced_total 4"));
        assert!(output.contains("still_replace_last_score_db 62.5"));
        assert!(output.contains("still_replace_slot_open 1"));
    }

    #[test]
    fn test_counters_never_go_backwards() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            frames: 8,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            frames: 3,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("still_replace_frames_total 8"));
        assert!(output.contains("still_replace_slot_open 0"));
    }
}
