//! Reference still and control-plane state.
//!
//! Settings, the reference handle and the negotiated layouts share one
//! short-held lock. The lock only guards handle swaps and field copies; the
//! comparator scans a snapshot after the lock is released.

use crate::config::{ConfigError, Settings};
use crate::video::{FormatDescriptor, Frame};
use parking_lot::Mutex;
use std::sync::Arc;

/// The frame candidates are compared against, with the layout it was
/// captured under. Never mutated; replaced as a whole.
#[derive(Debug)]
pub struct Reference {
    frame: Frame,
    format: Arc<FormatDescriptor>,
}

impl Reference {
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    #[inline]
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }
}

/// Everything the primary path needs for one frame, read atomically.
#[derive(Debug, Clone)]
pub struct ControlSnapshot {
    pub settings: Settings,
    pub reference: Option<Arc<Reference>>,
    pub primary_format: Option<Arc<FormatDescriptor>>,
}

/// Counters kept by the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStats {
    /// References captured from the primary stream.
    pub captures: u64,
    /// Reset commands that cleared a reference.
    pub resets: u64,
}

#[derive(Debug)]
struct ControlState {
    settings: Settings,
    reference: Option<Arc<Reference>>,
    primary_format: Option<Arc<FormatDescriptor>>,
    replacement_format: Option<Arc<FormatDescriptor>>,
    stats: ControlStats,
}

/// Settings, reference cache and negotiated layouts behind one lock.
#[derive(Debug)]
pub struct ControlPlane {
    state: Mutex<ControlState>,
}

impl ControlPlane {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: Mutex::new(ControlState {
                settings,
                reference: None,
                primary_format: None,
                replacement_format: None,
                stats: ControlStats::default(),
            }),
        }
    }

    /// Copies settings, reference handle and primary layout in one
    /// acquisition.
    pub fn snapshot(&self) -> ControlSnapshot {
        let state = self.state.lock();
        ControlSnapshot {
            settings: state.settings,
            reference: state.reference.clone(),
            primary_format: state.primary_format.clone(),
        }
    }

    /// Current reference handle, if any.
    pub fn reference(&self) -> Option<Arc<Reference>> {
        self.state.lock().reference.clone()
    }

    /// Stores `frame` as the reference unless one already exists.
    ///
    /// Returns true if the frame was stored.
    pub fn publish_if_absent(&self, frame: Frame, format: Arc<FormatDescriptor>) -> bool {
        let mut state = self.state.lock();
        if state.reference.is_some() {
            return false;
        }
        let sequence = frame.sequence();
        state.reference = Some(Arc::new(Reference { frame, format }));
        state.stats.captures += 1;
        drop(state);

        tracing::info!(sequence, "captured reference still");
        true
    }

    /// Clears the reference. The next primary frame becomes the new one.
    ///
    /// Returns true if a reference was cleared.
    pub fn reset(&self) -> bool {
        let mut state = self.state.lock();
        let cleared = state.reference.take().is_some();
        if cleared {
            state.stats.resets += 1;
        }
        drop(state);

        if cleared {
            tracing::info!("reference still reset");
        }
        cleared
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings
    }

    /// Replaces all settings after validating them.
    pub fn set_settings(&self, settings: Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.state.lock().settings = settings;
        Ok(())
    }

    /// Applies `update` to a copy of the settings and stores it if valid.
    pub fn update_settings(
        &self,
        update: impl FnOnce(&mut Settings),
    ) -> Result<Settings, ConfigError> {
        let mut state = self.state.lock();
        let mut settings = state.settings;
        update(&mut settings);
        settings.validate()?;
        state.settings = settings;
        Ok(settings)
    }

    /// Records the primary layout.
    ///
    /// A layout different from the current one invalidates the reference,
    /// which was captured under the old layout.
    pub fn set_primary_format(&self, format: FormatDescriptor) -> Arc<FormatDescriptor> {
        let format = Arc::new(format);
        let mut state = self.state.lock();
        let changed = state
            .primary_format
            .as_deref()
            .is_some_and(|current| *current != *format);
        let cleared = changed && state.reference.take().is_some();
        state.primary_format = Some(Arc::clone(&format));
        drop(state);

        if cleared {
            tracing::info!(%format, "primary layout changed, reference cleared");
        }
        format
    }

    pub fn primary_format(&self) -> Option<Arc<FormatDescriptor>> {
        self.state.lock().primary_format.clone()
    }

    pub fn set_replacement_format(&self, format: FormatDescriptor) -> Arc<FormatDescriptor> {
        let format = Arc::new(format);
        self.state.lock().replacement_format = Some(Arc::clone(&format));
        format
    }

    pub fn replacement_format(&self) -> Option<Arc<FormatDescriptor>> {
        self.state.lock().replacement_format.clone()
    }

    pub fn stats(&self) -> ControlStats {
        self.state.lock().stats
    }
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PixelFormat;

    fn format(height: u32) -> FormatDescriptor {
        FormatDescriptor::resolve(PixelFormat::Gray8, 4, height).unwrap()
    }

    #[test]
    fn test_publish_only_when_absent() {
        let control = ControlPlane::default();
        let layout = Arc::new(format(4));

        assert!(control.publish_if_absent(Frame::with_sequence(vec![1; 16], 1), Arc::clone(&layout)));
        assert!(!control.publish_if_absent(Frame::with_sequence(vec![2; 16], 2), layout));

        let reference = control.reference().unwrap();
        assert_eq!(reference.frame().sequence(), 1);
        assert_eq!(control.stats().captures, 1);
    }

    #[test]
    fn test_reset_clears_once() {
        let control = ControlPlane::default();
        control.publish_if_absent(Frame::with_sequence(vec![1; 16], 1), Arc::new(format(4)));

        assert!(control.reset());
        assert!(!control.reset());
        assert!(control.reference().is_none());
        assert_eq!(control.stats().resets, 1);
    }

    #[test]
    fn test_old_snapshot_survives_reset() {
        let control = ControlPlane::default();
        control.publish_if_absent(Frame::with_sequence(vec![7; 16], 1), Arc::new(format(4)));

        let snapshot = control.snapshot();
        control.reset();
        control.publish_if_absent(Frame::with_sequence(vec![8; 16], 2), Arc::new(format(4)));

        let held = snapshot.reference.unwrap();
        assert_eq!(held.frame().sequence(), 1);
        assert!(held.frame().data().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_layout_change_clears_reference() {
        let control = ControlPlane::default();
        let first = control.set_primary_format(format(4));
        control.publish_if_absent(Frame::with_sequence(vec![1; 16], 1), first);

        // Same layout again keeps the reference.
        control.set_primary_format(format(4));
        assert!(control.reference().is_some());

        control.set_primary_format(format(8));
        assert!(control.reference().is_none());
    }

    #[test]
    fn test_update_settings_validates() {
        let control = ControlPlane::default();
        assert!(control.update_settings(|s| s.threshold = 300).is_err());
        assert_eq!(control.settings().threshold, 100);

        let updated = control.update_settings(|s| s.threshold = 30).unwrap();
        assert_eq!(updated.threshold, 30);
        assert_eq!(control.snapshot().settings.threshold, 30);
    }
}
