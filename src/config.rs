//! Filter settings and the TOML file format.

use crate::video::{FormatDescriptor, FormatError, PixelFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest accepted `compare_lines`.
pub const MAX_COMPARE_LINES: u32 = 32000;

/// Largest accepted similarity threshold, in decibels.
pub const MAX_THRESHOLD: u32 = 255;

/// Runtime-adjustable filter settings.
///
/// Read as one snapshot per primary frame; changes take effect on the next
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Suppress per-frame diagnostics. Has no effect on the output.
    pub silent: bool,
    /// Rows to compare from the top of each frame (0 = full height).
    pub compare_lines: u32,
    /// PSNR above which a frame counts as the reference still
    /// (0 disables comparison).
    pub threshold: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            silent: true,
            compare_lines: 0,
            threshold: 100,
        }
    }
}

impl Settings {
    /// Validates the setting ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compare_lines > MAX_COMPARE_LINES {
            return Err(ConfigError::CompareLinesOutOfRange(self.compare_lines));
        }
        if self.threshold > MAX_THRESHOLD {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("compare_lines {0} out of range (0-32000)")]
    CompareLinesOutOfRange(u32),
    #[error("threshold {0} out of range (0-255)")]
    ThresholdOutOfRange(u32),
    #[error("invalid source format: {0}")]
    Format(#[from] FormatError),
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Synthetic sources used by the demonstration pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Pixel format of both inputs.
    pub format: PixelFormat,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Primary frames to push.
    pub frame_count: u32,
    /// Fill value of the still image the primary freezes on.
    pub still_value: u8,
    /// Primary frames with live content between stills.
    pub live_frames: u32,
    /// Primary frames showing the still, per repetition.
    pub still_frames: u32,
    /// Fill value of replacement frames.
    pub replacement_value: u8,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            format: PixelFormat::Rgbx,
            width: 320,
            height: 240,
            fps: 25,
            frame_count: 100,
            still_value: 16,
            live_frames: 10,
            still_frames: 15,
            replacement_value: 200,
        }
    }
}

impl SourceConfig {
    /// Validates dimensions and frame rate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.descriptor()?;
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    /// Resolves the layout both synthetic inputs use.
    pub fn descriptor(&self) -> Result<FormatDescriptor, ConfigError> {
        Ok(FormatDescriptor::resolve(self.format, self.width, self.height)?)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { metrics_port: 9090 }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub filter: Settings,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;
        self.source.validate()
    }
}
