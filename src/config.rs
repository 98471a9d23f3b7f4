use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    color::Color,
    error::{ConfigError, Result},
    settings::{RenderSettings, DEFAULT_FONT, DEFAULT_FPS},
};

/// Main configuration for lyric-video
///
/// Every section and field is optional in the TOML file; missing values
/// take the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How frames look
    pub render: RenderConfig,

    /// How long lines stay on screen
    pub timing: TimingConfig,

    /// Encoder behavior
    pub encode: EncodeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.render.validate()?;
        self.timing.validate()?;
        self.encode.validate()?;
        self.render_settings().validate()?;
        Ok(())
    }

    /// Build the immutable settings for one generation run
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            width: self.render.width,
            height: self.render.height,
            duration_per_line: self.timing.duration_per_line,
            fps: self.timing.fps,
            font: self.render.font.clone(),
            font_size: self.render.font_size,
            bold: self.render.bold,
            italic: self.render.italic,
            text_color: self.render.text_color,
            bg_color: self.render.bg_color,
            transparent: self.render.transparent,
            max_text_width: self.render.max_text_width,
            line_spacing: self.render.line_spacing,
            text_y: self.render.text_y,
        }
    }
}

/// Frame appearance configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,

    /// Font file path or installed family name
    #[serde(alias = "font_path")]
    pub font: String,

    pub font_size: u32,

    pub bold: bool,

    pub italic: bool,

    pub text_color: Color,

    /// Ignored (treated as fully transparent) when `transparent` is set
    pub bg_color: Color,

    pub transparent: bool,

    /// Word-wrap lines to this fraction of the frame width
    pub max_text_width: Option<f32>,

    pub line_spacing: f32,

    /// Vertical position of the text block center (0.0 top - 1.0 bottom)
    pub text_y: f32,

    /// Number of threads rendering frames in parallel
    pub render_threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            font: DEFAULT_FONT.to_string(),
            font_size: 70,
            bold: false,
            italic: false,
            text_color: Color::WHITE,
            bg_color: Color::BLACK,
            transparent: false,
            max_text_width: None,
            line_spacing: 1.0,
            text_y: 0.5,
            render_threads: num_cpus::get(),
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if self.render_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.render_threads".to_string(),
                value: self.render_threads.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Line timing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Base seconds per line
    pub duration_per_line: f64,

    pub fps: u32,

    /// Extra seconds per character of the line (0 keeps every line equal)
    pub char_duration: f64,

    /// A line consisting only of this marker becomes a blank pause
    pub silence_marker: Option<String>,

    /// Length of a pause produced by the silence marker
    pub silence_duration: f64,

    /// Drop blank lines instead of showing an empty frame for them
    pub skip_empty_lines: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            duration_per_line: 3.0,
            fps: DEFAULT_FPS,
            char_duration: 0.0,
            silence_marker: None,
            silence_duration: 1.0,
            skip_empty_lines: false,
        }
    }
}

impl TimingConfig {
    fn validate(&self) -> Result<()> {
        if !(self.char_duration.is_finite() && self.char_duration >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "timing.char_duration".to_string(),
                value: self.char_duration.to_string(),
            }
            .into());
        }

        // A pause must cover at least one video frame
        if !(self.silence_duration.is_finite() && self.silence_duration * self.fps as f64 >= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "timing.silence_duration".to_string(),
                value: self.silence_duration.to_string(),
            }
            .into());
        }

        if matches!(&self.silence_marker, Some(marker) if marker.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "timing.silence_marker".to_string(),
                value: "\"\"".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Kill the encoder if it runs longer than this
    pub timeout_secs: Option<u64>,

    /// FFmpeg executable, looked up on PATH when not absolute
    pub ffmpeg_path: PathBuf,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            timeout_secs: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl EncodeConfig {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "encode.quality".to_string(),
                value: self.quality.to_string(),
            }
            .into());
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "encode.timeout_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
