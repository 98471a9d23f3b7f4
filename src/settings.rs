use crate::{
    color::Color,
    error::{InputError, Result},
};

pub const DEFAULT_FPS: u32 = 24;
pub const DEFAULT_FONT: &str = "arial.ttf";

/// Everything the renderer and assembler need to produce one video
///
/// Built once before any frame is rendered and shared read-only for the
/// rest of the run. When `transparent` is set the background alpha is
/// always treated as zero, whatever `bg_color` says.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Seconds each line stays on screen
    pub duration_per_line: f64,

    /// Output frame rate
    pub fps: u32,

    /// Font file path, file name (`arial.ttf`) or family name (`Times New Roman`)
    ///
    /// Falls back to a system sans-serif font, then the built-in glyphs.
    pub font: String,

    /// Font size in pixels
    pub font_size: u32,

    pub bold: bool,

    pub italic: bool,

    pub text_color: Color,

    pub bg_color: Color,

    /// Produce an alpha channel (forces a zero-alpha background)
    pub transparent: bool,

    /// Wrap words to this fraction of the frame width, if set
    pub max_text_width: Option<f32>,

    /// Baseline-to-baseline distance for wrapped text, as a multiple of the font's line height
    pub line_spacing: f32,

    /// Vertical center of the text block as a fraction of the frame height (0 top, 1 bottom)
    pub text_y: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            duration_per_line: 3.0,
            fps: DEFAULT_FPS,
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
        }
    }
}

impl RenderSettings {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_per_line = seconds;
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// The background actually painted on every frame
    pub fn background(&self) -> Color {
        if self.transparent {
            self.bg_color.with_alpha(0)
        } else {
            self.bg_color
        }
    }

    /// 4 when frames carry alpha, 3 otherwise
    pub fn channels(&self) -> u8 {
        if self.transparent {
            4
        } else {
            3
        }
    }

    /// Duration of one video frame in seconds
    pub fn frame_time(&self) -> f64 {
        1.0 / self.fps as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(out_of_range(
                "resolution",
                format!("{}x{}", self.width, self.height),
            ));
        }

        // yuv420p and yuva420p both subsample chroma 2x2
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(out_of_range(
                "resolution (must be even)",
                format!("{}x{}", self.width, self.height),
            ));
        }

        if self.fps == 0 {
            return Err(out_of_range("fps", self.fps.to_string()));
        }

        // Shorter lines cannot be shown without stretching the video
        if !(self.duration_per_line.is_finite() && self.duration_per_line >= self.frame_time()) {
            return Err(out_of_range(
                "duration_per_line (at least one frame)",
                self.duration_per_line.to_string(),
            ));
        }

        if self.font_size == 0 {
            return Err(out_of_range("font_size", self.font_size.to_string()));
        }

        if let Some(ratio) = self.max_text_width {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(out_of_range("max_text_width", ratio.to_string()));
            }
        }

        if !(self.line_spacing.is_finite() && self.line_spacing > 0.0) {
            return Err(out_of_range("line_spacing", self.line_spacing.to_string()));
        }

        if !(0.0..=1.0).contains(&self.text_y) {
            return Err(out_of_range("text_y", self.text_y.to_string()));
        }

        Ok(())
    }
}

fn out_of_range(field: &str, value: String) -> crate::error::GeneratorError {
    InputError::OutOfRange {
        field: field.to_string(),
        value,
    }
    .into()
}

/// Parse a human-entered duration in seconds
pub fn parse_duration(value: &str) -> std::result::Result<f64, InputError> {
    let trimmed = value.trim();
    let seconds: f64 = trimmed.parse().map_err(|_| InputError::InvalidNumber {
        field: "duration".to_string(),
        value: trimmed.to_string(),
    })?;

    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(InputError::OutOfRange {
            field: "duration".to_string(),
            value: trimmed.to_string(),
        });
    }
    Ok(seconds)
}

/// Parse a human-entered font size in pixels
pub fn parse_font_size(value: &str) -> std::result::Result<u32, InputError> {
    let trimmed = value.trim();
    let size: u32 = trimmed.parse().map_err(|_| InputError::InvalidNumber {
        field: "font size".to_string(),
        value: trimmed.to_string(),
    })?;

    if size == 0 {
        return Err(InputError::OutOfRange {
            field: "font size".to_string(),
            value: trimmed.to_string(),
        });
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!((settings.width, settings.height), (1920, 1080));
        assert_eq!(settings.fps, 24);
        assert_eq!(settings.background(), Color::BLACK);
        assert_eq!(settings.channels(), 3);
    }

    #[test]
    fn test_transparency_forces_zero_alpha() {
        let mut settings = RenderSettings::default().with_transparency(true);
        settings.bg_color = Color::rgb(10, 20, 30);
        assert_eq!(settings.background().a, 0);
        assert_eq!(settings.channels(), 4);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(RenderSettings::default().with_duration(0.0).validate().is_err());
        assert!(RenderSettings::default().with_duration(f64::NAN).validate().is_err());
        assert!(RenderSettings::default().with_font_size(0).validate().is_err());
        assert!(RenderSettings::default().with_resolution(641, 480).validate().is_err());

        let mut settings = RenderSettings::default();
        settings.max_text_width = Some(1.5);
        assert!(settings.validate().is_err());

        let mut settings = RenderSettings::default();
        settings.text_y = 1.2;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_lines_shorter_than_a_frame_are_rejected() {
        // 0.01s at 24 fps would have to be stretched to a whole frame
        let settings = RenderSettings::default().with_duration(0.01);
        assert!(matches!(
            settings.validate(),
            Err(crate::error::GeneratorError::Input(InputError::OutOfRange { .. }))
        ));

        let settings = RenderSettings::default().with_duration(1.0 / 24.0);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.frame_time(), 1.0 / 24.0);
    }

    #[test]
    fn test_parse_human_numbers() {
        assert_eq!(parse_duration(" 2.5 ").unwrap(), 2.5);
        assert!(matches!(
            parse_duration("abc"),
            Err(InputError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_duration("-1"),
            Err(InputError::OutOfRange { .. })
        ));

        assert_eq!(parse_font_size("70").unwrap(), 70);
        assert!(matches!(
            parse_font_size("70.5"),
            Err(InputError::InvalidNumber { .. })
        ));
        assert!(parse_font_size("0").is_err());
    }
}
