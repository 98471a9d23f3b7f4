use tracing::debug;

use crate::settings::RenderSettings;
use crate::text::font::{load_face, BlockLayout, FontStyle, GlyphSource, PlacedGlyph};
use crate::video::types::Frame;

/// Draws one line of text, centered, onto a full-size frame
///
/// The font is loaded once when the renderer is built and shared by every
/// frame it produces.
pub struct FrameRenderer {
    settings: RenderSettings,
    face: Box<dyn GlyphSource>,
}

impl FrameRenderer {
    /// Build a renderer, loading the configured font (or a fallback)
    pub fn new(settings: RenderSettings) -> Self {
        let style = FontStyle {
            bold: settings.bold,
            italic: settings.italic,
        };
        let face = load_face(&settings.font, style, settings.font_size);
        Self::with_face(settings, face)
    }

    pub fn with_face(settings: RenderSettings, face: Box<dyn GlyphSource>) -> Self {
        debug!("Frame renderer using font '{}'", face.name());
        Self { settings, face }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn face(&self) -> &dyn GlyphSource {
        self.face.as_ref()
    }

    /// A frame containing only the background
    pub fn blank(&self) -> Frame {
        Frame::new_filled(
            self.settings.width,
            self.settings.height,
            self.settings.background(),
            self.settings.transparent,
        )
    }

    /// Render `text` on a background-filled frame
    ///
    /// The ink is centered horizontally and its vertical center sits at
    /// `text_y` of the frame height. Blank text gives a plain background
    /// frame. Text larger than the frame is clipped at the edges.
    pub fn render(&self, text: &str) -> Frame {
        let mut frame = self.blank();
        let text = text.trim();
        if text.is_empty() {
            return frame;
        }

        let block = BlockLayout {
            max_width: self
                .settings
                .max_text_width
                .map(|ratio| ratio * self.settings.width as f32),
            line_spacing: self.settings.line_spacing,
        };
        let glyphs = self.face.layout(text, &block);
        let Some(bounds) = InkBounds::of(&glyphs) else {
            return frame;
        };

        let frame_w = self.settings.width as i64;
        let frame_h = self.settings.height as i64;
        let center_y = (self.settings.text_y as f64 * frame_h as f64).round() as i64;
        let origin_x = (frame_w - bounds.width()).div_euclid(2) - bounds.left;
        let origin_y = center_y - bounds.height().div_euclid(2) - bounds.top;

        for glyph in &glyphs {
            let x = origin_x + glyph.x.round() as i64;
            let y = origin_y + glyph.y.round() as i64;
            let (w, h) = (glyph.width as i64, glyph.height as i64);
            if x + w <= 0 || y + h <= 0 || x >= frame_w || y >= frame_h {
                continue;
            }
            let coverage = self.face.rasterize(glyph);
            self.blit(&mut frame, &coverage, glyph.width, x, y);
        }

        frame
    }

    fn blit(&self, frame: &mut Frame, coverage: &[u8], width: u32, x: i64, y: i64) {
        let color = self.settings.text_color;
        for (i, &alpha) in coverage.iter().enumerate() {
            if alpha > 0 {
                let (dx, dy) = (i as u32 % width, i as u32 / width);
                frame.blend_pixel(x + dx as i64, y + dy as i64, color, alpha);
            }
        }
    }
}

/// Pixel-rounded extent of every glyph box in a block
struct InkBounds {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl InkBounds {
    fn of(glyphs: &[PlacedGlyph]) -> Option<Self> {
        glyphs.iter().fold(None, |acc: Option<Self>, glyph| {
            let left = glyph.x.round() as i64;
            let top = glyph.y.round() as i64;
            let right = left + glyph.width as i64;
            let bottom = top + glyph.height as i64;
            Some(match acc {
                None => Self {
                    left,
                    top,
                    right,
                    bottom,
                },
                Some(b) => Self {
                    left: b.left.min(left),
                    top: b.top.min(top),
                    right: b.right.max(right),
                    bottom: b.bottom.max(bottom),
                },
            })
        })
    }

    fn width(&self) -> i64 {
        self.right - self.left
    }

    fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

/// Render one line with freshly loaded settings
pub fn render(text: &str, settings: &RenderSettings) -> Frame {
    FrameRenderer::new(settings.clone()).render(text)
}
