use std::path::Path;

use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, WrapStyle,
};
use fontdue::{Font, FontSettings};

use crate::error::{RenderError, Result};
use crate::text::font::{BlockLayout, GlyphSource, PlacedGlyph};

/// A TrueType/OpenType face laid out and rasterized with fontdue at a fixed size
pub struct TrueTypeFace {
    font: Font,
    px: f32,
    name: String,
}

impl TrueTypeFace {
    pub fn load(path: &Path, px: f32) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, 0, px, path.display().to_string())
    }

    /// Parse face `index` of a font file or collection
    pub fn from_bytes(bytes: Vec<u8>, index: u32, px: f32, name: String) -> Result<Self> {
        let settings = FontSettings {
            collection_index: index,
            scale: px,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|reason| RenderError::FontParse {
            path: name.clone(),
            reason: reason.to_string(),
        })?;

        Ok(Self { font, px, name })
    }
}

impl GlyphSource for TrueTypeFace {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self, text: &str, block: &BlockLayout) -> Vec<PlacedGlyph> {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            max_width: block.max_width,
            horizontal_align: HorizontalAlign::Center,
            line_height: block.line_spacing,
            wrap_style: WrapStyle::Word,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.px, 0));

        layout
            .glyphs()
            .iter()
            .filter(|glyph| glyph.width > 0 && glyph.height > 0)
            .map(|glyph| PlacedGlyph {
                x: glyph.x,
                y: glyph.y,
                width: glyph.width as u32,
                height: glyph.height as u32,
                glyph_id: glyph.key.glyph_index,
            })
            .collect()
    }

    fn rasterize(&self, glyph: &PlacedGlyph) -> Vec<u8> {
        self.font.rasterize_indexed(glyph.glyph_id, self.px).1
    }
}
