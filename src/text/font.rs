use std::path::Path;
use std::sync::OnceLock;

use fontdb::{Database, Family, Query, Source, ID};
use tracing::{debug, info, warn};

use crate::text::builtin::BuiltinFace;
use crate::text::truetype::TrueTypeFace;

/// How a block of text is arranged before rasterizing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLayout {
    /// Wrap words at this width in pixels; wrapped lines are centered on each other
    pub max_width: Option<f32>,
    /// Multiple of the face's natural line height
    pub line_spacing: f32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            max_width: None,
            line_spacing: 1.0,
        }
    }
}

/// One glyph bitmap placed in block coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
    /// Face-specific glyph index
    pub glyph_id: u16,
}

/// A source of laid-out, rasterized text at one fixed size
pub trait GlyphSource: Send + Sync {
    /// Human-readable name, for logs
    fn name(&self) -> &str;

    /// Position every glyph of `text` that leaves ink
    fn layout(&self, text: &str, block: &BlockLayout) -> Vec<PlacedGlyph>;

    /// Coverage of a placed glyph, `width * height` bytes, row-major
    fn rasterize(&self, glyph: &PlacedGlyph) -> Vec<u8>;
}

/// Weight and slant requested for a font family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

impl FontStyle {
    fn query<'a>(&self, families: &'a [Family<'a>]) -> Query<'a> {
        Query {
            families,
            weight: if self.bold {
                fontdb::Weight::BOLD
            } else {
                fontdb::Weight::NORMAL
            },
            style: if self.italic {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
            ..Query::default()
        }
    }
}

/// Sans-serif families tried, in order, when the requested font is unavailable
const FALLBACK_FAMILIES: &[&str] = &[
    "Arial",
    "Helvetica",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "FreeSans",
];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Fonts installed on this machine, scanned once per process
pub fn system_fonts() -> &'static Database {
    static FONTS: OnceLock<Database> = OnceLock::new();
    FONTS.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!("Found {} system font faces", db.len());
        db
    })
}

/// Load `font` at `font_size` pixels, never failing
///
/// `font` may be a path to a font file, the bare file name of an installed
/// font (`arial.ttf`) or a family name (`Times New Roman`). If it cannot be
/// loaded a system sans-serif face is used, and finally the built-in glyphs.
pub fn load_face(font: &str, style: FontStyle, font_size: u32) -> Box<dyn GlyphSource> {
    let px = font_size as f32;
    let path = Path::new(font);
    let db = system_fonts();

    if path.is_file() {
        match TrueTypeFace::load(path, px) {
            Ok(face) => {
                debug!("Loaded font {:?} at {}px", path, font_size);
                return Box::new(face);
            }
            Err(e) => warn!("Could not load font {:?}, using default. ({})", path, e),
        }
    } else {
        match find_installed(db, font, style) {
            Some(id) => {
                if let Some(face) = load_installed(db, id, px) {
                    debug!("Resolved font '{}' to '{}' at {}px", font, face.name(), font_size);
                    return Box::new(face);
                }
            }
            None => warn!("Font '{}' is not installed, using default", font),
        }
    }

    if let Some(face) = fallback(db, style).and_then(|id| load_installed(db, id, px)) {
        info!("Using fallback font '{}'", face.name());
        return Box::new(face);
    }

    warn!("No system font available; drawing text with built-in glyphs");
    Box::new(BuiltinFace::for_font_size(font_size))
}

/// Look `font` up as an installed file name, then as a family name
fn find_installed(db: &Database, font: &str, style: FontStyle) -> Option<ID> {
    let path = Path::new(font);
    let is_file_name = path.parent().map_or(true, |p| p.as_os_str().is_empty())
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));

    if is_file_name {
        let face = db.faces().find(|face| {
            face_path(&face.source)
                .and_then(|p| p.file_name())
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.eq_ignore_ascii_case(font))
        })?;
        // The file names one face; the family may have the requested style
        if style == FontStyle::default() {
            return Some(face.id);
        }
        let family = face.families.first().map(|(name, _)| name.as_str())?;
        return query_family(db, family, style).or(Some(face.id));
    }

    query_family(db, font, style)
}

fn query_family(db: &Database, family: &str, style: FontStyle) -> Option<ID> {
    // fontdb matches family names exactly
    let canonical = db
        .faces()
        .flat_map(|face| face.families.iter())
        .map(|(name, _)| name.as_str())
        .find(|name| name.eq_ignore_ascii_case(family))?;
    let families = [Family::Name(canonical)];
    db.query(&style.query(&families))
}

fn fallback(db: &Database, style: FontStyle) -> Option<ID> {
    let families: Vec<Family<'_>> = FALLBACK_FAMILIES
        .iter()
        .map(|name| Family::Name(*name))
        .chain([Family::SansSerif])
        .collect();
    db.query(&style.query(&families))
        .or_else(|| db.faces().next().map(|face| face.id))
}

fn load_installed(db: &Database, id: ID, px: f32) -> Option<TrueTypeFace> {
    let name = db
        .face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| format!("font #{:?}", id));

    let loaded = db.with_face_data(id, |data, index| {
        TrueTypeFace::from_bytes(data.to_vec(), index, px, name.clone())
    })?;
    match loaded {
        Ok(face) => Some(face),
        Err(e) => {
            warn!("Could not load installed font '{}': {}", name, e);
            None
        }
    }
}

fn face_path(source: &Source) -> Option<&Path> {
    match source {
        Source::File(path) => Some(path.as_path()),
        Source::SharedFile(path, _) => Some(path.as_path()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::builtin::BUILTIN_NAME;

    #[test]
    fn test_missing_font_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing-font.ttf");
        let face = load_face(&missing.display().to_string(), FontStyle::default(), 40);
        assert!(!face.layout("Hi", &BlockLayout::default()).is_empty());
    }

    #[test]
    fn test_garbage_font_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        let face = load_face(&bogus.display().to_string(), FontStyle::default(), 40);
        assert_ne!(face.name(), bogus.display().to_string());
        assert!(!face.layout("abc", &BlockLayout::default()).is_empty());
    }

    #[test]
    fn test_unknown_family_falls_back() {
        let face = load_face("No Such Family 12345", FontStyle::default(), 40);
        assert_ne!(face.name(), "No Such Family 12345");
        assert!(!face.layout("abc", &BlockLayout::default()).is_empty());
    }

    #[test]
    fn test_family_name_is_resolved_case_insensitively() {
        let db = system_fonts();
        let Some(family) = db
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
        else {
            return;
        };

        let face = load_face(&family.to_uppercase(), FontStyle::default(), 40);
        assert!(face.name().eq_ignore_ascii_case(&family));
    }

    #[test]
    fn test_installed_file_name_is_resolved() {
        let db = system_fonts();
        let Some(file_name) = db.faces().find_map(|face| {
            face_path(&face.source)
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .filter(|n| n.to_ascii_lowercase().ends_with(".ttf"))
                .map(str::to_string)
        }) else {
            return;
        };

        assert!(find_installed(db, &file_name, FontStyle::default()).is_some());
        let face = load_face(&file_name, FontStyle::default(), 40);
        assert_ne!(face.name(), BUILTIN_NAME);
    }
}
