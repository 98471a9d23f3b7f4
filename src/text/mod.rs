//! # Text Rendering Module
//!
//! Font lookup with fallbacks, glyph layout and drawing text onto frames.

pub mod builtin;
pub mod font;
pub mod renderer;
pub mod truetype;

pub use builtin::BuiltinFace;
pub use font::{load_face, BlockLayout, FontStyle, GlyphSource, PlacedGlyph};
pub use renderer::{render, FrameRenderer};
pub use truetype::TrueTypeFace;
