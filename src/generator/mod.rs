//! # Generator
//!
//! Coordinates lyric parsing, frame rendering and video assembly for one run.

pub mod engine;

// Re-exports for convenience
pub use engine::{generate_video, render_sequence, GenerationHandle, LyricVideoGenerator};
