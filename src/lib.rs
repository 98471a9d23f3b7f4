//! # Lyric-Video
//!
//! Turn lines of lyrics or text into slideshow videos.
//!
//! Every line becomes one full-frame image with the text centered across a
//! solid (or fully transparent) background. The frames are held for a
//! fixed time each and encoded with FFmpeg: H.264 for opaque output,
//! VP9 (`.webm`) or ProRes 4444 (`.mov`) when an alpha channel is needed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lyric_video::{LyricVideoGenerator, RenderSettings};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let settings = RenderSettings::default()
//!     .with_resolution(1280, 720)
//!     .with_duration(2.0)
//!     .with_transparency(true);
//!
//! let generator = LyricVideoGenerator::new(settings);
//! let video = generator
//!     .generate("Hello world\nThis is a test\nOf the lyric generator", "lyrics.mov")
//!     .await?;
//! println!("Saved to {}", video.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`lyrics`] - Splitting and timing input text
//! - [`text`] - Font loading and frame rendering
//! - [`video`] - Frame storage, codec selection and encoding
//! - [`generator`] - The end-to-end pipeline and background runs
//! - [`config`] - TOML configuration

pub mod color;
pub mod config;
pub mod error;
pub mod generator;
pub mod lyrics;
pub mod settings;
pub mod text;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    color::Color,
    config::Config,
    error::{GeneratorError, Result},
    generator::{generate_video, GenerationHandle, LyricVideoGenerator},
    settings::RenderSettings,
    text::FrameRenderer,
    video::{Frame, VideoAssembler},
};
