// Render a single lyric line to PNG to check fonts and colors without encoding

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use lyric_video::{config::Config, FrameRenderer};

#[derive(Parser)]
#[command(name = "preview-frame", version, about = "Render one line of text to a PNG preview")]
struct Args {
    /// Text to draw
    text: String,

    /// PNG file to write
    #[arg(short, long, default_value = "preview.png")]
    output: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preview with a transparent background
    #[arg(long)]
    transparent: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if args.transparent {
        config.render.transparent = true;
    }
    config.validate()?;

    let settings = config.render_settings();
    let renderer = FrameRenderer::new(settings);
    info!("Using font '{}'", renderer.face().name());

    let frame = renderer.render(&args.text);
    frame
        .save_png(&args.output)
        .with_context(|| format!("Could not save preview to {:?}", args.output))?;

    info!(
        "📁 {}x{} preview saved to {:?}",
        frame.width(),
        frame.height(),
        args.output
    );
    Ok(())
}
