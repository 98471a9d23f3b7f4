use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use lyric_video::{
    color::Color,
    config::Config,
    settings::{parse_duration, parse_font_size},
    LyricVideoGenerator,
};

#[derive(Parser)]
#[command(
    name = "lyric-video",
    version,
    about = "Turn lines of text into a slideshow video",
    long_about = "Lyric-Video draws each line of the input centered on its own frame and encodes the frames into a video. Use --transparent with a .mov or .webm output to get an alpha channel for overlays."
)]
struct Cli {
    /// Text file with one line per frame ("-" reads standard input)
    #[arg(short, long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Text given directly on the command line ("\n" separates lines)
    #[arg(short, long)]
    text: Option<String>,

    /// Output video file path (.mp4, .webm, .mov)
    #[arg(short, long)]
    output: PathBuf,

    /// Seconds each line stays on screen
    #[arg(short, long, value_parser = parse_duration)]
    duration: Option<f64>,

    /// Font size in pixels
    #[arg(long, value_parser = parse_font_size)]
    font_size: Option<u32>,

    /// Font file path, installed file name (arial.ttf) or family name
    #[arg(short, long)]
    font: Option<String>,

    /// Use the bold face of the font family
    #[arg(long)]
    bold: bool,

    /// Use the italic face of the font family
    #[arg(long)]
    italic: bool,

    /// Vertical center of the text (0 top, 0.5 middle, 1 bottom)
    #[arg(long)]
    text_y: Option<f32>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Text color (name, #RRGGBB[AA] or r,g,b[,a])
    #[arg(long)]
    text_color: Option<Color>,

    /// Background color (ignored with --transparent)
    #[arg(long)]
    bg_color: Option<Color>,

    /// Transparent background (requires .mov or .webm; other paths get .mov appended)
    #[arg(long)]
    transparent: bool,

    /// Output frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Wrap text to this fraction of the frame width (0-1)
    #[arg(long)]
    wrap: Option<f32>,

    /// Lines equal to this marker become blank pauses
    #[arg(long)]
    silence_marker: Option<String>,

    /// Extra seconds per character of each line
    #[arg(long)]
    char_duration: Option<f64>,

    /// Drop blank lines instead of showing an empty frame
    #[arg(long)]
    skip_empty: bool,

    /// Kill the encoder after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// FFmpeg executable to run
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    fn apply_to(&self, config: &mut Config) {
        let render = &mut config.render;
        if let Some(font) = &self.font {
            render.font = font.clone();
        }
        if self.bold {
            render.bold = true;
        }
        if self.italic {
            render.italic = true;
        }
        if let Some(text_y) = self.text_y {
            render.text_y = text_y;
        }
        if let Some(size) = self.font_size {
            render.font_size = size;
        }
        if let Some(width) = self.width {
            render.width = width;
        }
        if let Some(height) = self.height {
            render.height = height;
        }
        if let Some(color) = self.text_color {
            render.text_color = color;
        }
        if let Some(color) = self.bg_color {
            render.bg_color = color;
        }
        if self.transparent {
            render.transparent = true;
        }
        if self.wrap.is_some() {
            render.max_text_width = self.wrap;
        }

        let timing = &mut config.timing;
        if let Some(duration) = self.duration {
            timing.duration_per_line = duration;
        }
        if let Some(fps) = self.fps {
            timing.fps = fps;
        }
        if let Some(marker) = &self.silence_marker {
            timing.silence_marker = Some(marker.clone());
        }
        if let Some(per_char) = self.char_duration {
            timing.char_duration = per_char;
        }
        if self.skip_empty {
            timing.skip_empty_lines = true;
        }

        if self.timeout.is_some() {
            config.encode.timeout_secs = self.timeout;
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            config.encode.ffmpeg_path = ffmpeg.clone();
        }
    }

    fn read_text(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.replace("\\n", "\n"));
        }

        match &self.input {
            Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {:?}", path)),
            _ => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read text from standard input")?;
                Ok(text)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting Lyric-Video v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    cli.apply_to(&mut config);
    config.validate()?;

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        info!("Configuration written to {:?}", path);
    }

    let text = cli.read_text()?;
    let generator = LyricVideoGenerator::from_config(&config);

    info!("Generating video... Please wait.");
    let handle = generator.spawn(text, cli.output.clone());

    match handle.wait().await {
        Ok(path) => {
            info!("Done! Saved to {:?}", path);
            println!("{}", path.display());
            Ok(())
        }
        Err(message) => anyhow::bail!(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "lyric-video",
            "--text",
            "a",
            "-o",
            "out.mov",
            "--duration",
            "1.5",
            "--font-size",
            "40",
            "--width",
            "640",
            "--height",
            "480",
            "--bg-color",
            "#112233",
            "--transparent",
            "--timeout",
            "30",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.timing.duration_per_line, 1.5);
        assert_eq!(config.render.font_size, 40);
        assert_eq!((config.render.width, config.render.height), (640, 480));
        assert_eq!(config.render.bg_color, Color::rgb(0x11, 0x22, 0x33));
        assert!(config.render.transparent);
        assert_eq!(config.encode.timeout_secs, Some(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_text_placement_and_face_flags() {
        let cli = Cli::parse_from([
            "lyric-video",
            "--text",
            "a",
            "-o",
            "out.mp4",
            "--font",
            "DejaVu Sans",
            "--bold",
            "--italic",
            "--text-y",
            "0.8",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.render.font, "DejaVu Sans");
        assert!(config.render.bold && config.render.italic);
        assert_eq!(config.render.text_y, 0.8);
        assert_eq!(config.encode.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));

        let settings = config.render_settings();
        assert_eq!(settings.text_y, 0.8);
        assert!(settings.bold);

        let cli = Cli::parse_from(["lyric-video", "-t", "a", "-o", "x.mp4", "--text-y", "1.5"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_numeric_duration_is_rejected() {
        let result = Cli::try_parse_from(["lyric-video", "-o", "x.mp4", "--duration", "three"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["lyric-video", "-o", "x.mp4", "--font-size", "big"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_escaped_newlines_in_text() {
        let cli = Cli::parse_from(["lyric-video", "--text", "one\\ntwo", "-o", "x.mp4"]);
        assert_eq!(cli.read_text().unwrap(), "one\ntwo");
    }
}
