use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info};

use crate::{
    config::{Config, EncodeConfig, TimingConfig},
    error::{GeneratorError, InputError, Result},
    lyrics::{self, TextLine},
    settings::RenderSettings,
    text::FrameRenderer,
    video::{EncodedVideo, Sequence, TimedFrame, VideoAssembler},
};

/// Turns lyric text into a finished video file
///
/// The generator follows a straight pipeline:
/// 1. Input - split and time the text, reject empty input
/// 2. Rendering - draw one frame per line (in parallel, order preserved)
/// 3. Encoding - hand the sequence to the video assembler
#[derive(Debug, Clone)]
pub struct LyricVideoGenerator {
    settings: RenderSettings,
    timing: TimingConfig,
    encode: EncodeConfig,
    render_threads: usize,
}

impl LyricVideoGenerator {
    /// Create a generator for `settings`, with default timing and encoding
    pub fn new(settings: RenderSettings) -> Self {
        let timing = TimingConfig {
            duration_per_line: settings.duration_per_line,
            fps: settings.fps,
            ..TimingConfig::default()
        };
        Self {
            settings,
            timing,
            encode: EncodeConfig::default(),
            render_threads: num_cpus::get(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: config.render_settings(),
            timing: config.timing.clone(),
            encode: config.encode.clone(),
            render_threads: config.render.render_threads,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Generate from raw text, one line per text line
    pub async fn generate<P: AsRef<Path>>(&self, text: &str, output_path: P) -> Result<EncodedVideo> {
        let lines = lyrics::parse_lines(text, &self.timing);
        self.run(lines, output_path.as_ref()).await
    }

    /// Generate from lines the caller already split
    pub async fn generate_lines<I, S, P>(&self, lines: I, output_path: P) -> Result<EncodedVideo>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        let lines = lyrics::time_lines(lines, &self.timing);
        self.run(lines, output_path.as_ref()).await
    }

    /// Run one generation on a background task
    ///
    /// Nothing is shared with the caller; the returned handle resolves once
    /// the video is written or the run fails.
    pub fn spawn<P: Into<PathBuf>>(&self, text: String, output_path: P) -> GenerationHandle {
        let generator = self.clone();
        let output_path = output_path.into();
        let inner = task::spawn(async move { generator.generate(&text, &output_path).await });
        GenerationHandle { inner }
    }

    async fn run(&self, lines: Vec<TextLine>, output_path: &Path) -> Result<EncodedVideo> {
        info!("🎬 Generating video with {} lines", lines.len());
        info!("   Output: {:?}", output_path);

        // ==========================================
        // STEP 1: INPUT
        // ==========================================
        self.validate_input(&lines)?;

        // ==========================================
        // STEP 2: RENDERING
        // ==========================================
        let sequence = self.render_frames(lines).await?;

        // ==========================================
        // STEP 3: ENCODING
        // ==========================================
        let assembler = VideoAssembler::new(&self.encode);
        let encoded = assembler
            .assemble(&sequence, output_path, &self.settings)
            .await?;

        info!("🎉 Video saved to {:?} ({:.2}s)", encoded.path, encoded.duration);
        Ok(encoded)
    }

    fn validate_input(&self, lines: &[TextLine]) -> Result<()> {
        if lines.iter().all(TextLine::is_blank) {
            return Err(InputError::EmptyText.into());
        }
        self.settings.validate()?;
        if self.render_threads == 0 {
            return Err(InputError::OutOfRange {
                field: "render_threads".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Render every line on the blocking pool so the runtime stays responsive
    async fn render_frames(&self, lines: Vec<TextLine>) -> Result<Sequence> {
        info!("🖼️  Rendering {} frames at {}x{}", lines.len(), self.settings.width, self.settings.height);

        let settings = self.settings.clone();
        let threads = self.render_threads;
        let sequence = task::spawn_blocking(move || {
            let renderer = FrameRenderer::new(settings);
            render_sequence(&renderer, &lines, threads)
        })
        .await
        .map_err(|e| GeneratorError::generic(format!("Frame rendering task failed: {}", e)))??;

        info!("   ✅ {} frames, {:.2}s total", sequence.len(), sequence.total_duration());
        Ok(sequence)
    }
}

/// Render each line into a timed frame, keeping input order
pub fn render_sequence(renderer: &FrameRenderer, lines: &[TextLine], threads: usize) -> Result<Sequence> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| GeneratorError::generic(format!("Failed to start render threads: {}", e)))?;

    let frames: Vec<TimedFrame> = pool.install(|| {
        lines
            .par_iter()
            .enumerate()
            .map(|(i, line)| {
                debug!("Rendering line {}: {:?} ({:.2}s)", i, line.text, line.duration);
                TimedFrame::new(renderer.render(&line.text), line.duration)
            })
            .collect()
    });

    Ok(frames.into_iter().collect())
}

/// Completion handle for a generation started with [`LyricVideoGenerator::spawn`]
pub struct GenerationHandle {
    inner: JoinHandle<Result<EncodedVideo>>,
}

impl GenerationHandle {
    /// Wait for the run, keeping the typed error
    pub async fn join(self) -> Result<EncodedVideo> {
        self.inner
            .await
            .map_err(|e| GeneratorError::generic(format!("Generation task failed: {}", e)))?
    }

    /// Wait for the run and flatten any failure into one user-facing message
    pub async fn wait(self) -> std::result::Result<PathBuf, String> {
        match self.join().await {
            Ok(encoded) => Ok(encoded.path),
            Err(e) => Err(e.user_message()),
        }
    }
}

/// Generate a video from `lines` and return the path actually written
pub async fn generate_video<I, S, P>(lines: I, output_path: P, settings: &RenderSettings) -> Result<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let encoded = LyricVideoGenerator::new(settings.clone())
        .generate_lines(lines, output_path)
        .await?;
    Ok(encoded.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::BuiltinFace;

    fn small_settings() -> RenderSettings {
        RenderSettings::default()
            .with_resolution(64, 48)
            .with_font_size(16)
            .with_duration(1.0)
    }

    #[test]
    fn test_render_sequence_keeps_order_and_size() {
        let settings = small_settings();
        let renderer = FrameRenderer::with_face(settings.clone(), Box::new(BuiltinFace::new(1)));
        let lines = vec![
            TextLine::new("Line 1", 1.0),
            TextLine::new("", 1.0),
            TextLine::new("Line 3", 2.0),
        ];

        let sequence = render_sequence(&renderer, &lines, 2).unwrap();

        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.total_duration(), 4.0);
        assert!(sequence.iter().all(|f| f.frame.width() == 64 && f.frame.height() == 48));
        assert_eq!(sequence.frames()[1].frame, renderer.blank());
        assert_ne!(sequence.frames()[0].frame, renderer.blank());
        assert_eq!(sequence.frames()[2].duration, 2.0);
    }

    #[test]
    fn test_new_syncs_timing_with_settings() {
        let generator = LyricVideoGenerator::new(small_settings().with_duration(2.5));
        assert_eq!(generator.timing.duration_per_line, 2.5);
        assert_eq!(generator.timing.fps, 24);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let generator = LyricVideoGenerator::new(small_settings());
        let output = dir.path().join("empty.mp4");

        let err = generator.generate(" \n\t\n", &output).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Input(InputError::EmptyText)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let generator = LyricVideoGenerator::new(small_settings().with_duration(-1.0));

        let err = generator
            .generate_lines(["hello"], dir.path().join("x.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_spawned_failure_becomes_message() {
        let generator = LyricVideoGenerator::new(small_settings());
        let handle = generator.spawn(String::new(), "never.mp4");

        let message = handle.wait().await.unwrap_err();
        assert_eq!(message, "Please enter some text.");
    }
}
