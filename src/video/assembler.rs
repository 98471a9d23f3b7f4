use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::config::EncodeConfig;
use crate::error::{EncodeError, Result};
use crate::settings::RenderSettings;
use crate::video::codec::{plan_output, OutputPlan};
use crate::video::types::Sequence;

/// Represents an encoded video output
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    /// Where the file actually landed (may differ from the request)
    pub path: PathBuf,
    pub duration: f64,
    pub frame_count: u64,
    pub file_size: u64,
}

/// Encodes frame sequences by piping raw pixels into the system `ffmpeg`
pub struct VideoAssembler {
    ffmpeg: PathBuf,
    quality: u8,
    timeout: Option<Duration>,
}

impl Default for VideoAssembler {
    fn default() -> Self {
        Self::new(&EncodeConfig::default())
    }
}

impl VideoAssembler {
    pub fn new(config: &EncodeConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            quality: config.quality,
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub async fn check_ffmpeg_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// True if `ffmpeg -encoders` lists `codec`
    pub async fn check_encoder_available(&self, codec: &str) -> bool {
        Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map(|output| {
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .any(|line| line.split_whitespace().nth(1) == Some(codec))
            })
            .unwrap_or(false)
    }

    /// Encode `sequence` to `output_path` and return what was written
    ///
    /// Frames are held for their durations at `settings.fps`. The file is
    /// encoded under a temporary sibling name and renamed into place only
    /// when FFmpeg succeeds; on any failure nothing is left at either path.
    /// The timeout covers the FFmpeg checks as well as the encode.
    pub async fn assemble(
        &self,
        sequence: &Sequence,
        output_path: &Path,
        settings: &RenderSettings,
    ) -> Result<EncodedVideo> {
        validate_sequence(sequence, settings)?;

        let plan = plan_output(output_path, settings.transparent);
        info!(
            "Encoding {} frames ({:.2}s) to {:?} with {} / {}",
            sequence.len(),
            sequence.total_duration(),
            plan.path,
            plan.profile.encoder(),
            plan.profile.pixel_format()
        );

        let input_format = sequence
            .iter()
            .next()
            .map(|timed| timed.frame.pixel_format())
            .ok_or(EncodeError::EmptySequence)?;
        let partial = partial_path(&plan.path);
        let hold_counts = sequence.hold_counts(settings.fps);
        let args = self.build_args(&plan, settings, input_format, &partial);

        let encode = self.check_and_encode(&plan, &args, sequence, &hold_counts);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, encode).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("FFmpeg exceeded {:?}; killing encoder", limit);
                    Err(EncodeError::TimedOut {
                        seconds: limit.as_secs(),
                    }
                    .into())
                }
            },
            None => encode.await,
        };

        if let Err(e) = outcome {
            remove_partial(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, &plan.path).await {
            remove_partial(&partial).await;
            return Err(e.into());
        }

        let file_size = tokio::fs::metadata(&plan.path).await?.len();
        let frame_count: u64 = hold_counts.iter().sum();

        info!(
            "Video saved to {:?} ({} frames, {} KB)",
            plan.path,
            frame_count,
            file_size / 1024
        );

        Ok(EncodedVideo {
            path: plan.path,
            duration: frame_count as f64 / settings.fps as f64,
            frame_count,
            file_size,
        })
    }

    async fn check_and_encode(
        &self,
        plan: &OutputPlan,
        args: &[String],
        sequence: &Sequence,
        hold_counts: &[u64],
    ) -> Result<()> {
        if !self.check_ffmpeg_available().await {
            return Err(EncodeError::FfmpegMissing.into());
        }
        if !self.check_encoder_available(plan.profile.encoder()).await {
            return Err(EncodeError::CodecUnavailable {
                codec: plan.profile.encoder().to_string(),
            }
            .into());
        }
        if let Some(parent) = plan.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        encode_to(&self.ffmpeg, args, sequence, hold_counts).await
    }

    fn build_args(
        &self,
        plan: &OutputPlan,
        settings: &RenderSettings,
        input_format: &str,
        partial: &Path,
    ) -> Vec<String> {
        let fps = settings.fps.to_string();
        let size = format!("{}x{}", settings.width, settings.height);

        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            input_format,
            "-s",
            size.as_str(),
            "-r",
            fps.as_str(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            plan.profile.encoder(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.extend(plan.profile.encoder_args(self.quality));
        args.extend(
            ["-pix_fmt", plan.profile.pixel_format(), "-r", fps.as_str()]
                .iter()
                .map(|s| s.to_string()),
        );
        args.extend(plan.container.muxer_args());
        args.push(partial.display().to_string());
        args
    }
}

fn validate_sequence(sequence: &Sequence, settings: &RenderSettings) -> Result<()> {
    if sequence.is_empty() {
        return Err(EncodeError::EmptySequence.into());
    }

    let fps = settings.fps as f64;
    for (index, timed) in sequence.iter().enumerate() {
        let frame = &timed.frame;
        if frame.width() != settings.width || frame.height() != settings.height {
            return Err(EncodeError::FrameMismatch {
                index,
                details: format!(
                    "size {}x{}, expected {}x{}",
                    frame.width(),
                    frame.height(),
                    settings.width,
                    settings.height
                ),
            }
            .into());
        }
        if frame.channels() != settings.channels() {
            return Err(EncodeError::FrameMismatch {
                index,
                details: format!(
                    "{} channels, expected {}",
                    frame.channels(),
                    settings.channels()
                ),
            }
            .into());
        }
        // A shorter entry would round to zero video frames and vanish
        if !(timed.duration.is_finite() && timed.duration * fps >= 1.0 - 1e-9) {
            return Err(EncodeError::FrameMismatch {
                index,
                details: format!(
                    "duration {}s is shorter than one frame at {} fps",
                    timed.duration, settings.fps
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// Run FFmpeg with `args` and stream every frame the right number of times
async fn encode_to(
    ffmpeg: &Path,
    args: &[String],
    sequence: &Sequence,
    hold_counts: &[u64],
) -> Result<()> {
    debug!("{} {}", ffmpeg.display(), args.join(" "));

    let mut child = Command::new(ffmpeg)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| EncodeError::SpawnFailed {
            reason: e.to_string(),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| EncodeError::SpawnFailed {
        reason: "FFmpeg stdin was not captured".to_string(),
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| EncodeError::SpawnFailed {
        reason: "FFmpeg stderr was not captured".to_string(),
    })?;

    // Drain stderr concurrently so a chatty encoder cannot block on a full pipe
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    });

    let written = write_frames(&mut stdin, sequence, hold_counts).await;
    drop(stdin);

    let status = child.wait().await.map_err(|e| EncodeError::SpawnFailed {
        reason: format!("failed to wait for FFmpeg: {}", e),
    })?;
    let stderr = stderr_task.await.unwrap_or_default();

    check_status(status, &stderr)?;
    written
}

async fn write_frames(stdin: &mut ChildStdin, sequence: &Sequence, hold_counts: &[u64]) -> Result<()> {
    for (index, (timed, &count)) in sequence.iter().zip(hold_counts).enumerate() {
        debug!("Frame {}: holding for {} video frames", index, count);
        let bytes = timed.frame.as_bytes();
        for _ in 0..count {
            stdin
                .write_all(bytes)
                .await
                .map_err(|e| EncodeError::PipeFailed {
                    reason: e.to_string(),
                })?;
        }
    }
    stdin.flush().await.map_err(|e| EncodeError::PipeFailed {
        reason: e.to_string(),
    })?;
    Ok(())
}

fn check_status(status: ExitStatus, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(EncodeError::FfmpegFailed {
        status: status.to_string(),
        stderr: stderr.trim().to_string(),
    }
    .into())
}

/// Hidden sibling of `path`, unique per process, keeping the extension
fn partial_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let partial_name = format!(".partial-{}-{}", std::process::id(), file_name);
    match path.parent() {
        Some(parent) => parent.join(partial_name),
        None => PathBuf::from(partial_name),
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::error::GeneratorError;
    use crate::video::types::Frame;

    fn sequence_of(count: usize, settings: &RenderSettings) -> Sequence {
        let mut seq = Sequence::new();
        for _ in 0..count {
            seq.push(
                Frame::new_filled(
                    settings.width,
                    settings.height,
                    settings.background(),
                    settings.transparent,
                ),
                settings.duration_per_line,
            );
        }
        seq
    }

    #[test]
    fn test_partial_path_keeps_extension_and_directory() {
        let partial = partial_path(Path::new("out/dir/song.webm"));
        assert_eq!(partial.parent(), Some(Path::new("out/dir")));
        let name = partial.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".partial-"));
        assert!(name.ends_with("song.webm"));
    }

    #[test]
    fn test_build_args_for_transparent_webm() {
        let settings = RenderSettings::default()
            .with_resolution(640, 480)
            .with_transparency(true);
        let plan = plan_output(Path::new("x.webm"), true);
        let args = VideoAssembler::default().build_args(
            &plan,
            &settings,
            "rgba",
            Path::new(".partial-x.webm"),
        );

        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 640x480 -r 24 -i pipe:0"));
        assert!(joined.contains("-c:v libvpx-vp9"));
        assert!(joined.contains("-pix_fmt yuva420p"));
        assert_eq!(args.last().map(String::as_str), Some(".partial-x.webm"));
    }

    #[test]
    fn test_build_args_for_opaque_mp4() {
        let settings = RenderSettings::default().with_resolution(640, 480);
        let plan = plan_output(Path::new("x.mp4"), false);
        let args =
            VideoAssembler::default().build_args(&plan, &settings, "rgb24", Path::new("p.mp4"));

        let joined = args.join(" ");
        assert!(joined.contains("-pix_fmt rgb24"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert!(joined.contains("-movflags +faststart"));
    }

    #[test]
    fn test_build_args_without_extension_forces_mp4() {
        let settings = RenderSettings::default().with_resolution(640, 480);
        let plan = plan_output(Path::new("lyrics"), false);
        let args = VideoAssembler::default().build_args(
            &plan,
            &settings,
            "rgb24",
            Path::new(".partial-lyrics"),
        );

        let joined = args.join(" ");
        assert!(joined.ends_with("-f mp4 -movflags +faststart .partial-lyrics"));
    }

    #[test]
    fn test_build_args_for_unknown_extension_forces_mp4() {
        let settings = RenderSettings::default().with_resolution(640, 480);
        let plan = plan_output(Path::new("song.v2"), false);
        let args =
            VideoAssembler::default().build_args(&plan, &settings, "rgb24", Path::new("p.v2"));

        assert!(args.join(" ").ends_with("-f mp4 -movflags +faststart p.v2"));
    }

    #[test]
    fn test_validate_rejects_mismatched_frames() {
        let settings = RenderSettings::default().with_resolution(64, 48);
        let mut seq = sequence_of(2, &settings);
        seq.push(Frame::new_filled(32, 48, Color::BLACK, false), 1.0);

        let err = validate_sequence(&seq, &settings).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::Encode(EncodeError::FrameMismatch { index: 2, .. })
        ));

        let mut seq = sequence_of(1, &settings);
        seq.push(Frame::new_filled(64, 48, Color::TRANSPARENT, true), 1.0);
        assert!(validate_sequence(&seq, &settings).is_err());
    }

    #[tokio::test]
    async fn test_lines_shorter_than_a_frame_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RenderSettings::default().with_resolution(64, 48);
        let mut seq = Sequence::new();
        for _ in 0..48 {
            seq.push(Frame::new_filled(64, 48, Color::BLACK, false), 0.01);
        }
        let output = dir.path().join("short.mp4");

        let err = VideoAssembler::default()
            .assemble(&seq, &output, &settings)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::Encode(EncodeError::FrameMismatch { index: 0, .. })
        ));
        assert!(!output.exists());

        let mut seq = Sequence::new();
        seq.push(Frame::new_filled(64, 48, Color::BLACK, false), 1.0 / 24.0);
        assert!(validate_sequence(&seq, &settings).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_sequence() {
        let settings = RenderSettings::default();
        assert!(matches!(
            validate_sequence(&Sequence::new(), &settings),
            Err(GeneratorError::Encode(EncodeError::EmptySequence))
        ));
    }

    #[tokio::test]
    async fn test_assemble_opaque_mp4_when_ffmpeg_present() {
        let assembler = VideoAssembler::default();
        if !assembler.check_ffmpeg_available().await
            || !assembler.check_encoder_available("libx264").await
        {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let settings = RenderSettings::default()
            .with_resolution(64, 48)
            .with_duration(0.5);
        let seq = sequence_of(2, &settings);
        let output = dir.path().join("clip.mp4");

        let encoded = VideoAssembler::default()
            .assemble(&seq, &output, &settings)
            .await
            .unwrap();

        assert_eq!(encoded.path, output);
        assert_eq!(encoded.frame_count, 24);
        assert!(encoded.file_size > 0);
        assert!(!partial_path(&output).exists());
    }

    #[tokio::test]
    async fn test_failed_encode_leaves_no_file() {
        let assembler = VideoAssembler::default();
        if !assembler.check_ffmpeg_available().await
            || !assembler.check_encoder_available("libx264").await
        {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let settings = RenderSettings::default()
            .with_resolution(64, 48)
            .with_duration(0.5);
        let seq = sequence_of(1, &settings);
        // H.264 cannot be muxed into WebM, so FFmpeg refuses the output
        let output = dir.path().join("opaque.webm");

        let result = VideoAssembler::default()
            .assemble(&seq, &output, &settings)
            .await;

        assert!(result.is_err());
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_binary() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RenderSettings::default()
            .with_resolution(64, 48)
            .with_duration(0.5);
        let output = dir.path().join("clip.mp4");

        let err = VideoAssembler::default()
            .with_ffmpeg(dir.path().join("no-such-ffmpeg"))
            .assemble(&sequence_of(1, &settings), &output, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Encode(EncodeError::FfmpegMissing)));
    }

    /// Stand-in `ffmpeg` scripts; each claims to have libx264
    #[cfg(unix)]
    mod fake_ffmpeg {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        const ANSWER_CHECKS: &str = r#"
if [ "$1" = "-version" ]; then exit 0; fi
if [ "$2" = "-encoders" ]; then echo " V....D libx264 stand-in"; exit 0; fi
for last in "$@"; do :; done
"#;

        fn write_script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn leftovers(dir: &Path) -> Vec<String> {
            std::fs::read_dir(dir)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        }

        async fn run(script: &str, timeout: Option<Duration>) -> (Result<EncodedVideo>, Vec<String>) {
            let bin_dir = tempfile::tempdir().unwrap();
            let out_dir = tempfile::tempdir().unwrap();
            let ffmpeg = write_script(bin_dir.path(), script);
            let settings = RenderSettings::default()
                .with_resolution(64, 48)
                .with_duration(0.5);

            let result = VideoAssembler::default()
                .with_ffmpeg(ffmpeg)
                .with_timeout(timeout)
                .assemble(
                    &sequence_of(2, &settings),
                    &out_dir.path().join("clip.mp4"),
                    &settings,
                )
                .await;
            (result, leftovers(out_dir.path()))
        }

        #[tokio::test]
        async fn test_stalled_encode_times_out_and_cleans_up() {
            // Creates the partial file, then never reads its input
            let script = format!("{}touch \"$last\"\nexec sleep 30\n", ANSWER_CHECKS);
            let started = std::time::Instant::now();

            let (result, left) = run(&script, Some(Duration::from_secs(1))).await;

            assert!(matches!(
                result,
                Err(GeneratorError::Encode(EncodeError::TimedOut { seconds: 1 }))
            ));
            assert!(left.is_empty(), "left behind: {:?}", left);
            assert!(started.elapsed() < Duration::from_secs(20));
        }

        #[tokio::test]
        async fn test_hanging_version_check_is_under_the_timeout() {
            let (result, left) = run("exec sleep 30\n", Some(Duration::from_secs(1))).await;

            assert!(matches!(
                result,
                Err(GeneratorError::Encode(EncodeError::TimedOut { .. }))
            ));
            assert!(left.is_empty());
        }

        #[tokio::test]
        async fn test_encoder_failure_reports_stderr_and_cleans_up() {
            let script = format!(
                "{}touch \"$last\"\necho 'muxer exploded' >&2\nexit 1\n",
                ANSWER_CHECKS
            );

            let (result, left) = run(&script, None).await;

            match result {
                Err(GeneratorError::Encode(EncodeError::FfmpegFailed { stderr, .. })) => {
                    assert!(stderr.contains("muxer exploded"))
                }
                other => panic!("expected FfmpegFailed, got {:?}", other),
            }
            assert!(left.is_empty(), "left behind: {:?}", left);
        }

        #[tokio::test]
        async fn test_missing_encoder_is_reported() {
            let script = "if [ \"$1\" = \"-version\" ]; then exit 0; fi\necho ' V....D libvpx-vp9 x'\n";

            let (result, _) = run(script, None).await;

            assert!(matches!(
                result,
                Err(GeneratorError::Encode(EncodeError::CodecUnavailable { codec }))
                    if codec == "libx264"
            ));
        }
    }
}
