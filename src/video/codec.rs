use std::path::{Path, PathBuf};

use tracing::warn;

/// Encoder profile chosen from transparency and output extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecProfile {
    /// H.264, yuv420p, for opaque output in any container
    H264,
    /// VP9 with 8-bit alpha in WebM
    Vp9Alpha,
    /// ProRes 4444 with 10-bit alpha in QuickTime
    ProResAlpha,
}

impl CodecProfile {
    /// FFmpeg encoder name (`-c:v`)
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Vp9Alpha => "libvpx-vp9",
            Self::ProResAlpha => "prores_ks",
        }
    }

    /// Output pixel format (`-pix_fmt`)
    pub fn pixel_format(&self) -> &'static str {
        match self {
            Self::H264 => "yuv420p",
            Self::Vp9Alpha => "yuva420p",
            Self::ProResAlpha => "yuva444p10le",
        }
    }

    /// Encoder-specific arguments placed after `-c:v`
    pub fn encoder_args(&self, quality: u8) -> Vec<String> {
        match self {
            Self::H264 => vec![
                "-crf".to_string(),
                quality_to_crf(quality, 51).to_string(),
            ],
            Self::Vp9Alpha => vec![
                "-crf".to_string(),
                quality_to_crf(quality, 63).to_string(),
                "-b:v".to_string(),
                "0".to_string(),
                "-auto-alt-ref".to_string(),
                "0".to_string(),
            ],
            // profile 4 = 4444, the only ProRes profile with alpha
            Self::ProResAlpha => vec![
                "-profile:v".to_string(),
                "4".to_string(),
                "-vendor".to_string(),
                "apl0".to_string(),
            ],
        }
    }
}

/// Map 0-100 quality onto an encoder's CRF scale (0 best, `max` worst)
fn quality_to_crf(quality: u8, max: u8) -> u8 {
    let quality = quality.min(100) as f32 / 100.0;
    (max as f32 - quality * max as f32).round().clamp(0.0, max as f32) as u8
}

/// Container format for a path's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    WebM,
    QuickTime,
    /// Any other or missing extension; written as MP4
    Other,
}

impl Container {
    /// Muxer selection and the options only that muxer understands
    pub fn muxer_args(&self) -> Vec<String> {
        let faststart = ["-movflags", "+faststart"];
        let args: &[&str] = match self {
            Self::Mp4 | Self::QuickTime => &faststart,
            Self::WebM => &[],
            // FFmpeg cannot guess a muxer from `song.v2` or `lyrics`
            Self::Other => &["-f", "mp4", "-movflags", "+faststart"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }

    pub fn from_path(path: &Path) -> Self {
        match extension_of(path).as_deref() {
            Some("mp4") | Some("m4v") => Self::Mp4,
            Some("webm") => Self::WebM,
            Some("mov") => Self::QuickTime,
            _ => Self::Other,
        }
    }
}

/// The codec profile and final output path for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub profile: CodecProfile,
    pub container: Container,
    pub path: PathBuf,
}

/// Choose codec, pixel format and final path
///
/// Opaque output always uses H.264. Transparent output uses VP9 for
/// `.webm` and ProRes 4444 for `.mov`; any other path gets `.mov`
/// appended and uses ProRes.
pub fn plan_output(requested: &Path, transparent: bool) -> OutputPlan {
    let container = Container::from_path(requested);

    if !transparent {
        return OutputPlan {
            profile: CodecProfile::H264,
            container,
            path: requested.to_path_buf(),
        };
    }

    match container {
        Container::WebM => OutputPlan {
            profile: CodecProfile::Vp9Alpha,
            container,
            path: requested.to_path_buf(),
        },
        Container::QuickTime => OutputPlan {
            profile: CodecProfile::ProResAlpha,
            container,
            path: requested.to_path_buf(),
        },
        _ => {
            let mut coerced = requested.as_os_str().to_os_string();
            coerced.push(".mov");
            let coerced = PathBuf::from(coerced);
            warn!(
                "Transparency requires .mov or .webm; writing {:?} instead of {:?}",
                coerced, requested
            );
            OutputPlan {
                profile: CodecProfile::ProResAlpha,
                container: Container::QuickTime,
                path: coerced,
            }
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
