use image::{ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};

use crate::color::Color;

/// Pixel storage for a frame: opaque RGB or straight-alpha RGBA
#[derive(Clone, Debug, PartialEq)]
enum FrameBuffer {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

/// Represents a single video frame
///
/// Frames are created filled with a background color, drawn on by the
/// renderer and then only read.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: FrameBuffer,
}

impl Frame {
    /// Create a frame filled with `color`; `with_alpha` selects RGBA storage
    pub fn new_filled(width: u32, height: u32, color: Color, with_alpha: bool) -> Self {
        let buffer = if with_alpha {
            FrameBuffer::Rgba(ImageBuffer::from_pixel(width, height, Rgba(color.to_rgba())))
        } else {
            FrameBuffer::Rgb(ImageBuffer::from_pixel(width, height, Rgb(color.to_rgb())))
        };
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        match &self.buffer {
            FrameBuffer::Rgb(img) => img.width(),
            FrameBuffer::Rgba(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.buffer {
            FrameBuffer::Rgb(img) => img.height(),
            FrameBuffer::Rgba(img) => img.height(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self.buffer, FrameBuffer::Rgba(_))
    }

    pub fn channels(&self) -> u8 {
        if self.has_alpha() {
            4
        } else {
            3
        }
    }

    /// FFmpeg rawvideo pixel format name matching the byte layout
    pub fn pixel_format(&self) -> &'static str {
        if self.has_alpha() {
            "rgba"
        } else {
            "rgb24"
        }
    }

    /// Get a pixel as RGBA; opaque frames report alpha 255
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        match &self.buffer {
            FrameBuffer::Rgb(img) => {
                let p = img.get_pixel(x, y);
                [p[0], p[1], p[2], 255]
            }
            FrameBuffer::Rgba(img) => img.get_pixel(x, y).0,
        }
    }

    /// Composite `color` over the pixel at `(x, y)` with `coverage` (0-255)
    ///
    /// Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Color, coverage: u8) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let src_a = mul_div255(color.a as u32, coverage as u32);
        if src_a == 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);

        match &mut self.buffer {
            FrameBuffer::Rgb(img) => {
                let p = img.get_pixel_mut(x, y);
                let inv = 255 - src_a;
                p[0] = (mul_div255(color.r as u32, src_a) + mul_div255(p[0] as u32, inv)) as u8;
                p[1] = (mul_div255(color.g as u32, src_a) + mul_div255(p[1] as u32, inv)) as u8;
                p[2] = (mul_div255(color.b as u32, src_a) + mul_div255(p[2] as u32, inv)) as u8;
            }
            FrameBuffer::Rgba(img) => {
                let p = img.get_pixel_mut(x, y);
                let dst_a = p[3] as u32;
                // Porter-Duff "over" on straight alpha, in 0..=255*255 space
                let dst_weight = dst_a * (255 - src_a);
                let out_a = src_a * 255 + dst_weight;
                if out_a == 0 {
                    return;
                }
                let channel = |s: u8, d: u8| -> u8 {
                    let num = s as u32 * src_a * 255 + d as u32 * dst_weight;
                    ((num + out_a / 2) / out_a).min(255) as u8
                };
                p[0] = channel(color.r, p[0]);
                p[1] = channel(color.g, p[1]);
                p[2] = channel(color.b, p[2]);
                p[3] = ((out_a + 127) / 255).min(255) as u8;
            }
        }
    }

    /// Raw interleaved bytes, row-major, `channels()` bytes per pixel
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buffer {
            FrameBuffer::Rgb(img) => img.as_raw(),
            FrameBuffer::Rgba(img) => img.as_raw(),
        }
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        match &self.buffer {
            FrameBuffer::Rgb(img) => img.save(path),
            FrameBuffer::Rgba(img) => img.save(path),
        }
    }
}

fn mul_div255(x: u32, y: u32) -> u32 {
    (x * y + 127) / 255
}

/// A frame and how long it is shown
#[derive(Clone, Debug)]
pub struct TimedFrame {
    pub frame: Frame,
    pub duration: f64,
}

impl TimedFrame {
    pub fn new(frame: Frame, duration: f64) -> Self {
        Self { frame, duration }
    }
}

/// Ordered frames making up one video
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    frames: Vec<TimedFrame>,
}

impl Sequence {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: Frame, duration: f64) {
        self.frames.push(TimedFrame::new(frame, duration));
    }

    pub fn frames(&self) -> &[TimedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sum of all frame durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.frames.iter().map(|f| f.duration).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedFrame> {
        self.frames.iter()
    }

    /// Number of video frames each entry is held for at `fps`
    ///
    /// Counts come from rounding cumulative start/end times, so the total
    /// is `round(total_duration() * fps)`. An entry lasting at least one
    /// frame (`1 / fps` seconds) always gets a count of at least 1; shorter
    /// entries may get 0.
    pub fn hold_counts(&self, fps: u32) -> Vec<u64> {
        let fps = fps as f64;
        let mut elapsed = 0.0;
        let mut emitted: u64 = 0;

        self.frames
            .iter()
            .map(|timed| {
                elapsed += timed.duration.max(0.0);
                let boundary = (elapsed * fps).round() as u64;
                let count = boundary.saturating_sub(emitted);
                emitted += count;
                count
            })
            .collect()
    }
}

impl FromIterator<TimedFrame> for Sequence {
    fn from_iter<I: IntoIterator<Item = TimedFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frames() {
        let opaque = Frame::new_filled(4, 2, Color::rgb(1, 2, 3), false);
        assert_eq!(opaque.channels(), 3);
        assert_eq!(opaque.as_bytes().len(), 4 * 2 * 3);
        assert_eq!(opaque.get_pixel(3, 1), [1, 2, 3, 255]);
        assert_eq!(opaque.pixel_format(), "rgb24");

        let clear = Frame::new_filled(4, 2, Color::TRANSPARENT, true);
        assert_eq!(clear.channels(), 4);
        assert_eq!(clear.as_bytes().len(), 4 * 2 * 4);
        assert_eq!(clear.get_pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_blend_opaque() {
        let mut frame = Frame::new_filled(2, 2, Color::BLACK, false);
        frame.blend_pixel(0, 0, Color::WHITE, 255);
        frame.blend_pixel(1, 0, Color::WHITE, 128);
        frame.blend_pixel(-1, 5, Color::WHITE, 255);

        assert_eq!(frame.get_pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(frame.get_pixel(1, 0), [128, 128, 128, 255]);
        assert_eq!(frame.get_pixel(0, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_blend_over_transparent_keeps_color() {
        let mut frame = Frame::new_filled(1, 1, Color::TRANSPARENT, true);
        frame.blend_pixel(0, 0, Color::rgb(200, 100, 50), 128);

        // Straight alpha: color stays, coverage lands in alpha
        assert_eq!(frame.get_pixel(0, 0), [200, 100, 50, 128]);
    }

    #[test]
    fn test_hold_counts_follow_cumulative_time() {
        let mut seq = Sequence::new();
        for _ in 0..3 {
            seq.push(Frame::new_filled(2, 2, Color::BLACK, false), 1.0);
        }
        assert_eq!(seq.hold_counts(24), vec![24, 24, 24]);
        assert_eq!(seq.total_duration(), 3.0);

        // 0.7s at 24fps is 16.8 frames; cumulative rounding keeps the total at 50
        let seq: Sequence = (0..3)
            .map(|_| TimedFrame::new(Frame::new_filled(2, 2, Color::BLACK, false), 0.7))
            .collect();
        let counts = seq.hold_counts(24);
        assert_eq!(counts, vec![17, 17, 16]);
        assert_eq!(counts.iter().sum::<u64>(), 50);
    }

    fn uniform(count: usize, duration: f64) -> Sequence {
        (0..count)
            .map(|_| TimedFrame::new(Frame::new_filled(2, 2, Color::BLACK, false), duration))
            .collect()
    }

    #[test]
    fn test_one_frame_durations_each_get_a_frame() {
        let counts = uniform(5, 1.0 / 24.0).hold_counts(24);
        assert_eq!(counts, vec![1; 5]);
    }

    #[test]
    fn test_total_stays_within_a_frame_for_sub_frame_lines() {
        // 48 x 0.01s at 24 fps is 11.52 frames of video
        let counts = uniform(48, 0.01).hold_counts(24);
        assert_eq!(counts.iter().sum::<u64>(), 12);
        assert!(counts.contains(&0));
    }
}
