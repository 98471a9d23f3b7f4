//! Splitting raw lyric text into timed lines.

use crate::config::TimingConfig;

/// One line of text and how long it stays on screen
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Trimmed text; empty means a blank frame
    pub text: String,

    /// Seconds on screen
    pub duration: f64,
}

impl TextLine {
    pub fn new<S: Into<String>>(text: S, duration: f64) -> Self {
        Self {
            text: text.into(),
            duration,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Split `text` on newlines into timed lines
///
/// Each line is trimmed. Blank lines are kept as blank frames unless
/// `skip_empty_lines` is set. A line equal to the silence marker becomes
/// a blank frame held for `silence_duration`.
pub fn parse_lines(text: &str, timing: &TimingConfig) -> Vec<TextLine> {
    text.lines()
        .map(str::trim)
        .filter(|line| !(timing.skip_empty_lines && line.is_empty()))
        .map(|line| timed_line(line, timing))
        .collect()
}

/// Time already-split lines (e.g. from a library caller) the same way
pub fn time_lines<I, S>(lines: I, timing: &TimingConfig) -> Vec<TextLine>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !(timing.skip_empty_lines && line.is_empty()))
        .map(|line| timed_line(&line, timing))
        .collect()
}

fn timed_line(line: &str, timing: &TimingConfig) -> TextLine {
    if timing.silence_marker.as_deref().map(str::trim) == Some(line) && !line.is_empty() {
        return TextLine::new("", timing.silence_duration);
    }

    TextLine::new(line, line_duration(line, timing))
}

fn line_duration(line: &str, timing: &TimingConfig) -> f64 {
    if timing.char_duration <= 0.0 {
        return timing.duration_per_line;
    }

    let chars = line.chars().count() as f64;
    let duration = timing.duration_per_line + chars * timing.char_duration;
    (duration * 100.0).round() / 100.0
}

/// Total seconds of a line list
pub fn total_duration(lines: &[TextLine]) -> f64 {
    lines.iter().map(|line| line.duration).sum()
}
