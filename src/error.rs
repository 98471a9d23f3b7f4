use thiserror::Error;

/// Main error type for the lyric-video library
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised before generation starts, from user-supplied values
#[derive(Error, Debug)]
pub enum InputError {
    #[error("No text supplied")]
    EmptyText,

    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: String, value: String },

    #[error("Invalid color: '{value}'")]
    InvalidColor { value: String },
}

/// Frame rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to parse font {path}: {reason}")]
    FontParse { path: String, reason: String },
}

/// Video encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("FFmpeg not found on PATH")]
    FfmpegMissing,

    #[error("FFmpeg encoder '{codec}' is not available in this build")]
    CodecUnavailable { codec: String },

    #[error("Failed to spawn FFmpeg process: {reason}")]
    SpawnFailed { reason: String },

    #[error("Failed to stream frames to FFmpeg: {reason}")]
    PipeFailed { reason: String },

    #[error("FFmpeg exited with status {status}: {stderr}")]
    FfmpegFailed { status: String, stderr: String },

    #[error("Encoding did not finish within {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("Frame {index} does not match the sequence format: {details}")]
    FrameMismatch { index: usize, details: String },

    #[error("Cannot encode an empty frame sequence")]
    EmptySequence,
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using GeneratorError
pub type Result<T> = std::result::Result<T, GeneratorError>;

impl GeneratorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// True for errors detected before any frame is rendered
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Config(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(InputError::EmptyText) => "Please enter some text.".to_string(),
            Self::Input(InputError::InvalidNumber { .. }) => {
                "Invalid number format for duration or font size.".to_string()
            }
            Self::Encode(EncodeError::FfmpegMissing) => {
                "FFmpeg was not found. Please install FFmpeg and make sure it is on your PATH."
                    .to_string()
            }
            Self::Encode(EncodeError::CodecUnavailable { codec }) => {
                format!("Your FFmpeg build does not include the '{}' encoder.", codec)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => format!("An error occurred:\n{}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_empty_text() {
        let err: GeneratorError = InputError::EmptyText.into();
        assert_eq!(err.user_message(), "Please enter some text.");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_encode_errors_are_not_input_errors() {
        let err: GeneratorError = EncodeError::TimedOut { seconds: 5 }.into();
        assert!(!err.is_input_error());
        assert!(err.user_message().contains("5s"));
    }
}
