//! Error types for voiq.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiqError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Recording errors
    #[error("Recorder is already capturing")]
    RecorderBusy,

    #[error("Recording failed: {message}")]
    Recording { message: String },

    // Recognition stream errors
    #[error("Recognition stream failed: {message}")]
    RecognitionStream { message: String },

    // Session errors
    #[error("Session channel closed")]
    SessionClosed,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoiqError>;
