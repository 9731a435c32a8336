use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::defaults;
use crate::error::{Result, VoiqError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub asr: AsrConfig,
    pub api: ApiConfig,
    pub query: QueryConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device name; None picks the system default.
    pub device: Option<String>,
    pub sample_rate: u32,
    /// Samples per capture read.
    pub frame_samples: usize,
}

/// Recognition stream configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsrConfig {
    /// WebSocket endpoint of the recognizer.
    pub url: String,
    /// Model identifier sent in the stream config frame.
    pub model: String,
    /// Inbound idle timeout in seconds before the stream is considered
    /// complete.
    pub idle_timeout_secs: u64,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
}

/// Query session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Frames per chunk before a size-based flush.
    pub chunk_max_frames: usize,
    /// Chunk inactivity flush timeout in milliseconds.
    pub chunk_flush_interval_ms: u64,
    /// Hard cap on query length in seconds; a Stop is issued when it
    /// elapses.
    pub max_duration_secs: u64,
    /// Recent amplitudes retained for the level display.
    pub amplitude_window: usize,
    /// Show the result grid without an initial selection.
    pub grid_first: bool,
    /// Abort in-flight submissions on Cancel instead of letting them
    /// finish in the background.
    pub cancel_aborts_uploads: bool,
    /// Directory for recorded WAV files; None resolves to the platform
    /// data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_samples: defaults::FRAME_SAMPLES,
        }
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            url: defaults::DEFAULT_ASR_URL.to_string(),
            model: defaults::DEFAULT_MODEL.to_string(),
            idle_timeout_secs: defaults::RESULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_API_URL.to_string(),
            retry_attempts: defaults::SUBMIT_RETRY_ATTEMPTS,
            retry_base_ms: defaults::SUBMIT_RETRY_BASE_MS,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            chunk_max_frames: defaults::CHUNK_MAX_FRAMES,
            chunk_flush_interval_ms: defaults::CHUNK_FLUSH_INTERVAL_MS,
            max_duration_secs: defaults::MAX_QUERY_SECS,
            amplitude_window: defaults::AMPLITUDE_WINDOW,
            grid_first: false,
            cancel_aborts_uploads: false,
            data_dir: None,
        }
    }
}

impl QueryConfig {
    /// Chunk flush interval as a `Duration`.
    pub fn chunk_flush_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_flush_interval_ms)
    }

    /// Hard cap as a `Duration`.
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|_| VoiqError::ConfigFileNotFound {
            path: path.display().to_string(),
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default config file path: `<config dir>/voiq/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voiq")
            .join("config.toml")
    }

    /// Directory where query and comment recordings are written.
    ///
    /// Resolves `query.data_dir` when set, otherwise the platform data
    /// directory.
    pub fn data_dir(&self) -> PathBuf {
        match &self.query.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("voiq"),
        }
    }

    /// Check values that would break the pipeline at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(VoiqError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.audio.frame_samples == 0 {
            return Err(VoiqError::ConfigInvalidValue {
                key: "audio.frame_samples".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.query.chunk_max_frames == 0 {
            return Err(VoiqError::ConfigInvalidValue {
                key: "query.chunk_max_frames".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.query.max_duration_secs == 0 {
            return Err(VoiqError::ConfigInvalidValue {
                key: "query.max_duration_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.api.retry_attempts == 0 {
            return Err(VoiqError::ConfigInvalidValue {
                key: "api.retry_attempts".to_string(),
                message: "must be at least one attempt".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.frame_samples, 1600);
        assert_eq!(config.query.chunk_max_frames, 10);
        assert_eq!(config.query.chunk_flush_interval_ms, 1000);
        assert_eq!(config.query.max_duration_secs, 10);
        assert_eq!(config.asr.idle_timeout_secs, 20);
        assert!(!config.query.grid_first);
        assert!(!config.query.cancel_aborts_uploads);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[asr]
url = "ws://asr.example.org/v1/stream"
model = "field-crops"

[query]
max_duration_secs = 15
"#
        )
        .expect("write config");

        let config = Config::load(file.path()).expect("load config");
        assert_eq!(config.asr.url, "ws://asr.example.org/v1/stream");
        assert_eq!(config.asr.model, "field-crops");
        assert_eq!(config.query.max_duration_secs, 15);
        // Untouched sections keep their defaults
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.api.retry_attempts, 3);
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "audio = not toml").expect("write config");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load(Path::new("/nonexistent/voiq.toml"));
        assert!(matches!(err, Err(VoiqError::ConfigFileNotFound { .. })));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            Config::load_or_default(Path::new("/nonexistent/voiq.toml")).expect("defaults");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.query.chunk_max_frames = 0;
        let err = config.validate();
        assert!(matches!(
            err,
            Err(VoiqError::ConfigInvalidValue { ref key, .. }) if key == "query.chunk_max_frames"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_sample_rate() {
        let mut config = Config::default();
        config.audio.sample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = Config::default();
        config.query.data_dir = Some(PathBuf::from("/tmp/voiq-test"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/voiq-test"));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.query.chunk_flush_interval(), Duration::from_secs(1));
        assert_eq!(config.query.max_duration(), Duration::from_secs(10));
    }
}
