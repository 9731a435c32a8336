//! Microphone capture sources.
//!
//! Defines the [`CaptureSource`] trait the recorder reads from, a mock
//! implementation for tests, and (behind the `cpal-audio` feature) a
//! real CPAL-backed source capturing 16 kHz mono i16 PCM.

#[cfg(feature = "cpal-audio")]
use crate::defaults;
use crate::error::{Result, VoiqError};

/// Trait for audio capture devices.
///
/// This trait allows swapping implementations (real audio device vs mock).
pub trait CaptureSource: Send {
    /// Acquire the device and begin capturing.
    fn start(&mut self) -> Result<()>;

    /// Release the device.
    fn stop(&mut self) -> Result<()>;

    /// Read one block of 16-bit PCM samples.
    ///
    /// Returns an empty vector when no samples are ready yet.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Mock capture source for testing.
///
/// Yields a scripted sequence of sample blocks, then empty reads.
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    frames: Vec<Vec<i16>>,
    position: usize,
    is_started: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockCaptureSource {
    /// Create a mock that yields no samples.
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            position: 0,
            is_started: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Script the sample blocks returned by successive reads.
    pub fn with_frames(mut self, frames: Vec<Vec<i16>>) -> Self {
        self.frames = frames;
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Check if the source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(VoiqError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(VoiqError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        if self.position >= self.frames.len() {
            return Ok(Vec::new());
        }
        let frame = self.frames[self.position].clone();
        self.position += 1;
        Ok(frame)
    }
}

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers when
/// probing audio backends.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
#[cfg(feature = "cpal-audio")]
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Device name patterns to filter out (not useful for voice input).
#[cfg(feature = "cpal-audio")]
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
#[cfg(feature = "cpal-audio")]
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// List available audio input device names.
///
/// # Errors
/// Returns `VoiqError::AudioCapture` if device enumeration fails.
#[cfg(feature = "cpal-audio")]
pub fn list_devices() -> Result<Vec<String>> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| VoiqError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name()
            && !should_filter_device(&name)
        {
            device_names.push(name);
        }
    }

    Ok(device_names)
}

#[cfg(not(feature = "cpal-audio"))]
pub fn list_devices() -> Result<Vec<String>> {
    Ok(Vec::new())
}

/// Real capture source backed by CPAL.
///
/// Captures 16-bit PCM at the configured rate, mono. Tries an i16 input
/// stream first and falls back to f32 with software conversion for
/// devices that only expose float formats. Samples accumulate in a
/// shared buffer drained by [`CaptureSource::read_samples`] in
/// fixed-size frames.
#[cfg(feature = "cpal-audio")]
pub struct CpalCaptureSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    buffer: std::sync::Arc<std::sync::Mutex<Vec<i16>>>,
    sample_rate: u32,
    frame_samples: usize,
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only accessed from the thread driving the
/// capture loop; methods are called synchronously.
#[cfg(feature = "cpal-audio")]
struct SendableStream(cpal::Stream);

#[cfg(feature = "cpal-audio")]
unsafe impl Send for SendableStream {}

#[cfg(feature = "cpal-audio")]
impl CpalCaptureSource {
    /// Create a capture source for the named device, or the system
    /// default when `device_name` is None.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        Self::with_frame_samples(device_name, defaults::FRAME_SAMPLES)
    }

    /// Create a capture source with a custom frame size.
    pub fn with_frame_samples(device_name: Option<&str>, frame_samples: usize) -> Result<Self> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host.input_devices().map_err(|e| VoiqError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        return Ok(dev);
                    }
                }
                Err(VoiqError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                host.default_input_device()
                    .ok_or_else(|| VoiqError::AudioDeviceNotFound {
                        device: "default".to_string(),
                    })
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
            frame_samples,
        })
    }

    fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        }
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        use cpal::traits::DeviceTrait;

        let config = self.stream_config();
        let err_fn = |e| eprintln!("voiq: audio stream error: {}", e);

        // Preferred: native i16 capture
        let buffer = self.buffer.clone();
        let i16_stream = self.device.build_input_stream(
            &config,
            move |data: &[i16], _| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_fn,
            None,
        );
        if let Ok(stream) = i16_stream {
            return Ok(stream);
        }

        // Fallback: f32 capture with conversion
        let buffer = self.buffer.clone();
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| VoiqError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

#[cfg(feature = "cpal-audio")]
impl CaptureSource for CpalCaptureSource {
    fn start(&mut self) -> Result<()> {
        use cpal::traits::StreamTrait;

        let stream = with_suppressed_stderr(|| self.build_stream())?;
        stream.play().map_err(|e| VoiqError::AudioCapture {
            message: format!("Failed to start input stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // Dropping the stream releases the device.
        self.stream = None;
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buf = self.buffer.lock().map_err(|_| VoiqError::AudioCapture {
            message: "capture buffer poisoned".to_string(),
        })?;
        if buf.len() < self.frame_samples {
            return Ok(Vec::new());
        }
        Ok(buf.drain(..self.frame_samples).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_yields_scripted_frames_then_empty() {
        let mut source =
            MockCaptureSource::new().with_frames(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        source.start().expect("start");
        assert!(source.is_started());

        assert_eq!(source.read_samples().expect("read"), vec![1, 2, 3]);
        assert_eq!(source.read_samples().expect("read"), vec![4, 5, 6]);
        assert!(source.read_samples().expect("read").is_empty());
        assert!(source.read_samples().expect("read").is_empty());
    }

    #[test]
    fn test_mock_start_failure() {
        let mut source = MockCaptureSource::new().with_start_failure();
        let err = source.start();
        assert!(matches!(err, Err(VoiqError::AudioCapture { .. })));
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_read_failure() {
        let mut source = MockCaptureSource::new()
            .with_frames(vec![vec![1]])
            .with_read_failure();
        source.start().expect("start");
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn test_mock_stop_clears_started() {
        let mut source = MockCaptureSource::new();
        source.start().expect("start");
        source.stop().expect("stop");
        assert!(!source.is_started());
    }

    #[cfg(feature = "cpal-audio")]
    #[test]
    fn test_filtered_patterns_match_case_insensitively() {
        assert!(should_filter_device("HDA Intel Surround 5.1"));
        assert!(should_filter_device("hdmi output"));
        assert!(!should_filter_device("USB Microphone"));
    }
}
