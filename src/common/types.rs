use serde::{Deserialize, Serialize};

/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

/// Opaque handle identifying an input stream owned by the HAL.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct StreamId(pub u32);

impl From<u32> for StreamId {
    fn from(u: u32) -> Self {
        Self(u)
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capture device an input stream is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDevice {
    BuiltinMic,
    BackMic,
    WiredHeadset,
    BluetoothSco,
    UsbDevice,
}

impl InputDevice {
    /// Only the built-in and back mic paths expose all three capsules.
    pub fn has_three_mics(self) -> bool {
        matches!(self, Self::BuiltinMic | Self::BackMic)
    }
}

/// Use case the client declared when opening the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Default,
    Mic,
    Camcorder,
    VoiceRecognition,
    VoiceCommunication,
    Unprocessed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    Pcm16,
    Pcm24,
    Pcm32,
    Float,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm16 => 2,
            Self::Pcm24 => 3,
            Self::Pcm32 | Self::Float => 4,
        }
    }
}

/// PCM configuration the capture device is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub rate: u32,
    pub channels: usize,
    pub period_size: usize,
    pub period_count: usize,
    pub format: SampleFormat,
}

impl StreamConfig {
    /// Bytes delivered by one period of capture.
    pub fn period_bytes(&self) -> usize {
        self.period_size * self.channels * self.format.bytes_per_sample()
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            rate: 48_000,
            channels: 2,
            period_size: 960,
            period_count: 2,
            format: SampleFormat::Pcm16,
        }
    }
}

/// The subset of a HAL input stream the surround record feature inspects
/// and reconfigures.
#[derive(Debug, Clone)]
pub struct InputStream {
    pub id: StreamId,
    pub device: InputDevice,
    pub source: AudioSource,
    /// Channel count the client asked for (2 or 6 for surround record).
    pub channel_count: usize,
    pub format: SampleFormat,
    pub config: StreamConfig,
}

impl InputStream {
    pub fn new(id: impl Into<StreamId>, device: InputDevice, source: AudioSource) -> Self {
        Self {
            id: id.into(),
            device,
            source,
            channel_count: 2,
            format: SampleFormat::Pcm16,
            config: StreamConfig::default(),
        }
    }

    pub fn with_channels(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self.config.channels = channel_count;
        self
    }
}
