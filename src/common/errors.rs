use thiserror::Error;

const ENOMEM: i32 = 12;
const EIO: i32 = 5;
const EINVAL: i32 = 22;
const ENOSYS: i32 = 38;

/// Errors surfaced by the surround record pipeline and its session context.
#[derive(Debug, Error)]
pub enum SsrError {
    /// No session is running (feature disabled or init failed).
    #[error("surround record session not initialized")]
    NotInitialized,

    /// The feature is not supported on this device or SSR mode is off.
    #[error("surround record is disabled")]
    Disabled,

    #[error("stream is not eligible for surround record: {0}")]
    UnsupportedUsecase(String),

    /// The transform provider cannot supply the named processor.
    #[error("{0} is not available")]
    LibraryUnavailable(&'static str),

    #[error("{library} init failed with {code}")]
    LibraryInit { library: &'static str, code: i32 },

    #[error("transform failed: {0}")]
    Transform(String),

    /// The pipeline was stopped while (or before) the caller waited on it.
    #[error("pipeline stopped")]
    Stopped,

    #[error("short capture read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl SsrError {
    /// Negative errno equivalent, for callers speaking the HAL convention.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotInitialized => -ENOMEM,
            Self::LibraryUnavailable(_) => -ENOSYS,
            Self::Io(_) | Self::ShortRead { .. } => -EIO,
            Self::Disabled
            | Self::UnsupportedUsecase(_)
            | Self::LibraryInit { .. }
            | Self::Transform(_)
            | Self::Stopped
            | Self::Config(_) => -EINVAL,
        }
    }
}

pub type SsrResult<T> = Result<T, SsrError>;
