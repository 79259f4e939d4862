use thiserror::Error;

/// Failures opening or starting the output stream.
///
/// Nothing raised here ever crosses into the render callback; inside the
/// callback every failure degrades to silence.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("No output device matched (and no default available)")]
    NoDevice,

    #[error("Failed to enumerate audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Unsupported stream configuration: {0}")]
    UnsupportedConfig(String),

    #[error("Failed to open output stream: {0}")]
    Open(String),

    #[error("Failed to start output stream: {0}")]
    Start(String),
}

pub type StreamResult<T> = Result<T, StreamError>;
