//! Real-time playback of pre-loaded PCM with a stereo Haas widening effect.
//!
//! The [`PlaybackEngine`] owns the sample buffer and the render callback that
//! an [`AudioTransport`] invokes once per hardware period. Each rendered block
//! passes through a [`HaasProcessor`], which delays the right channel by a
//! configurable number of milliseconds.

pub mod config;
pub mod devices;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod transport;

pub use config::EngineConfig;
pub use dsp::effect::Effect;
pub use dsp::haas::{DelayUpdate, HaasProcessor, MAX_DELAY_MS};
pub use engine::{PlaybackEngine, PlaybackState, SourceFormat};
pub use error::{StreamError, StreamResult};
pub use transport::cpal_backend::CpalTransport;
pub use transport::{
    AudioTransport, CallbackResult, Direction, OutputStream, PerformanceMode, RenderCallback,
    SampleFormat, SharingMode, StreamRequest,
};

/// Fixed output sample rate of the render path.
pub const OUTPUT_SAMPLE_RATE: u32 = 48_000;
/// Fixed output channel count (interleaved L,R).
pub const OUTPUT_CHANNELS: u16 = 2;
