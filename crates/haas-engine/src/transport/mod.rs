//! The seam between the engine and the platform's audio output.
//!
//! A transport opens an output stream for a [`StreamRequest`] and, once the
//! stream is started, calls the registered [`RenderCallback`] on its own
//! real-time thread with a scratch region of `frames * channels` samples.

pub mod cpal_backend;

use crate::error::StreamResult;
use crate::{OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceMode {
    Default,
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingMode {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    I16,
    F32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub direction: Direction,
    pub performance_mode: PerformanceMode,
    pub sharing_mode: SharingMode,
    pub format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
    pub block_size: Option<u32>,          // frames per buffer (if backend supports)
}

impl StreamRequest {
    /// Low-latency exclusive f32 stereo output at the engine's fixed rate.
    pub fn playback() -> Self {
        Self {
            direction: Direction::Output,
            performance_mode: PerformanceMode::LowLatency,
            sharing_mode: SharingMode::Exclusive,
            format: SampleFormat::F32,
            channels: OUTPUT_CHANNELS,
            sample_rate: OUTPUT_SAMPLE_RATE,
            block_size: None,
        }
    }

    pub fn with_block_size(mut self, block_size: Option<u32>) -> Self {
        self.block_size = block_size;
        self
    }
}

/// What the transport should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Continue,
    Stop,
}

/// Per-period fill callback: `(scratch, frames_requested)`.
pub type RenderCallback = Box<dyn FnMut(&mut [f32], usize) -> CallbackResult + Send + 'static>;

pub trait AudioTransport {
    fn open_output(
        &self,
        request: &StreamRequest,
        callback: RenderCallback,
    ) -> StreamResult<Box<dyn OutputStream>>;
}

/// An opened output stream. Dropping it closes the stream.
pub trait OutputStream {
    fn start(&mut self) -> StreamResult<()>;
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
}
